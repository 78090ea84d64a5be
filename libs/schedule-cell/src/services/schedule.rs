use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use futures::future::join_all;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use shared_config::{AppConfig, ScheduleSettings};

use crate::error::ScheduleError;
use crate::models::{
    AvailabilityProfile, CandidateSlot, DaySchedule, PersistedSlotRow, ScheduleQuery,
    ScheduleResult, ScheduleSlot, ScheduleSource, SlotStatus,
};
use crate::services::generator::{generate_candidate_slots, generate_for_range};
use crate::services::policy::{policy_from_settings, FallbackStatusPolicy};
use crate::services::resolver::{resolve_statuses, BookingMap};
use crate::services::store::{ScheduleStore, SupabaseScheduleStore};

pub const UNKNOWN_PATIENT_LABEL: &str = "Unknown patient";

pub struct ScheduleService {
    store: Arc<dyn ScheduleStore>,
    policy: Arc<dyn FallbackStatusPolicy>,
    settings: ScheduleSettings,
}

impl ScheduleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: Arc::new(SupabaseScheduleStore::new(config)),
            policy: policy_from_settings(&config.schedule),
            settings: config.schedule.clone(),
        }
    }

    pub fn with_store(
        store: Arc<dyn ScheduleStore>,
        policy: Arc<dyn FallbackStatusPolicy>,
        settings: ScheduleSettings,
    ) -> Self {
        Self { store, policy, settings }
    }

    /// Resolved schedule for every date in `query`. Persisted rows win; dates
    /// without rows are generated from the doctor's weekly availability.
    #[instrument(skip(self))]
    pub async fn get_schedule(
        &self,
        doctor_id: Uuid,
        query: ScheduleQuery,
    ) -> Result<ScheduleResult, ScheduleError> {
        let (from, to) = self.validate_query(&query)?;
        debug!("Resolving schedule for doctor {} from {} to {}", doctor_id, from, to);

        let persisted = self.load_persisted_rows(doctor_id, from, to).await;
        // generated days are only written back when the store was actually read
        let write_back = self.settings.fallback_write_back && persisted.is_some();
        let mut rows_by_date = persisted.unwrap_or_default();
        let mut cached_profile: Option<AvailabilityProfile> = None;
        let mut generated_rows = Vec::new();
        let mut days = Vec::with_capacity(query.len_days() as usize);

        for date in query.dates() {
            let day = match rows_by_date.remove(&date) {
                Some(rows) => DaySchedule {
                    date,
                    source: ScheduleSource::Persisted,
                    slots: self.map_persisted_rows(rows),
                },
                None => {
                    let profile = match cached_profile.take() {
                        Some(profile) => profile,
                        None => self.fetch_profile(doctor_id).await?,
                    };
                    let slots = self.generate_fallback_day(&profile, date);
                    cached_profile = Some(profile);

                    if write_back {
                        generated_rows.extend(slots.iter().map(ScheduleSlot::to_persisted));
                    }

                    DaySchedule {
                        date,
                        source: ScheduleSource::Generated,
                        slots,
                    }
                }
            };
            days.push(day);
        }

        for day in days.iter_mut() {
            enforce_well_formed(day);
        }
        self.attach_patient_names(&mut days).await;

        if !generated_rows.is_empty() {
            self.write_back(doctor_id, &generated_rows).await;
        }

        Ok(ScheduleResult { doctor_id, from, to, days })
    }

    /// Generated candidates only, without any booking overlay.
    pub async fn get_candidate_slots(
        &self,
        doctor_id: Uuid,
        query: ScheduleQuery,
    ) -> Result<Vec<CandidateSlot>, ScheduleError> {
        let (from, to) = self.validate_query(&query)?;
        let profile = self.fetch_profile(doctor_id).await?;
        Ok(generate_for_range(&profile, from, to))
    }

    fn validate_query(&self, query: &ScheduleQuery) -> Result<(NaiveDate, NaiveDate), ScheduleError> {
        let (from, to) = query.bounds();
        if from > to {
            return Err(ScheduleError::Validation(format!(
                "Range start {} is after range end {}",
                from, to
            )));
        }
        if query.len_days() > self.settings.max_range_days {
            return Err(ScheduleError::Validation(format!(
                "Range of {} days exceeds the maximum of {}",
                query.len_days(),
                self.settings.max_range_days
            )));
        }
        Ok((from, to))
    }

    async fn fetch_profile(&self, doctor_id: Uuid) -> Result<AvailabilityProfile, ScheduleError> {
        let profile = self
            .with_retry("availability profile fetch", || {
                self.store.fetch_availability_profile(doctor_id)
            })
            .await?;

        if profile.doctor_id != doctor_id {
            return Err(ScheduleError::Validation(format!(
                "Availability profile belongs to doctor {}, expected {}",
                profile.doctor_id, doctor_id
            )));
        }
        Ok(profile)
    }

    /// `None` when the store could not be read; callers render that as "no
    /// persisted rows" but must not treat it as an empty store.
    async fn load_persisted_rows(
        &self,
        doctor_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Option<BTreeMap<NaiveDate, Vec<PersistedSlotRow>>> {
        let rows = match self
            .with_retry("persisted schedule fetch", || {
                self.store.fetch_persisted_slots(doctor_id, from, to)
            })
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                error!(
                    "Failed to fetch persisted schedule for doctor {}, falling back to weekly availability: {}",
                    doctor_id, e
                );
                return None;
            }
        };

        let mut by_date: BTreeMap<NaiveDate, Vec<PersistedSlotRow>> = BTreeMap::new();
        for row in rows {
            if row.doctor_id != doctor_id || row.slot_date < from || row.slot_date > to {
                warn!(
                    "Ignoring schedule row for doctor {} on {} outside the requested window",
                    row.doctor_id, row.slot_date
                );
                continue;
            }
            by_date.entry(row.slot_date).or_default().push(row);
        }
        Some(by_date)
    }

    /// One slot per start time, chronological. Duplicate rows for the same
    /// start keep the last one, matching `BookingMap::from_rows`.
    fn map_persisted_rows(&self, rows: Vec<PersistedSlotRow>) -> Vec<ScheduleSlot> {
        let bookings = BookingMap::from_rows(&rows);
        let latest: BTreeMap<NaiveTime, PersistedSlotRow> =
            rows.into_iter().map(|row| (row.start_time, row)).collect();
        let ids: Vec<Option<Uuid>> = latest.values().map(|row| row.id).collect();

        resolve_statuses(latest.into_values().map(|row| row.candidate()), &bookings)
            .into_iter()
            .zip(ids)
            .map(|(mut slot, id)| {
                slot.id = id;
                slot
            })
            .collect()
    }

    fn generate_fallback_day(&self, profile: &AvailabilityProfile, date: NaiveDate) -> Vec<ScheduleSlot> {
        let candidates = generate_candidate_slots(profile, date);
        resolve_statuses(candidates, &BookingMap::new())
            .into_iter()
            .map(|slot| {
                let candidate = slot.candidate();
                let status = self.policy.status_for(&candidate);
                if status == SlotStatus::Booked {
                    debug!("Fallback policy chose booked for a slot without a patient, using unavailable");
                }
                ScheduleSlot::with_status(candidate, status, None)
            })
            .collect()
    }

    async fn attach_patient_names(&self, days: &mut [DaySchedule]) {
        let patient_ids: HashSet<Uuid> = days
            .iter()
            .flat_map(|day| day.slots.iter())
            .filter_map(|slot| slot.patient_id)
            .collect();
        if patient_ids.is_empty() {
            return;
        }

        let lookup_timeout = Duration::from_millis(self.settings.fetch_timeout_ms);
        let lookups = patient_ids.into_iter().map(|patient_id| async move {
            let name = match timeout(lookup_timeout, self.store.resolve_patient_display_name(patient_id)).await {
                Ok(Ok(name)) => name,
                Ok(Err(e)) => {
                    warn!("Patient name lookup failed for {}: {}", patient_id, e);
                    UNKNOWN_PATIENT_LABEL.to_string()
                }
                Err(_) => {
                    warn!(
                        "Patient name lookup for {} timed out after {} ms",
                        patient_id, self.settings.fetch_timeout_ms
                    );
                    UNKNOWN_PATIENT_LABEL.to_string()
                }
            };
            (patient_id, name)
        });
        let names: HashMap<Uuid, String> = join_all(lookups).await.into_iter().collect();

        for slot in days.iter_mut().flat_map(|day| day.slots.iter_mut()) {
            if let Some(patient_id) = slot.patient_id {
                slot.patient_display_name = names.get(&patient_id).cloned();
            }
        }
    }

    /// Best effort: failures and timeouts are logged, never returned.
    async fn write_back(&self, doctor_id: Uuid, rows: &[PersistedSlotRow]) {
        let limit = Duration::from_millis(self.settings.fetch_timeout_ms);
        match timeout(limit, self.store.persist_slots(rows)).await {
            Ok(Ok(())) => debug!("Wrote back {} generated slots for doctor {}", rows.len(), doctor_id),
            Ok(Err(e)) => warn!("Could not write back generated schedule for doctor {}: {}", doctor_id, e),
            Err(_) => warn!(
                "Write-back of generated schedule for doctor {} timed out after {} ms",
                doctor_id, self.settings.fetch_timeout_ms
            ),
        }
    }

    /// Runs `call` under the fetch timeout, retrying I/O failures with
    /// exponential backoff.
    async fn with_retry<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, ScheduleError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ScheduleError>>,
    {
        let max_attempts = self.settings.fetch_retries.saturating_add(1);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let outcome = match timeout(Duration::from_millis(self.settings.fetch_timeout_ms), call()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ScheduleError::Io(format!(
                    "{} timed out after {} ms",
                    operation, self.settings.fetch_timeout_ms
                ))),
            };

            match outcome {
                Err(ScheduleError::Io(msg)) if attempt < max_attempts => {
                    let backoff = self
                        .settings
                        .retry_backoff_ms
                        .saturating_mul(1u64 << (attempt - 1).min(16));
                    warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {} ms",
                        operation, attempt, max_attempts, msg, backoff
                    );
                    sleep(Duration::from_millis(backoff)).await;
                }
                other => return other,
            }
        }
    }
}

fn enforce_well_formed(day: &mut DaySchedule) {
    day.slots.retain(|slot| {
        if slot.is_well_formed() {
            return true;
        }
        error!(
            "Dropping slot for doctor {} on {} with start {} not before end {}",
            slot.doctor_id, slot.slot_date, slot.start_time, slot.end_time
        );
        false
    });
}
