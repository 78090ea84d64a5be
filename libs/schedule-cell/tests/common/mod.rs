#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use schedule_cell::{
    AlwaysAvailable, AvailabilityProfile, DayOfWeek, PersistedSlotRow, ScheduleError,
    ScheduleService, ScheduleStore,
};
use shared_config::ScheduleSettings;

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// 2024-01-01 is a Monday.
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

pub fn tuesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
}

pub fn monday_morning_profile(doctor_id: Uuid) -> AvailabilityProfile {
    AvailabilityProfile::new(doctor_id, [DayOfWeek::Monday], time(9, 0), time(12, 0)).unwrap()
}

pub fn row(
    doctor_id: Uuid,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    status: &str,
    patient_id: Option<Uuid>,
) -> PersistedSlotRow {
    PersistedSlotRow {
        id: Some(Uuid::new_v4()),
        doctor_id,
        slot_date: date,
        start_time: start,
        end_time: end,
        status: status.to_string(),
        patient_id,
    }
}

pub fn fast_settings() -> ScheduleSettings {
    ScheduleSettings {
        fetch_timeout_ms: 200,
        retry_backoff_ms: 1,
        ..ScheduleSettings::default()
    }
}

/// Scriptable in-memory store.
#[derive(Default)]
pub struct InMemoryScheduleStore {
    pub rows: Vec<PersistedSlotRow>,
    pub profile: Option<Result<AvailabilityProfile, ScheduleError>>,
    pub patients: HashMap<Uuid, String>,
    /// Number of upcoming row fetches that fail with an I/O error.
    pub failing_fetches: AtomicU32,
    pub fetch_delay: Option<Duration>,
    pub patient_delay: Option<Duration>,
    pub persist_delay: Option<Duration>,
    pub fetch_calls: AtomicU32,
    pub profile_calls: AtomicU32,
    pub persisted: Mutex<Vec<PersistedSlotRow>>,
}

impl InMemoryScheduleStore {
    pub fn with_profile(profile: AvailabilityProfile) -> Self {
        Self {
            profile: Some(Ok(profile)),
            ..Self::default()
        }
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn profile_count(&self) -> u32 {
        self.profile_calls.load(Ordering::SeqCst)
    }

    pub fn persisted_rows(&self) -> Vec<PersistedSlotRow> {
        self.persisted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn fetch_persisted_slots(
        &self,
        doctor_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PersistedSlotRow>, ScheduleError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self.failing_fetches.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_fetches.store(failing - 1, Ordering::SeqCst);
            return Err(ScheduleError::Io("connection reset".to_string()));
        }

        Ok(self
            .rows
            .iter()
            .filter(|row| row.doctor_id == doctor_id && row.slot_date >= from && row.slot_date <= to)
            .cloned()
            .collect())
    }

    async fn fetch_availability_profile(&self, doctor_id: Uuid) -> Result<AvailabilityProfile, ScheduleError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        match &self.profile {
            Some(result) => result.clone(),
            None => Err(ScheduleError::NotFound(format!("Doctor {} not found", doctor_id))),
        }
    }

    async fn resolve_patient_display_name(&self, patient_id: Uuid) -> Result<String, ScheduleError> {
        if let Some(delay) = self.patient_delay {
            tokio::time::sleep(delay).await;
        }
        self.patients
            .get(&patient_id)
            .cloned()
            .ok_or_else(|| ScheduleError::NotFound(format!("Patient {} not found", patient_id)))
    }

    async fn persist_slots(&self, rows: &[PersistedSlotRow]) -> Result<(), ScheduleError> {
        if let Some(delay) = self.persist_delay {
            tokio::time::sleep(delay).await;
        }
        self.persisted.lock().unwrap().extend_from_slice(rows);
        Ok(())
    }
}

pub fn service_for(store: Arc<InMemoryScheduleStore>) -> ScheduleService {
    ScheduleService::with_store(store, Arc::new(AlwaysAvailable), fast_settings())
}
