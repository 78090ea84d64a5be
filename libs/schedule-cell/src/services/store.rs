use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::error::ScheduleError;
use crate::models::{AvailabilityProfile, AvailabilityProfileRow, PersistedSlotRow};

/// Data-access seam of the schedule facade.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn fetch_persisted_slots(
        &self,
        doctor_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PersistedSlotRow>, ScheduleError>;

    async fn fetch_availability_profile(&self, doctor_id: Uuid) -> Result<AvailabilityProfile, ScheduleError>;

    async fn resolve_patient_display_name(&self, patient_id: Uuid) -> Result<String, ScheduleError>;

    async fn persist_slots(&self, rows: &[PersistedSlotRow]) -> Result<(), ScheduleError>;
}

#[derive(Debug, Deserialize)]
struct PatientNameRow {
    first_name: Option<String>,
    last_name: Option<String>,
}

pub struct SupabaseScheduleStore {
    supabase: SupabaseClient,
}

impl SupabaseScheduleStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn get_rows(&self, path: &str) -> Result<Vec<Value>, ScheduleError> {
        self.supabase
            .request(Method::GET, path, None, None)
            .await
            .map_err(|e| ScheduleError::Io(e.to_string()))
    }
}

#[async_trait]
impl ScheduleStore for SupabaseScheduleStore {
    async fn fetch_persisted_slots(
        &self,
        doctor_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PersistedSlotRow>, ScheduleError> {
        debug!("Fetching persisted schedule for doctor {} from {} to {}", doctor_id, from, to);

        let path = format!(
            "/rest/v1/doctor_schedules?doctor_id=eq.{}&slot_date=gte.{}&slot_date=lte.{}&order=slot_date.asc,start_time.asc",
            doctor_id, from, to
        );
        let result = self.get_rows(&path).await?;

        // one bad row should not hide the rest of the day
        let rows = result
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<PersistedSlotRow>(row) {
                Ok(row) => Some(row),
                Err(e) => {
                    warn!("Skipping malformed schedule row for doctor {}: {}", doctor_id, e);
                    None
                }
            })
            .collect();

        Ok(rows)
    }

    async fn fetch_availability_profile(&self, doctor_id: Uuid) -> Result<AvailabilityProfile, ScheduleError> {
        debug!("Fetching availability profile for doctor {}", doctor_id);

        let path = format!(
            "/rest/v1/doctors?id=eq.{}&select=id,available_days,start_time,end_time",
            doctor_id
        );
        let result = self.get_rows(&path).await?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| ScheduleError::NotFound(format!("Doctor {} not found", doctor_id)))?;

        let row: AvailabilityProfileRow = serde_json::from_value(row)
            .map_err(|e| ScheduleError::Validation(format!("Malformed availability for doctor {}: {}", doctor_id, e)))?;

        AvailabilityProfile::try_from(row)
    }

    async fn resolve_patient_display_name(&self, patient_id: Uuid) -> Result<String, ScheduleError> {
        let path = format!("/rest/v1/patients?id=eq.{}&select=id,first_name,last_name", patient_id);
        let result = self.get_rows(&path).await?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| ScheduleError::NotFound(format!("Patient {} not found", patient_id)))?;
        let row: PatientNameRow = serde_json::from_value(row)
            .map_err(|e| ScheduleError::Io(format!("Malformed patient row {}: {}", patient_id, e)))?;

        let name = [row.first_name, row.last_name]
            .into_iter()
            .flatten()
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if name.is_empty() {
            return Err(ScheduleError::NotFound(format!("Patient {} has no name", patient_id)));
        }

        Ok(name)
    }

    async fn persist_slots(&self, rows: &[PersistedSlotRow]) -> Result<(), ScheduleError> {
        if rows.is_empty() {
            return Ok(());
        }
        debug!("Persisting {} generated schedule rows", rows.len());

        let body = serde_json::to_value(rows).map_err(|e| ScheduleError::Io(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=ignore-duplicates,return=minimal"),
        );

        self.supabase
            .execute(Method::POST, "/rest/v1/doctor_schedules", None, Some(body), Some(headers))
            .await
            .map_err(|e| ScheduleError::Io(e.to_string()))
    }
}
