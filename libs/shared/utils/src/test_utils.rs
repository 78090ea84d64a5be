use std::sync::Arc;
use serde_json::json;
use uuid::Uuid;

use shared_config::{AppConfig, ScheduleSettings};

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub schedule: ScheduleSettings,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            schedule: ScheduleSettings {
                // keep failing-path tests fast
                retry_backoff_ms: 1,
                ..ScheduleSettings::default()
            },
        }
    }
}

impl TestConfig {
    pub fn with_supabase_url(url: impl Into<String>) -> Self {
        Self {
            supabase_url: url.into(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            port: 0,
            schedule: self.schedule.clone(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// Canned PostgREST rows for the tables the schedule cell reads.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn doctor_availability_response(
        doctor_id: &str,
        days: &[&str],
        start_time: &str,
        end_time: &str,
    ) -> serde_json::Value {
        json!({
            "id": doctor_id,
            "available_days": days,
            "start_time": start_time,
            "end_time": end_time
        })
    }

    pub fn schedule_row_response(
        doctor_id: &str,
        slot_date: &str,
        start_time: &str,
        end_time: &str,
        status: &str,
        patient_id: Option<&str>,
    ) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "doctor_id": doctor_id,
            "slot_date": slot_date,
            "start_time": start_time,
            "end_time": end_time,
            "status": status,
            "patient_id": patient_id
        })
    }

    pub fn patient_response(patient_id: &str, first_name: &str, last_name: &str) -> serde_json::Value {
        json!({
            "id": patient_id,
            "first_name": first_name,
            "last_name": last_name
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
