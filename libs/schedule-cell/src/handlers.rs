use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::ScheduleQuery;
use crate::services::ScheduleService;

/// Either `date`, or `from` with an optional `to`.
#[derive(Debug, Deserialize)]
pub struct ScheduleParams {
    pub date: Option<NaiveDate>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ScheduleParams {
    pub fn into_query(self) -> Result<ScheduleQuery, AppError> {
        match (self.date, self.from, self.to) {
            (Some(date), None, None) => Ok(ScheduleQuery::Day(date)),
            (None, Some(from), Some(to)) => Ok(ScheduleQuery::Range { from, to }),
            (None, Some(from), None) => Ok(ScheduleQuery::Day(from)),
            _ => Err(AppError::BadRequest(
                "Provide either 'date' or 'from' (optionally with 'to')".to_string(),
            )),
        }
    }
}

fn parse_doctor_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("Invalid doctor id '{}'", raw)))
}

#[axum::debug_handler]
pub async fn get_doctor_schedule(
    State(service): State<Arc<ScheduleService>>,
    Path(doctor_id): Path<String>,
    Query(params): Query<ScheduleParams>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = parse_doctor_id(&doctor_id)?;
    let query = params.into_query()?;

    let schedule = service.get_schedule(doctor_id, query).await?;

    Ok(Json(json!(schedule)))
}

#[axum::debug_handler]
pub async fn get_candidate_slots(
    State(service): State<Arc<ScheduleService>>,
    Path(doctor_id): Path<String>,
    Query(params): Query<ScheduleParams>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = parse_doctor_id(&doctor_id)?;
    let query = params.into_query()?;

    let slots = service.get_candidate_slots(doctor_id, query).await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "total": slots.len(),
        "candidate_slots": slots,
    })))
}
