use thiserror::Error;

use shared_models::error::AppError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Schedule store I/O error: {0}")]
    Io(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::Io(msg) => AppError::ExternalService(msg),
            ScheduleError::NotFound(msg) => AppError::NotFound(msg),
            ScheduleError::Validation(msg) => AppError::ValidationError(msg),
        }
    }
}
