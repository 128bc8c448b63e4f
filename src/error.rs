//! Error handling for the academic operations engine
//!
//! Business-rule violations are typed, recoverable results the calling layer
//! maps onto HTTP responses. Infrastructure faults surface separately as
//! `StoreError` so retry policy can stay with the caller.

use chrono::NaiveTime;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Failures raised by an [`crate::store::AcademicStore`] adapter.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A uniqueness backstop fired inside an atomic write. The engine maps
    /// this onto the business error of the operation that raced.
    #[error("uniqueness conflict on {0}")]
    Conflict(&'static str),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict("unique index")
            }
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

/// Business-rule violations plus the single infrastructure kind.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("no fee structure matches programme '{programme}'")]
    NoFeeStructure { programme: String },

    #[error("fee schedule already exists for student {student_id}")]
    FeesAlreadyExist { student_id: Uuid },

    #[error("registration is closed for {academic_year} {semester}")]
    RegistrationClosed {
        academic_year: String,
        semester: String,
    },

    #[error("outstanding fees of {outstanding} block registration")]
    FeesOutstanding { outstanding: Decimal },

    #[error("course {course_id} does not exist or is not active")]
    InvalidCourse { course_id: Uuid },

    #[error("selected load of {credits} credits is outside {min}..={max}")]
    CreditBoundsViolation { credits: i32, min: i32, max: i32 },

    #[error("student {student_id} already has an active registration")]
    AlreadyRegistered { student_id: Uuid },

    #[error("schedule conflict with entry {existing_id} in {room} ({start}-{end})")]
    ScheduleConflict {
        existing_id: Uuid,
        room: String,
        start: NaiveTime,
        end: NaiveTime,
    },

    #[error("class start time must be before its end time")]
    InvalidTimeWindow,

    #[error("{entity} not found")]
    RecordNotFound { entity: &'static str },

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl EngineError {
    /// HTTP status for the thin handler layer that fronts the engine.
    pub fn status_code(&self) -> u16 {
        match self {
            EngineError::NoFeeStructure { .. }
            | EngineError::FeesAlreadyExist { .. }
            | EngineError::RegistrationClosed { .. }
            | EngineError::FeesOutstanding { .. }
            | EngineError::InvalidCourse { .. }
            | EngineError::CreditBoundsViolation { .. }
            | EngineError::ScheduleConflict { .. }
            | EngineError::InvalidTimeWindow => 400,
            EngineError::RecordNotFound { .. } => 404,
            EngineError::AlreadyRegistered { .. } => 409,
            EngineError::Storage(_) => 500,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_the_handler_contract() {
        let race = EngineError::AlreadyRegistered {
            student_id: Uuid::new_v4(),
        };
        assert_eq!(race.status_code(), 409);

        let missing = EngineError::RecordNotFound { entity: "student" };
        assert_eq!(missing.status_code(), 404);

        let storage = EngineError::Storage(StoreError::Backend("down".into()));
        assert_eq!(storage.status_code(), 500);

        let closed = EngineError::RegistrationClosed {
            academic_year: "2025/2026".into(),
            semester: "SEMESTER 1".into(),
        };
        assert_eq!(closed.status_code(), 400);
    }
}
