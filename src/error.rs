//! Crate error type.
//!
//! Solver outcomes (infeasible, unbounded, ...) are *not* errors; they are
//! reported through [`SolveStatus`](crate::scheduler::SolveStatus). Errors
//! are reserved for rejected input and orchestration failures.

use std::any::Any;

use thiserror::Error;

use crate::normalize::NormalizeError;
use crate::validation::ValidationError;

/// Errors raised while preparing, dispatching or running a solve.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Strict normalization rejected a raw record.
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    /// Canonical input failed structural validation.
    #[error("invalid input: {}", summarize(.0))]
    Validation(Vec<ValidationError>),

    /// The background worker already has a solve in flight.
    #[error("a solve is already running on this worker")]
    WorkerBusy,

    /// The background worker is gone.
    #[error("solve worker is unavailable: {0}")]
    WorkerUnavailable(String),

    /// A solve panicked.
    #[error("solve panicked: {0}")]
    Panicked(String),

    /// A comparison batch was stopped after an earlier run failed.
    #[error("comparison aborted after run '{0}' failed")]
    BatchAborted(String),

    /// Reading or writing a document failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A document is not valid JSON for the expected shape.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationErrorKind;

    #[test]
    fn test_validation_message_joins_errors() {
        let err = SchedulerError::Validation(vec![
            ValidationError::new(ValidationErrorKind::DuplicateId, "Duplicate task ID: P1"),
            ValidationError::new(ValidationErrorKind::NonPositiveDuration, "Task 'P2' has duration 0"),
        ]);
        assert_eq!(
            err.to_string(),
            "invalid input: Duplicate task ID: P1; Task 'P2' has duration 0"
        );
    }
}
