//! Error types for the registrar engine.

use thiserror::Error;

/// Errors that can occur during catalog, scheduling, enrollment, or marking
/// operations.
///
/// Every public operation either fully succeeds or fails with exactly one of
/// these; no partial writes survive a failure.
#[derive(Debug, Error)]
pub enum RegistrarError {
    /// A referenced entity or key does not exist
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// A uniqueness constraint is already satisfied by an existing row
    #[error("duplicate {entity}: {key}")]
    Duplicate { entity: &'static str, key: String },

    /// An availability precondition held at read time but not at commit time,
    /// or a live reference blocks a removal
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// The course's seat limit would be exceeded
    #[error("course {course_code} is full ({max_students} seats)")]
    Capacity {
        course_code: String,
        max_students: u32,
    },

    /// The student already holds an enrollment at this timeslot
    #[error("student {student_id} already has a session at timeslot {timeslot_id}")]
    Clash {
        student_id: String,
        timeslot_id: i64,
    },

    /// A caller-supplied value is outside its allowed range
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// The underlying store failed
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl RegistrarError {
    pub(crate) fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        RegistrarError::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub(crate) fn duplicate(entity: &'static str, key: impl Into<String>) -> Self {
        RegistrarError::Duplicate {
            entity,
            key: key.into(),
        }
    }

    pub(crate) fn conflict(message: impl Into<String>) -> Self {
        RegistrarError::Conflict {
            message: message.into(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        RegistrarError::Validation {
            message: message.into(),
        }
    }

    /// Returns true if the operation may succeed when replayed against fresh
    /// state. The engine never retries on its own; this is caller policy.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RegistrarError::Conflict { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RegistrarError>;

/// Maps a constraint violation raised by the store to the matching domain
/// error. Used as the backstop when a racing writer slips between a check
/// and the insert it guarded.
pub(crate) fn constraint_to_conflict(err: rusqlite::Error, message: &str) -> RegistrarError {
    if is_constraint_violation(&err) {
        RegistrarError::conflict(message)
    } else {
        RegistrarError::Storage(err)
    }
}

pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
