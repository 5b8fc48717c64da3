use thiserror::Error;

/// Failure taxonomy of the roster core. Every operation fails closed: the
/// caller's state is untouched when one of these is returned.
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("no eligible students to group")]
    NoEligibleStudents,

    #[error("malformed data under key {key}: {message}")]
    MalformedPersistedData { key: String, message: String },

    #[error("{kind} not found: {id}")]
    ReferenceNotFound { kind: &'static str, id: String },

    #[error("store failure: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl RosterError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        RosterError::ReferenceNotFound {
            kind,
            id: id.into(),
        }
    }

    /// Wire code used in IPC error responses.
    pub fn code(&self) -> &'static str {
        match self {
            RosterError::InvalidParameter(_) => "invalid_parameter",
            RosterError::NoEligibleStudents => "no_eligible_students",
            RosterError::MalformedPersistedData { .. } => "malformed_data",
            RosterError::ReferenceNotFound { .. } => "not_found",
            RosterError::Store(_) => "store_failed",
        }
    }
}

pub type RosterResult<T> = Result<T, RosterError>;
