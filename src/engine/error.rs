use ulid::Ulid;

use crate::model::StoredState;

use super::conflict::Rejection;

#[derive(Debug)]
pub enum EngineError {
    NotFound(Ulid),
    /// The validator refused the booking. Expected, not a failure.
    Rejected(Rejection),
    InvalidTransition {
        id: Ulid,
        from: StoredState,
        to: StoredState,
    },
    LimitExceeded(&'static str),
    WalError(String),
}

impl EngineError {
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            EngineError::Rejected(r) => Some(r),
            _ => None,
        }
    }
}

impl From<Rejection> for EngineError {
    fn from(rejection: Rejection) -> Self {
        EngineError::Rejected(rejection)
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::Rejected(r) => write!(f, "booking rejected ({}): {r}", r.tag()),
            EngineError::InvalidTransition { id, from, to } => {
                write!(f, "reservation {id} cannot go from {from} to {to}")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
