use serde::Serialize;
use thiserror::Error;

/// Errors raised by coordinate validation at the geo boundary.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeoError {
    #[error("invalid location lat={lat} lng={lng}")]
    InvalidLocation { lat: f64, lng: f64 },
}

/// Handler-level errors. Every variant is surfaced to the initiating
/// connection as an `error` event; none of them aborts the engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("validation: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    StateConflict(String),
    #[error("expired: {0}")]
    Expired(String),
}

/// Wire-visible error category attached to `error` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    Validation,
    NotFound,
    StateConflict,
    Expired,
}

impl DispatchError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DispatchError::Validation(_) => ErrorCode::Validation,
            DispatchError::NotFound(_) => ErrorCode::NotFound,
            DispatchError::StateConflict(_) => ErrorCode::StateConflict,
            DispatchError::Expired(_) => ErrorCode::Expired,
        }
    }
}

impl From<GeoError> for DispatchError {
    fn from(err: GeoError) -> Self {
        DispatchError::Validation(err.to_string())
    }
}
