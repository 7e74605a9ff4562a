use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Unknown weekday: {0}")]
    UnknownWeekday(String),

    #[error("Unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: &'static str, message: String },

    #[error(transparent)]
    TimeZone(#[from] TimeZoneError),
}

/// Raised when an IANA zone name cannot be resolved.
///
/// Day-boundary helpers recover from this locally by falling back to UTC; it only reaches
/// callers when a new zone is being configured.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot resolve time zone '{zone}': {reason}")]
pub struct TimeZoneError {
    pub zone: String,
    pub reason: String,
}
