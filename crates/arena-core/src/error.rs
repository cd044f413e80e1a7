//! Error types shared across the arena crates

use thiserror::Error;

/// Reasons a match cannot be created.
///
/// These are reported to the caller as-is and never leave the scheduler in a
/// partially updated state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("Teams must be different")]
    SameTeam,
    #[error("Team not found: {0}")]
    UnknownTeam(String),
    #[error("No images found for team: {0}")]
    NoImage(String),
    #[error("Error getting images: {0}")]
    ImageLookup(String),
}

/// A settings update that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl SettingsError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Failure to decode a stored payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("payload could not be inflated: {0}")]
    Inflate(#[from] std::io::Error),
    #[error("payload is not a valid error body: {0}")]
    Json(#[from] serde_json::Error),
}
