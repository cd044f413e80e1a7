use arena_core::{ScheduleError, SettingsError};
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the arena service.
#[derive(Debug, Error)]
pub enum ArenaError {
    /// The result does not match any ongoing match (already completed,
    /// timed out, reset, or never dispatched).
    #[error("no ongoing match with id {0}")]
    UnknownMatch(Uuid),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Failure reported by the game store, passed through as-is.
    #[error("game store failure: {0:#}")]
    Store(anyhow::Error),

    #[error("roster unavailable: {0:#}")]
    Roster(anyhow::Error),
}

pub type ArenaResult<T> = Result<T, ArenaError>;
