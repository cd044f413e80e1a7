//! Matches, runner submissions and persisted game records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PayloadError;
use crate::payload::{compress_bytes, compress_encoded, decompress};

/// A scheduled pairing between two contestants.
///
/// `launch_time` is `None` while the match sits in the planned queue and is
/// stamped when a runner picks it up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: Uuid,
    pub team1_id: String,
    pub team2_id: String,
    pub image_team1: String,
    pub image_team2: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_time: Option<DateTime<Utc>>,
}

impl Match {
    /// Create a planned match with a freshly generated id.
    pub fn planned(team1_id: &str, image_team1: &str, team2_id: &str, image_team2: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            team1_id: team1_id.to_string(),
            team2_id: team2_id.to_string(),
            image_team1: image_team1.to_string(),
            image_team2: image_team2.to_string(),
            launch_time: None,
        }
    }
}

/// Outcome of a match as reported by a runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    pub id: Uuid,
    #[serde(default)]
    pub winner_id: Option<String>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub team1_score: f32,
    #[serde(default)]
    pub team2_score: f32,
    /// Base64-encoded raw error output
    #[serde(default)]
    pub error_data: Option<String>,
    /// Base64-encoded raw game log
    #[serde(default)]
    pub game_data: Option<String>,
}

impl GameResult {
    /// A result with no winner and zero scores.
    pub fn draw(id: Uuid) -> Self {
        Self {
            id,
            winner_id: None,
            is_error: false,
            team1_score: 0.0,
            team2_score: 0.0,
            error_data: None,
            game_data: None,
        }
    }

    pub fn won_by(id: Uuid, winner_id: &str) -> Self {
        Self {
            winner_id: Some(winner_id.to_string()),
            ..Self::draw(id)
        }
    }
}

/// Category of a failed game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No result arrived before the match deadline
    Timeout,
}

/// Structured error body stored with error records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorPayload {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Timeout,
            message: message.into(),
        }
    }

    /// Compressed form suitable for `GameRecord::error_data`.
    pub fn encode(&self) -> Result<String, PayloadError> {
        let json = serde_json::to_vec(self)?;
        compress_bytes(&json)
    }
}

/// A finished game, as persisted and cached.
///
/// Records are immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub team1_id: String,
    pub team2_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<String>,
    pub is_error: bool,
    pub team1_score: f32,
    pub team2_score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_data: Option<String>,
}

impl GameRecord {
    /// Build the record for a completed match.
    ///
    /// Start time comes from the match launch stamp, falling back to
    /// `end_time` for a match that was never stamped. Submitted payloads are
    /// compressed.
    pub fn from_result(m: &Match, result: &GameResult, end_time: DateTime<Utc>) -> Self {
        Self {
            id: m.id,
            start_time: m.launch_time.unwrap_or(end_time),
            end_time,
            team1_id: m.team1_id.clone(),
            team2_id: m.team2_id.clone(),
            winner_id: result.winner_id.clone(),
            is_error: result.is_error,
            team1_score: result.team1_score,
            team2_score: result.team2_score,
            error_data: compress_encoded(result.error_data.as_deref()),
            game_data: compress_encoded(result.game_data.as_deref()),
        }
    }

    /// Decode the structured error body, if the record carries one.
    pub fn error_payload(&self) -> Option<Result<ErrorPayload, PayloadError>> {
        let encoded = self.error_data.as_deref()?;
        Some(decompress(encoded).and_then(|raw| serde_json::from_slice(&raw).map_err(PayloadError::from)))
    }
}

#[cfg(test)]
#[path = "game_tests.rs"]
mod game_tests;
