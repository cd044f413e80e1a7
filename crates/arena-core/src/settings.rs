//! Competition settings
//!
//! Settings are read on every scheduling and timeout decision and can be
//! changed while the server runs. Updates are validated as a whole: either
//! every field in a [`SettingsUpdate`] is accepted or none is.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Default ranking window (30 minutes)
pub const DEFAULT_RANKING_PERIOD_SECS: i64 = 30 * 60;
/// Default maximum number of matches running at once
pub const DEFAULT_MAX_CONCURRENT_MATCHES: usize = 10;
/// Default number of matches a single runner may take
pub const DEFAULT_MAX_MATCHES_PER_RUNNER: usize = 1;
/// Default time a runner has to report a result (5 minutes)
pub const DEFAULT_MATCH_TIMEOUT_SECS: i64 = 5 * 60;

/// Live competition settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "SettingsWire", try_from = "SettingsWire")]
pub struct Settings {
    /// When the competition closes
    pub end_time: DateTime<Utc>,
    /// Sliding window used for standings
    pub ranking_period: Duration,
    /// Upper bound on ongoing matches
    pub max_concurrent_matches: usize,
    /// Matches handed to one runner per pop, reported back to runners
    pub max_matches_per_runner: usize,
    /// Time a match may run before it is declared timed out
    pub match_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            end_time: Utc
                .with_ymd_and_hms(2025, 1, 17, 13, 0, 0)
                .single()
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            ranking_period: Duration::seconds(DEFAULT_RANKING_PERIOD_SECS),
            max_concurrent_matches: DEFAULT_MAX_CONCURRENT_MATCHES,
            max_matches_per_runner: DEFAULT_MAX_MATCHES_PER_RUNNER,
            match_timeout: Duration::seconds(DEFAULT_MATCH_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    /// Return a copy of these settings with `update` applied.
    ///
    /// Every present field is validated before anything is applied, so an
    /// error leaves the caller's settings exactly as they were.
    pub fn apply(&self, update: &SettingsUpdate) -> Result<Settings, SettingsError> {
        let mut next = self.clone();

        if let Some(end_time) = update.end_time {
            next.end_time = end_time;
        }

        if let Some(secs) = update.ranking_period_secs {
            next.ranking_period = positive_secs("rankingPeriod", secs)?;
        }

        if let Some(count) = update.max_concurrent_matches {
            next.max_concurrent_matches = usize::try_from(count)
                .map_err(|_| SettingsError::invalid("maxConcurrentMatches", "must be positive"))?;
        }

        if let Some(count) = update.max_matches_per_runner {
            if count < 1 {
                return Err(SettingsError::invalid("maxMatchesPerRunner", "must be at least 1"));
            }
            next.max_matches_per_runner = usize::try_from(count)
                .map_err(|_| SettingsError::invalid("maxMatchesPerRunner", "out of range"))?;
        }

        if let Some(secs) = update.match_timeout_secs {
            next.match_timeout = positive_secs("matchTimeout", secs)?;
        }

        Ok(next)
    }

    /// Whether the competition is over at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.end_time
    }
}

fn positive_secs(field: &'static str, secs: i64) -> Result<Duration, SettingsError> {
    if secs <= 0 {
        return Err(SettingsError::invalid(field, "must be positive"));
    }
    Duration::try_seconds(secs).ok_or_else(|| SettingsError::invalid(field, "out of range"))
}

/// A partial settings change. Absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranking_period_secs: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_matches: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_matches_per_runner: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_timeout_secs: Option<i64>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// JSON/TOML shape of [`Settings`]: durations in whole seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsWire {
    end_time: DateTime<Utc>,
    ranking_period_secs: i64,
    max_concurrent_matches: i64,
    max_matches_per_runner: i64,
    match_timeout_secs: i64,
}

impl From<Settings> for SettingsWire {
    fn from(s: Settings) -> Self {
        Self {
            end_time: s.end_time,
            ranking_period_secs: s.ranking_period.num_seconds(),
            max_concurrent_matches: i64::try_from(s.max_concurrent_matches).unwrap_or(i64::MAX),
            max_matches_per_runner: i64::try_from(s.max_matches_per_runner).unwrap_or(i64::MAX),
            match_timeout_secs: s.match_timeout.num_seconds(),
        }
    }
}

impl TryFrom<SettingsWire> for Settings {
    type Error = SettingsError;

    fn try_from(wire: SettingsWire) -> Result<Self, Self::Error> {
        Settings::default().apply(&SettingsUpdate {
            end_time: Some(wire.end_time),
            ranking_period_secs: Some(wire.ranking_period_secs),
            max_concurrent_matches: Some(wire.max_concurrent_matches),
            max_matches_per_runner: Some(wire.max_matches_per_runner),
            match_timeout_secs: Some(wire.match_timeout_secs),
        })
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod settings_tests;
