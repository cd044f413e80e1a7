//! Registered contestants and their images
//!
//! The image registry is an external collaborator; the server only sees the
//! [`Roster`] trait. [`StaticRoster`] reads everything from a TOML file:
//!
//! ```toml
//! [[teams]]
//! id = "team-1"
//! name = "Les Castors"
//! images = [{ tag = "latest", full_url = "registry.local/team-1:latest" }]
//!
//! [[teams]]
//! id = "bot-random"
//! name = "Random bot"
//! is_bot = true
//! images = [{ tag = "latest", full_url = "registry.local/bots/random:latest" }]
//! ```

use anyhow::{Context, Result};
use arena_core::{ImageRef, TeamImages, TeamInfo};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

/// Source of contestants and their launchable images.
#[async_trait]
pub trait Roster: Send + Sync {
    /// Every registered contestant, bots included.
    async fn teams(&self) -> Result<Vec<TeamInfo>>;

    /// Images for the requested contestants.
    ///
    /// Unknown ids are left out of the result; known ids without an image
    /// come back with an empty image list.
    async fn list_images(&self, team_ids: &[String]) -> Result<Vec<TeamImages>>;
}

#[derive(Debug, Clone, Deserialize)]
struct RosterEntry {
    id: String,
    name: String,
    #[serde(default)]
    is_bot: bool,
    #[serde(default)]
    images: Vec<ImageRef>,
}

#[derive(Debug, Default, Deserialize)]
struct RosterFile {
    #[serde(default)]
    teams: Vec<RosterEntry>,
}

/// Fixed roster loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticRoster {
    entries: Vec<RosterEntry>,
}

impl StaticRoster {
    pub fn from_toml(source: &str) -> Result<Self> {
        let file: RosterFile = toml::from_str(source).context("invalid roster file")?;
        Ok(Self { entries: file.teams })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read roster {}", path.display()))?;
        let roster = Self::from_toml(&source)?;
        tracing::info!(path = %path.display(), teams = roster.entries.len(), "roster loaded");
        Ok(roster)
    }

    /// Register a contestant directly.
    pub fn with_team(mut self, info: TeamInfo, images: Vec<ImageRef>) -> Self {
        self.entries.push(RosterEntry {
            id: info.id,
            name: info.name,
            is_bot: info.is_bot,
            images,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Roster for StaticRoster {
    async fn teams(&self) -> Result<Vec<TeamInfo>> {
        Ok(self
            .entries
            .iter()
            .map(|e| TeamInfo {
                id: e.id.clone(),
                name: e.name.clone(),
                is_bot: e.is_bot,
            })
            .collect())
    }

    async fn list_images(&self, team_ids: &[String]) -> Result<Vec<TeamImages>> {
        Ok(team_ids
            .iter()
            .filter_map(|id| self.entries.iter().find(|e| &e.id == id))
            .map(|e| TeamImages::new(&e.id, e.images.clone()))
            .collect())
    }
}

/// Images of every contestant, split into student teams and house bots.
#[derive(Debug, Clone, Default)]
pub struct Entrants {
    pub teams: Vec<TeamImages>,
    pub bots: Vec<TeamImages>,
}

impl Entrants {
    /// Query the roster for all contestants and their images.
    pub async fn fetch(roster: &dyn Roster) -> Result<Self> {
        let infos = roster.teams().await.context("failed to list teams")?;
        let ids = |bots: bool| -> Vec<String> {
            infos
                .iter()
                .filter(|t| t.is_bot == bots)
                .map(|t| t.id.clone())
                .collect()
        };
        let team_ids = ids(false);
        let bot_ids = ids(true);

        let teams = roster
            .list_images(&team_ids)
            .await
            .context("failed to list team images")?;
        let bots = roster
            .list_images(&bot_ids)
            .await
            .context("failed to list bot images")?;

        Ok(Self { teams, bots })
    }

    /// Student teams that have an image to launch.
    pub fn schedulable(&self) -> Vec<TeamImages> {
        self.teams.iter().filter(|t| t.is_available()).cloned().collect()
    }

    /// Everyone with an image, bots included.
    pub fn pool(&self) -> Vec<TeamImages> {
        self.teams
            .iter()
            .chain(self.bots.iter())
            .filter(|t| t.is_available())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[path = "roster_tests.rs"]
mod roster_tests;
