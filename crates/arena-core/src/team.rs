//! Roster entries and their images

use serde::{Deserialize, Serialize};

/// A registered contestant, either a student team or a house bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_bot: bool,
}

/// A pullable container image for one contestant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub tag: String,
    #[serde(default)]
    pub digest: String,
    pub full_url: String,
}

impl ImageRef {
    pub fn new(tag: &str, full_url: &str) -> Self {
        Self {
            tag: tag.to_string(),
            digest: String::new(),
            full_url: full_url.to_string(),
        }
    }
}

/// All images currently available for a contestant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamImages {
    pub team_id: String,
    pub images: Vec<ImageRef>,
}

impl TeamImages {
    pub fn new(team_id: &str, images: Vec<ImageRef>) -> Self {
        Self {
            team_id: team_id.to_string(),
            images,
        }
    }

    /// The image a match should launch, if any.
    pub fn primary(&self) -> Option<&ImageRef> {
        self.images.first()
    }

    /// Whether this contestant can be scheduled at all.
    pub fn is_available(&self) -> bool {
        !self.images.is_empty()
    }
}
