//! Core types for the bot arena
//!
//! This crate provides the vocabulary shared by the scheduler and the
//! ranking code:
//! - Teams, bots and the container images they play with
//! - Matches, runner submissions and the persisted game records
//! - Typed competition settings with validated updates
//! - Payload compression and a swappable clock

mod clock;
mod error;
mod game;
mod payload;
mod settings;
mod team;

pub use clock::*;
pub use error::*;
pub use game::*;
pub use payload::*;
pub use settings::*;
pub use team::*;
