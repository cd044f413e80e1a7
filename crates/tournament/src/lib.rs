//! Competition logic for the bot arena
//!
//! This crate provides the pure, IO-free parts of running the competition:
//! - Tallying windowed standings from finished games
//! - Fair autoplay selection of the next team to schedule
//! - Generating leaderboard reports
//!
//! The server crate feeds it games from its result cache and the current
//! roster, and publishes the resulting [`RankingSnapshot`].

mod autoplay;
mod results;
mod standings;
mod stats;

pub use autoplay::*;
pub use results::*;
pub use standings::*;
pub use stats::Summary;
