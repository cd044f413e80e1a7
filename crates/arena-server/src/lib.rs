//! Bot arena service
//!
//! Keeps the competition running between external match runners:
//! - [`MatchScheduler`]: planned queue, ongoing matches, completion and timeouts
//! - [`ResultCache`] and [`GameRepository`]: recent games in front of the store
//! - [`RankingAggregator`]: windowed standings that steer autoplay
//! - [`Daemons`]: the periodic scheduling and ranking loops
//! - [`Arena`]: the facade the transport layer calls into

mod arena;
mod cache;
mod config;
mod daemon;
mod error;
mod ranking;
mod repository;
mod roster;
mod scheduler;
mod settings;
mod store;

pub use arena::*;
pub use cache::*;
pub use config::*;
pub use daemon::*;
pub use error::*;
pub use ranking::*;
pub use repository::*;
pub use roster::*;
pub use scheduler::*;
pub use settings::*;
pub use store::*;
