//! Observation sources other than plain CSV.

pub mod leaderboard;
pub mod replay;
pub mod sample;

pub use leaderboard::*;
pub use replay::*;
pub use sample::*;
