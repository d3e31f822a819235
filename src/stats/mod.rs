pub mod leaderboard;
pub mod players;
pub mod team;

pub use leaderboard::{leaderboard, Leaderboard, StatField};
pub use players::PlayerAggregator;
pub use team::TeamMetrics;
