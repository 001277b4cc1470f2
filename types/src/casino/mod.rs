mod board;
mod card;
mod constants;
mod fixed;
mod leaderboard;
mod player;
mod symbols;

pub use board::*;
pub use card::*;
pub use constants::*;
pub use fixed::*;
pub use leaderboard::*;
pub use player::*;
pub use symbols::*;
