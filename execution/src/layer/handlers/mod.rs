use super::*;

mod accounts;
mod blackjack;
mod slots;

pub use slots::AutoPlaySummary;
