//! Casino game execution module.
//!
//! This module contains the game logic for the two games offered:
//! - Slots (board generation, line evaluation, RoI simulation)
//! - Blackjack

pub mod blackjack;
pub mod slots;

use coinbot_types::casino::Card;
use rand::{seq::SliceRandom, Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::collections::VecDeque;
use thiserror::Error;

/// Seedable random source shared by every game.
///
/// The live process seeds one instance at startup (from configuration or
/// the OS); simulations derive independent streams from a base seed so that
/// results do not depend on how trials are split across threads.
#[derive(Clone, Debug)]
pub struct GameRng {
    inner: ChaCha20Rng,
}

impl GameRng {
    /// Create a new RNG from a seed.
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    /// Create a new RNG seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    /// Independent stream `stream` of `seed`.
    pub fn stream(seed: u64, stream: u64) -> Self {
        let mut inner = ChaCha20Rng::seed_from_u64(seed);
        inner.set_stream(stream);
        Self { inner }
    }

    /// Split off a new generator seeded from this one.
    pub fn fork(&mut self) -> Self {
        Self::new(self.inner.next_u64())
    }

    pub fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    /// Get a random value in range [0, max).
    pub fn next_bounded(&mut self, max: u64) -> u64 {
        if max == 0 {
            return 0;
        }
        self.inner.gen_range(0..max)
    }

    /// Get a random value in range [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// Get a random value in range [-1.0, 1.0).
    pub fn next_signed(&mut self) -> f64 {
        self.inner.gen_range(-1.0..1.0)
    }

    /// True with probability `p` (clamped to [0, 1]).
    pub fn chance(&mut self, p: f64) -> bool {
        self.inner.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Shuffle a slice in place.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        slice.shuffle(&mut self.inner);
    }

    /// Create a shuffled deck of 52 cards, drawn front to back.
    pub fn create_deck(&mut self) -> VecDeque<Card> {
        let mut deck: Vec<Card> = (0..Card::DECK_SIZE).filter_map(Card::new).collect();
        self.shuffle(&mut deck);
        deck.into()
    }
}

/// Error during game execution.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    /// Invalid move for current game state.
    #[error("invalid move")]
    InvalidMove,
    /// Game session has already completed.
    #[error("game already complete")]
    GameAlreadyComplete,
    /// Deck is exhausted (no more cards to draw).
    #[error("deck exhausted")]
    DeckExhausted,
}
