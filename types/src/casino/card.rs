use serde::{Serialize, Serializer};
use std::fmt;

/// A playing card encoded as `0..52`: `rank = value % 13` (0 = Ace),
/// `suit = value / 13`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Card(u8);

impl Card {
    pub const DECK_SIZE: u8 = 52;

    pub fn new(value: u8) -> Option<Self> {
        (value < Self::DECK_SIZE).then_some(Card(value))
    }

    /// Build from a 1-based rank (1 = Ace, 13 = King) and a suit `0..4`.
    pub fn from_rank(rank: u8, suit: u8) -> Option<Self> {
        if !(1..=13).contains(&rank) || suit >= 4 {
            return None;
        }
        Some(Card(suit * 13 + rank - 1))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// 1-based rank (1 = Ace, 11..=13 = face cards).
    pub fn rank(self) -> u8 {
        self.0 % 13 + 1
    }

    pub fn suit(self) -> u8 {
        self.0 / 13
    }

    pub fn is_ace(self) -> bool {
        self.rank() == 1
    }

    /// Blackjack points with aces counted as 1.
    pub fn points(self) -> u8 {
        match self.rank() {
            1 => 1,
            r if r >= 10 => 10,
            r => r,
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rank = match self.rank() {
            1 => "A",
            2 => "2",
            3 => "3",
            4 => "4",
            5 => "5",
            6 => "6",
            7 => "7",
            8 => "8",
            9 => "9",
            10 => "10",
            11 => "J",
            12 => "Q",
            _ => "K",
        };
        let suit = match self.suit() {
            0 => "♠",
            1 => "♥",
            2 => "♦",
            _ => "♣",
        };
        write!(f, "{rank}{suit}")
    }
}

impl Serialize for Card {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
