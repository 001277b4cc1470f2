use crate::casino::{Board, Card, ChannelId, Decimal, GuildId, Leaderboard, Line, LineKey, PlayerId};
use serde::{Deserialize, Serialize};

/// A command issued by a player in a channel of a guild.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub guild: GuildId,
    pub channel: ChannelId,
    pub player: PlayerId,
    #[serde(flatten)]
    pub command: Command,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Play one slot round.
    Slot { bet: i64 },
    /// Play several slot rounds back to back.
    AutoSlot { bet: i64 },
    /// Open a blackjack hand.
    Blackjack { bet: i64 },
    /// Act on the open blackjack hand.
    BlackjackMove { action: Action },
    Balance,
    Leaderboard,
    /// Set every balance in the guild (operators only).
    GrantAll { amount: i64 },
    /// Add coins to one player (operators only).
    Give { target: PlayerId, amount: i64 },
}

/// Blackjack player actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Hit,
    Stand,
    Double,
    Split,
}

/// Opaque handle to a presented message, used to update it in place.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageHandle(pub u64);

/// A line that paid on a spin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WinningLine {
    pub line: Line,
    pub key: LineKey,
    pub factor: Decimal,
    pub payout: Decimal,
}

/// How a blackjack hand was settled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandResult {
    PlayerNatural,
    DealerNatural,
    BothNatural,
    PlayerBust,
    DealerBust,
    PlayerWins,
    DealerWins,
    Push,
}

impl HandResult {
    pub fn describe(self) -> &'static str {
        match self {
            HandResult::PlayerNatural => "Blackjack! You win.",
            HandResult::DealerNatural => "Dealer has blackjack. You lose.",
            HandResult::BothNatural => "Both have blackjack. Push.",
            HandResult::PlayerBust => "Bust! You lose.",
            HandResult::DealerBust => "Dealer busts. You win.",
            HandResult::PlayerWins => "You win.",
            HandResult::DealerWins => "Dealer wins.",
            HandResult::Push => "Push.",
        }
    }
}

/// Snapshot of a blackjack table as shown to the player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BlackjackView {
    /// Total staked, including a double.
    pub stake: i64,
    pub player: Vec<Card>,
    pub player_total: u8,
    /// Visible dealer cards; the hole card is omitted while hidden.
    pub dealer: Vec<Card>,
    pub dealer_total: u8,
    pub dealer_hidden: bool,
    pub result: Option<HandResult>,
    /// Total returned to the player on settlement (stake included).
    pub returned: i64,
}

/// Content of a presented message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum View {
    SlotFrame {
        board: Board,
        bet: i64,
        frame: u32,
        frames: u32,
    },
    SlotResult {
        board: Board,
        bet: i64,
        payout: i64,
        winning_lines: Vec<WinningLine>,
        balance: i64,
    },
    AutoSlotRound {
        round: u32,
        rounds: u32,
        board: Board,
        bet: i64,
        payout: i64,
        balance: i64,
    },
    AutoSlotSummary {
        rounds_played: u32,
        rounds: u32,
        bet: i64,
        total_bet: i64,
        total_payout: i64,
        balance: i64,
    },
    Blackjack {
        table: BlackjackView,
        balance: Option<i64>,
    },
    Balance {
        player: PlayerId,
        balance: i64,
    },
    Leaderboard(Leaderboard),
    Notice {
        message: String,
    },
    Rejected {
        code: u8,
        message: String,
    },
}
