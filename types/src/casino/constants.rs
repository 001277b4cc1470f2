use super::Decimal;

/// Starting balance for accounts provisioned on first sight
pub const STARTING_BALANCE: i64 = 1_000;

/// Display spins shown before the evaluated spin of a slot round
pub const REVEAL_FRAMES: u32 = 3;

/// Delay between slot frames in milliseconds
pub const FRAME_DELAY_MS: u64 = 1_000;

/// Rounds played by a single auto-play command
pub const AUTOPLAY_ROUNDS: u32 = 10;

/// Maximum leaderboard entries returned per guild
pub const LEADERBOARD_LIMIT: usize = 50;

/// Idle blackjack sessions are closed after this many seconds
pub const SESSION_TIMEOUT_SECS: u64 = 600;

/// Dealer draws while below this total
pub const DEALER_STANDS_AT: u8 = 17;

/// Best hand total
pub const BLACKJACK: u8 = 21;

/// Total returned (stake included) for a player natural, as a multiple of the bet
pub const NATURAL_RETURN: Decimal = Decimal::from_raw(35_000);

/// Total returned for a winning blackjack hand, as a multiple of the bet
pub const WIN_RETURN: i64 = 2;

/// Default number of decimals kept on calibrated payout factors
pub const FACTOR_DECIMALS: u32 = 1;

/// Payout factors at or below this value are rejected by calibration
pub const MIN_FACTOR: Decimal = Decimal::from_raw(1_000);

/// Error codes carried on rejected commands
pub const ERROR_INVALID_BET: u8 = 1;
pub const ERROR_ALREADY_PLAYING: u8 = 2;
pub const ERROR_INSUFFICIENT_FUNDS: u8 = 3;
pub const ERROR_PLAYER_NOT_FOUND: u8 = 4;
pub const ERROR_STORAGE: u8 = 5;
pub const ERROR_PRESENTATION: u8 = 6;
pub const ERROR_NO_ACTIVE_GAME: u8 = 7;
pub const ERROR_UNAUTHORIZED: u8 = 8;
pub const ERROR_UNSUPPORTED: u8 = 9;
pub const ERROR_INVALID_MOVE: u8 = 10;
