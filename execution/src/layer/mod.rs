use crate::{
    casino::{GameError, GameRng},
    ledger::{Ledger, LedgerError},
    presenter::{PresentError, Presenter},
    registry::Registry,
};
use coinbot_types::{
    api::{Command, MessageHandle, Request, View},
    casino::{
        Account, ChannelId, Decimal, GuildId, Machine, PlayerId, AUTOPLAY_ROUNDS,
        ERROR_ALREADY_PLAYING, ERROR_INSUFFICIENT_FUNDS, ERROR_INVALID_BET, ERROR_INVALID_MOVE,
        ERROR_NO_ACTIVE_GAME, ERROR_PLAYER_NOT_FOUND, ERROR_PRESENTATION, ERROR_STORAGE,
        ERROR_UNAUTHORIZED, ERROR_UNSUPPORTED, FRAME_DELAY_MS, LEADERBOARD_LIMIT, NATURAL_RETURN,
        REVEAL_FRAMES, SESSION_TIMEOUT_SECS,
    },
};
use std::{
    collections::HashSet,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use thiserror::Error;
use tracing::warn;

mod handlers;

pub use handlers::AutoPlaySummary;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("bet {0} is out of range")]
    InvalidBet(i64),
    #[error("player {0} already has a game in progress")]
    AlreadyPlaying(PlayerId),
    #[error("insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: i64, required: i64 },
    #[error("player not found: {0}")]
    PlayerNotFound(Account),
    #[error("storage error: {0}")]
    Storage(String),
    #[error(transparent)]
    Presentation(#[from] PresentError),
    #[error("no active game")]
    NoActiveGame,
    #[error("not authorized")]
    Unauthorized,
    #[error("{0} is not supported")]
    Unsupported(&'static str),
    #[error(transparent)]
    Game(#[from] GameError),
}

impl From<LedgerError> for Error {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(account) => Error::PlayerNotFound(account),
            LedgerError::InsufficientFunds { balance, requested } => Error::InsufficientFunds {
                balance,
                required: requested,
            },
            LedgerError::Storage(reason) => Error::Storage(reason),
        }
    }
}

impl Error {
    /// Code reported to the player alongside the message.
    pub fn code(&self) -> u8 {
        match self {
            Error::InvalidBet(_) => ERROR_INVALID_BET,
            Error::AlreadyPlaying(_) => ERROR_ALREADY_PLAYING,
            Error::InsufficientFunds { .. } => ERROR_INSUFFICIENT_FUNDS,
            Error::PlayerNotFound(_) => ERROR_PLAYER_NOT_FOUND,
            Error::Storage(_) => ERROR_STORAGE,
            Error::Presentation(_) => ERROR_PRESENTATION,
            Error::NoActiveGame => ERROR_NO_ACTIVE_GAME,
            Error::Unauthorized => ERROR_UNAUTHORIZED,
            Error::Unsupported(_) => ERROR_UNSUPPORTED,
            Error::Game(_) => ERROR_INVALID_MOVE,
        }
    }
}

/// Tunables of the live casino.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Players exempt from balance checks.
    pub privileged: HashSet<PlayerId>,
    /// Players allowed to run account administration commands.
    pub operators: HashSet<PlayerId>,
    pub reveal_frames: u32,
    pub frame_delay: Duration,
    pub autoplay_rounds: u32,
    pub natural_return: Decimal,
    pub leaderboard_limit: usize,
    pub session_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            privileged: HashSet::new(),
            operators: HashSet::new(),
            reveal_frames: REVEAL_FRAMES,
            frame_delay: Duration::from_millis(FRAME_DELAY_MS),
            autoplay_rounds: AUTOPLAY_ROUNDS,
            natural_return: NATURAL_RETURN,
            leaderboard_limit: LEADERBOARD_LIMIT,
            session_timeout: Duration::from_secs(SESSION_TIMEOUT_SECS),
        }
    }
}

/// Who issued a command, and where.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Context {
    pub guild: GuildId,
    pub channel: ChannelId,
    pub player: PlayerId,
}

impl Context {
    pub fn account(&self) -> Account {
        Account::new(self.guild, self.player)
    }
}

impl From<&Request> for Context {
    fn from(request: &Request) -> Self {
        Self {
            guild: request.guild,
            channel: request.channel,
            player: request.player,
        }
    }
}

/// The game session controller.
///
/// Shared across concurrently running commands; each command borrows it
/// immutably for its whole duration.
pub struct Casino<L: Ledger, P: Presenter> {
    ledger: L,
    presenter: P,
    machine: Machine,
    rng: Mutex<GameRng>,
    registry: Registry,
    settings: Settings,
}

impl<L: Ledger, P: Presenter> Casino<L, P> {
    pub fn new(
        ledger: L,
        presenter: P,
        machine: Machine,
        rng: GameRng,
        settings: Settings,
    ) -> Self {
        Self {
            ledger,
            presenter,
            machine,
            rng: Mutex::new(rng),
            registry: Registry::new(),
            settings,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// Never held across an await.
    fn rng(&self) -> MutexGuard<'_, GameRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reject a bet that is not positive or whose best possible return
    /// would not fit in a payout.
    fn check_bet(bet: i64, top_return: Decimal) -> Result<(), Error> {
        if bet <= 0 || top_return.checked_mul_int(bet).is_none() {
            return Err(Error::InvalidBet(bet));
        }
        Ok(())
    }

    fn is_privileged(&self, player: PlayerId) -> bool {
        self.settings.privileged.contains(&player)
    }

    fn ensure_operator(&self, player: PlayerId) -> Result<(), Error> {
        if self.settings.operators.contains(&player) {
            Ok(())
        } else {
            Err(Error::Unauthorized)
        }
    }

    /// Run one decoded command to completion, reporting rejections to the
    /// player.
    pub async fn execute(&self, request: Request) -> Result<(), Error> {
        let ctx = Context::from(&request);
        let result = match request.command {
            Command::Slot { bet } => self.play_slot(ctx, bet).await.map(|_| ()),
            Command::AutoSlot { bet } => self.auto_play(ctx, bet).await.map(|_| ()),
            Command::Blackjack { bet } => self.start_blackjack(ctx, bet).await.map(|_| ()),
            Command::BlackjackMove { action } => {
                self.blackjack_action(ctx, action).await.map(|_| ())
            }
            Command::Balance => self.show_balance(ctx).await,
            Command::Leaderboard => self.show_leaderboard(ctx).await,
            Command::GrantAll { amount } => self.grant_all(ctx, amount).await.map(|_| ()),
            Command::Give { target, amount } => self.give(ctx, target, amount).await.map(|_| ()),
        };

        if let Err(err) = &result {
            let view = View::Rejected {
                code: err.code(),
                message: err.to_string(),
            };
            if let Err(present) = self
                .presenter
                .report_outcome(ctx.channel, ctx.player, view)
                .await
            {
                warn!(player = %ctx.player, ?present, "failed to report rejection");
            }
        }
        result
    }

    /// Post `view` as an update if a message exists; failures are logged.
    async fn try_update(&self, handle: Option<MessageHandle>, view: View) {
        let Some(handle) = handle else {
            return;
        };
        if let Err(err) = self.presenter.update(handle, view).await {
            warn!(?handle, ?err, "failed to update message");
        }
    }

    /// Release a message once its session is over.
    async fn try_close(&self, handle: Option<MessageHandle>) {
        if let Some(handle) = handle {
            self.presenter.close(handle).await;
        }
    }

    /// Report a final view; failures are logged.
    async fn try_report(&self, ctx: Context, view: View) {
        if let Err(err) = self.presenter.report_outcome(ctx.channel, ctx.player, view).await {
            warn!(player = %ctx.player, ?err, "failed to report outcome");
        }
    }
}
