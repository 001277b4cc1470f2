//! Test doubles for the ledger and presentation seams.

use crate::{
    casino::GameRng,
    ledger::{Ledger, LedgerError, Memory},
    layer::{Casino, Context, Settings},
    presenter::{PresentError, Presenter},
};
use coinbot_types::{
    api::{MessageHandle, View},
    casino::{Account, ChannelId, GuildId, Machine, PlayerId},
};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Mutex, PoisonError,
    },
    time::Duration,
};

/// Something the casino asked the presenter to show.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Presented {
    Initial {
        handle: MessageHandle,
        channel: ChannelId,
        player: PlayerId,
        view: View,
    },
    Update {
        handle: MessageHandle,
        view: View,
    },
    Outcome {
        channel: ChannelId,
        player: PlayerId,
        view: View,
    },
}

/// Records every call; each kind of call can be made to fail.
#[derive(Default)]
pub struct RecordingPresenter {
    next: AtomicU64,
    log: Mutex<Vec<Presented>>,
    closed: Mutex<Vec<MessageHandle>>,
    pub fail_initial: AtomicBool,
    pub fail_updates: AtomicBool,
    pub fail_outcomes: AtomicBool,
}

impl RecordingPresenter {
    /// A presenter where every call fails.
    pub fn failing() -> Self {
        let presenter = Self::default();
        presenter.fail_initial.store(true, Ordering::SeqCst);
        presenter.fail_updates.store(true, Ordering::SeqCst);
        presenter.fail_outcomes.store(true, Ordering::SeqCst);
        presenter
    }

    pub fn log(&self) -> Vec<Presented> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Views passed to `report_outcome`, in order.
    pub fn outcomes(&self) -> Vec<View> {
        self.log()
            .into_iter()
            .filter_map(|entry| match entry {
                Presented::Outcome { view, .. } => Some(view),
                _ => None,
            })
            .collect()
    }

    /// Handles passed to `close`, in order.
    pub fn closed(&self) -> Vec<MessageHandle> {
        self.closed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Views passed to `update`, in order.
    pub fn updates(&self) -> Vec<View> {
        self.log()
            .into_iter()
            .filter_map(|entry| match entry {
                Presented::Update { view, .. } => Some(view),
                _ => None,
            })
            .collect()
    }

    fn record(&self, entry: Presented) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}

impl Presenter for RecordingPresenter {
    async fn send_initial(
        &self,
        channel: ChannelId,
        player: PlayerId,
        view: View,
    ) -> Result<MessageHandle, PresentError> {
        if self.fail_initial.load(Ordering::SeqCst) {
            return Err(PresentError::Failed("send_initial".into()));
        }
        let handle = MessageHandle(self.next.fetch_add(1, Ordering::SeqCst));
        self.record(Presented::Initial {
            handle,
            channel,
            player,
            view,
        });
        Ok(handle)
    }

    async fn update(&self, handle: MessageHandle, view: View) -> Result<(), PresentError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(PresentError::NotFound(handle));
        }
        self.record(Presented::Update { handle, view });
        Ok(())
    }

    async fn close(&self, handle: MessageHandle) {
        self.closed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }

    async fn report_outcome(
        &self,
        channel: ChannelId,
        player: PlayerId,
        view: View,
    ) -> Result<(), PresentError> {
        if self.fail_outcomes.load(Ordering::SeqCst) {
            return Err(PresentError::Failed("report_outcome".into()));
        }
        self.record(Presented::Outcome {
            channel,
            player,
            view,
        });
        Ok(())
    }
}

/// In-memory ledger whose reads, debits and credits can be made to fail.
#[derive(Default)]
pub struct FailingLedger {
    pub inner: Memory,
    pub fail_reads: AtomicBool,
    pub fail_debits: AtomicBool,
    pub fail_credits: AtomicBool,
}

impl FailingLedger {
    fn storage(op: &str) -> LedgerError {
        LedgerError::Storage(format!("{op} unavailable"))
    }
}

impl Ledger for FailingLedger {
    async fn balance(&self, account: Account) -> Result<i64, LedgerError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::storage("balance"));
        }
        self.inner.balance(account).await
    }

    async fn debit(
        &self,
        account: Account,
        amount: i64,
        overdraft: bool,
    ) -> Result<i64, LedgerError> {
        if self.fail_debits.load(Ordering::SeqCst) {
            return Err(Self::storage("debit"));
        }
        self.inner.debit(account, amount, overdraft).await
    }

    async fn credit(&self, account: Account, amount: i64) -> Result<i64, LedgerError> {
        if self.fail_credits.load(Ordering::SeqCst) {
            return Err(Self::storage("credit"));
        }
        self.inner.credit(account, amount).await
    }

    async fn give(&self, account: Account, amount: i64) -> Result<i64, LedgerError> {
        if self.fail_credits.load(Ordering::SeqCst) {
            return Err(Self::storage("give"));
        }
        self.inner.give(account, amount).await
    }

    async fn set_guild(&self, guild: GuildId, amount: i64) -> Result<usize, LedgerError> {
        self.inner.set_guild(guild, amount).await
    }

    async fn guild_balances(&self, guild: GuildId) -> Result<Vec<(PlayerId, i64)>, LedgerError> {
        self.inner.guild_balances(guild).await
    }
}

/// Settings with no animation delay.
pub fn instant_settings() -> Settings {
    Settings {
        frame_delay: Duration::ZERO,
        ..Settings::default()
    }
}

/// Context for `player` in guild 1, channel 1.
pub fn context(player: u64) -> Context {
    Context {
        guild: GuildId(1),
        channel: ChannelId(1),
        player: PlayerId(player),
    }
}

/// A casino over the given ledger with a recording presenter.
pub fn create_casino<L: Ledger>(
    ledger: L,
    machine: Machine,
    settings: Settings,
    seed: u64,
) -> Casino<L, RecordingPresenter> {
    Casino::new(
        ledger,
        RecordingPresenter::default(),
        machine,
        GameRng::new(seed),
        settings,
    )
}
