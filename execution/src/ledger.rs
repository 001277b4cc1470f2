use coinbot_types::casino::{Account, GuildId, PlayerId, STARTING_BALANCE};
use std::{
    collections::HashMap,
    future::Future,
    sync::{PoisonError, RwLock},
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("account not found: {0}")]
    NotFound(Account),
    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: i64, requested: i64 },
    #[error("storage error: {0}")]
    Storage(String),
}

/// Per-guild coin balances.
///
/// Every mutation is atomic with respect to other calls on the same account
/// and returns the resulting balance.
pub trait Ledger: Send + Sync + 'static {
    /// Current balance. Unknown accounts are provisioned with the starting
    /// balance when the ledger allows it.
    fn balance(&self, account: Account) -> impl Future<Output = Result<i64, LedgerError>> + Send;

    /// Subtract `amount`. Unless `overdraft` is set, fails without mutating
    /// when the balance is lower than `amount`.
    fn debit(
        &self,
        account: Account,
        amount: i64,
        overdraft: bool,
    ) -> impl Future<Output = Result<i64, LedgerError>> + Send;

    /// Add `amount`.
    fn credit(
        &self,
        account: Account,
        amount: i64,
    ) -> impl Future<Output = Result<i64, LedgerError>> + Send;

    /// Add `amount`, creating the account with the starting balance plus
    /// `amount` if it does not exist yet.
    fn give(
        &self,
        account: Account,
        amount: i64,
    ) -> impl Future<Output = Result<i64, LedgerError>> + Send;

    /// Set every known account of `guild` to `amount`. Returns how many
    /// accounts were touched.
    fn set_guild(
        &self,
        guild: GuildId,
        amount: i64,
    ) -> impl Future<Output = Result<usize, LedgerError>> + Send;

    /// All balances of `guild`, in no particular order.
    fn guild_balances(
        &self,
        guild: GuildId,
    ) -> impl Future<Output = Result<Vec<(PlayerId, i64)>, LedgerError>> + Send;
}

/// In-process ledger.
pub struct Memory {
    balances: RwLock<HashMap<Account, i64>>,
    starting_balance: i64,
    auto_provision: bool,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(STARTING_BALANCE, true)
    }
}

impl Memory {
    pub fn new(starting_balance: i64, auto_provision: bool) -> Self {
        Self {
            balances: RwLock::new(HashMap::new()),
            starting_balance,
            auto_provision,
        }
    }

    /// Seed an account directly.
    pub fn insert(&self, account: Account, balance: i64) {
        self.balances
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(account, balance);
    }

    fn update<T>(
        &self,
        account: Account,
        f: impl FnOnce(&mut i64) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let mut balances = self.balances.write().unwrap_or_else(PoisonError::into_inner);
        if !balances.contains_key(&account) {
            if !self.auto_provision {
                return Err(LedgerError::NotFound(account));
            }
            balances.insert(account, self.starting_balance);
            debug!(%account, balance = self.starting_balance, "provisioned");
        }
        let balance = balances
            .get_mut(&account)
            .ok_or(LedgerError::NotFound(account))?;
        f(balance)
    }
}

impl Ledger for Memory {
    async fn balance(&self, account: Account) -> Result<i64, LedgerError> {
        self.update(account, |balance| Ok(*balance))
    }

    async fn debit(
        &self,
        account: Account,
        amount: i64,
        overdraft: bool,
    ) -> Result<i64, LedgerError> {
        let result = self.update(account, |balance| {
            if !overdraft && *balance < amount {
                return Err(LedgerError::InsufficientFunds {
                    balance: *balance,
                    requested: amount,
                });
            }
            *balance = balance.saturating_sub(amount);
            Ok(*balance)
        })?;
        debug!(%account, amount, balance = result, "debited");
        Ok(result)
    }

    async fn credit(&self, account: Account, amount: i64) -> Result<i64, LedgerError> {
        let result = self.update(account, |balance| {
            *balance = balance.saturating_add(amount);
            Ok(*balance)
        })?;
        debug!(%account, amount, balance = result, "credited");
        Ok(result)
    }

    async fn give(&self, account: Account, amount: i64) -> Result<i64, LedgerError> {
        let mut balances = self.balances.write().unwrap_or_else(PoisonError::into_inner);
        let balance = balances.entry(account).or_insert(self.starting_balance);
        *balance = balance.saturating_add(amount);
        debug!(%account, amount, balance = *balance, "gave");
        Ok(*balance)
    }

    async fn set_guild(&self, guild: GuildId, amount: i64) -> Result<usize, LedgerError> {
        let mut balances = self.balances.write().unwrap_or_else(PoisonError::into_inner);
        let mut touched = 0;
        for (_, balance) in balances.iter_mut().filter(|(account, _)| account.guild == guild) {
            *balance = amount;
            touched += 1;
        }
        debug!(%guild, amount, touched, "set guild balances");
        Ok(touched)
    }

    async fn guild_balances(&self, guild: GuildId) -> Result<Vec<(PlayerId, i64)>, LedgerError> {
        let balances = self.balances.read().unwrap_or_else(PoisonError::into_inner);
        Ok(balances
            .iter()
            .filter(|(account, _)| account.guild == guild)
            .map(|(account, balance)| (account.player, *balance))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(player: u64) -> Account {
        Account::new(GuildId(1), PlayerId(player))
    }

    #[tokio::test]
    async fn test_auto_provision() {
        let ledger = Memory::default();
        assert_eq!(ledger.balance(account(1)).await, Ok(STARTING_BALANCE));
    }

    #[tokio::test]
    async fn test_no_auto_provision() {
        let ledger = Memory::new(1_000, false);
        assert_eq!(
            ledger.balance(account(1)).await,
            Err(LedgerError::NotFound(account(1)))
        );
        assert_eq!(
            ledger.debit(account(1), 10, false).await,
            Err(LedgerError::NotFound(account(1)))
        );
        // Give always creates
        assert_eq!(ledger.give(account(1), 5).await, Ok(1_005));
    }

    #[tokio::test]
    async fn test_debit_boundary() {
        let ledger = Memory::default();
        ledger.insert(account(1), 100);
        assert_eq!(
            ledger.debit(account(1), 101, false).await,
            Err(LedgerError::InsufficientFunds {
                balance: 100,
                requested: 101
            })
        );
        assert_eq!(ledger.balance(account(1)).await, Ok(100));
        assert_eq!(ledger.debit(account(1), 100, false).await, Ok(0));
    }

    #[tokio::test]
    async fn test_overdraft() {
        let ledger = Memory::default();
        ledger.insert(account(1), 10);
        assert_eq!(ledger.debit(account(1), 50, true).await, Ok(-40));
        assert_eq!(ledger.credit(account(1), 45).await, Ok(5));
    }

    #[tokio::test]
    async fn test_guild_scoping() {
        let ledger = Memory::default();
        ledger.insert(account(1), 10);
        ledger.insert(account(2), 20);
        ledger.insert(Account::new(GuildId(2), PlayerId(1)), 30);

        assert_eq!(ledger.set_guild(GuildId(1), 500).await, Ok(2));
        let mut balances = ledger.guild_balances(GuildId(1)).await.unwrap();
        balances.sort();
        assert_eq!(balances, vec![(PlayerId(1), 500), (PlayerId(2), 500)]);
        assert_eq!(
            ledger.balance(Account::new(GuildId(2), PlayerId(1))).await,
            Ok(30)
        );
    }
}
