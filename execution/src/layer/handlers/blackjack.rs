use super::*;
use crate::{casino::blackjack::Table, registry::BlackjackSession};
use coinbot_types::{
    api::{Action, BlackjackView},
    casino::WIN_RETURN,
};
use tokio::time::Instant;
use tracing::{debug, error, info};

impl<L: Ledger, P: Presenter> Casino<L, P> {
    /// Debit `bet` and deal a hand. Naturals settle immediately.
    pub async fn start_blackjack(&self, ctx: Context, bet: i64) -> Result<BlackjackView, Error> {
        let account = ctx.account();
        let guard = self
            .registry
            .try_claim(ctx.player)
            .ok_or(Error::AlreadyPlaying(ctx.player))?;
        Self::check_bet(bet, self.top_blackjack_return())?;

        let balance = self
            .ledger
            .debit(account, bet, self.is_privileged(ctx.player))
            .await?;
        let dealt = {
            let mut rng = self.rng();
            Table::new(bet, self.settings.natural_return, &mut rng)
        };
        let table = match dealt {
            Ok(table) => table,
            Err(err) => {
                self.refund(account, bet).await;
                return Err(err.into());
            }
        };
        info!(player = %ctx.player, guild = %ctx.guild, bet, balance, "blackjack started");

        let mut session = BlackjackSession {
            account,
            channel: ctx.channel,
            handle: None,
            table,
            touched: Instant::now(),
            closed: false,
        };

        if session.table.is_complete() {
            // Natural on the deal: nothing to wait for
            let view = self.settle_blackjack(ctx.player, &mut session).await;
            drop(guard);
            return view;
        }

        let view = session.table.view();
        match self
            .presenter
            .send_initial(
                ctx.channel,
                ctx.player,
                View::Blackjack {
                    table: view.clone(),
                    balance: Some(balance),
                },
            )
            .await
        {
            Ok(handle) => session.handle = Some(handle),
            Err(err) => {
                // The player cannot act on a hand they never saw
                warn!(player = %ctx.player, ?err, "failed to post blackjack table, refunding");
                self.refund(account, bet).await;
                return Err(err.into());
            }
        }

        guard.into_blackjack(session);
        Ok(view)
    }

    /// Best return of a hand per unit bet: a natural, or a doubled win.
    fn top_blackjack_return(&self) -> Decimal {
        self.settings
            .natural_return
            .max(Decimal::from_int(WIN_RETURN.saturating_mul(2)))
    }

    /// Apply a player action to their open hand.
    pub async fn blackjack_action(
        &self,
        ctx: Context,
        action: Action,
    ) -> Result<BlackjackView, Error> {
        let shared = self
            .registry
            .blackjack(ctx.player)
            .ok_or(Error::NoActiveGame)?;
        let mut session = shared.lock().await;
        if session.closed {
            return Err(Error::NoActiveGame);
        }
        session.touched = Instant::now();

        match action {
            Action::Hit => session.table.hit()?,
            Action::Stand => session.table.stand()?,
            Action::Double => {
                let bet = session.table.bet();
                let balance = self
                    .ledger
                    .debit(session.account, bet, self.is_privileged(ctx.player))
                    .await?;
                debug!(player = %ctx.player, bet, balance, "blackjack double");
                if let Err(err) = session.table.double() {
                    self.refund(session.account, bet).await;
                    return Err(err.into());
                }
            }
            Action::Split => return Err(Error::Unsupported("split")),
        }
        debug!(player = %ctx.player, ?action, "blackjack action");

        if session.table.is_complete() {
            let view = self.settle_blackjack(ctx.player, &mut session).await;
            self.registry.release_blackjack(ctx.player, &shared);
            return view;
        }

        let view = session.table.view();
        let balance = self.ledger.balance(session.account).await.ok();
        self.try_update(
            session.handle,
            View::Blackjack {
                table: view.clone(),
                balance,
            },
        )
        .await;
        Ok(view)
    }

    /// Stand every hand idle since before `now - session_timeout`.
    ///
    /// Hands busy with an action are skipped. Returns how many were closed.
    pub async fn expire_idle(&self, now: Instant) -> usize {
        let mut expired = 0;
        for (player, shared) in self.registry.blackjack_sessions() {
            let Ok(mut session) = shared.try_lock() else {
                continue;
            };
            if session.closed
                || now.saturating_duration_since(session.touched) < self.settings.session_timeout
            {
                continue;
            }

            if let Err(err) = session.table.stand() {
                // Nothing sensible left to play: give the stake back
                warn!(%player, ?err, "idle blackjack could not be stood, refunding");
                let stake = session.table.stake();
                self.refund(session.account, stake).await;
                self.try_close(session.handle).await;
                session.closed = true;
            } else {
                match self.settle_blackjack(player, &mut session).await {
                    Ok(view) => {
                        info!(%player, returned = view.returned, "idle blackjack auto-stood")
                    }
                    Err(err) => error!(%player, ?err, "idle blackjack could not be settled"),
                }
            }
            self.registry.release_blackjack(player, &shared);
            expired += 1;
        }
        expired
    }

    /// Pay out a completed hand and report it. The caller removes the
    /// session from the registry whatever this returns.
    async fn settle_blackjack(
        &self,
        player: PlayerId,
        session: &mut BlackjackSession,
    ) -> Result<BlackjackView, Error> {
        session.closed = true;
        let view = session.table.view();
        let returned = view.returned;
        let balance = if returned > 0 {
            self.ledger.credit(session.account, returned).await
        } else {
            self.ledger.balance(session.account).await
        };
        let balance = match balance {
            Ok(balance) => balance,
            Err(err) => {
                error!(%player, returned, ?err, "failed to settle blackjack");
                self.try_close(session.handle).await;
                return Err(err.into());
            }
        };
        info!(
            %player,
            stake = view.stake,
            returned,
            result = ?view.result,
            balance,
            "blackjack settled"
        );

        let outcome = View::Blackjack {
            table: view.clone(),
            balance: Some(balance),
        };
        self.try_update(session.handle, outcome.clone()).await;
        self.try_close(session.handle).await;
        let ctx = Context {
            guild: session.account.guild,
            channel: session.channel,
            player,
        };
        self.try_report(ctx, outcome).await;
        Ok(view)
    }

    /// Return `amount` after a hand that could not go ahead.
    async fn refund(&self, account: Account, amount: i64) {
        match self.ledger.credit(account, amount).await {
            Ok(balance) => debug!(%account, amount, balance, "refunded"),
            Err(err) => error!(%account, amount, ?err, "failed to refund"),
        }
    }
}
