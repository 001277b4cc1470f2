use super::*;
use crate::casino::slots::{evaluate, max_return, spin, SpinResult};
use coinbot_types::casino::Board;
use tracing::{debug, error, info};

/// Totals of an auto-play batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AutoPlaySummary {
    pub rounds_played: u32,
    pub total_bet: i64,
    pub total_payout: i64,
    pub balance: i64,
}

impl<L: Ledger, P: Presenter> Casino<L, P> {
    /// Draw and evaluate one board for `bet`.
    fn spin_round(&self, bet: i64) -> SpinResult {
        let board = spin(&self.machine.frequencies, &mut self.rng());
        evaluate(&board, &self.machine.payouts, bet)
    }

    fn display_spin(&self) -> Board {
        spin(&self.machine.frequencies, &mut self.rng())
    }

    /// Play one slot round: debit, animate, evaluate, credit, report.
    pub async fn play_slot(&self, ctx: Context, bet: i64) -> Result<(SpinResult, i64), Error> {
        let account = ctx.account();
        let _guard = self
            .registry
            .try_claim(ctx.player)
            .ok_or(Error::AlreadyPlaying(ctx.player))?;
        Self::check_bet(bet, max_return(&self.machine.payouts))?;

        // The bet is taken before anything is drawn
        let balance = self
            .ledger
            .debit(account, bet, self.is_privileged(ctx.player))
            .await?;
        info!(player = %ctx.player, guild = %ctx.guild, bet, balance, "slot round started");

        let frames = self.settings.reveal_frames;
        let handle = match self
            .presenter
            .send_initial(
                ctx.channel,
                ctx.player,
                View::SlotFrame {
                    board: Board::placeholder(),
                    bet,
                    frame: 0,
                    frames,
                },
            )
            .await
        {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(player = %ctx.player, ?err, "failed to post slot machine");
                None
            }
        };

        for frame in 1..=frames {
            let board = self.display_spin();
            self.try_update(
                handle,
                View::SlotFrame {
                    board,
                    bet,
                    frame,
                    frames,
                },
            )
            .await;
            tokio::time::sleep(self.settings.frame_delay).await;
        }

        let result = self.spin_round(bet);
        let payout = result.payout_coins();
        let balance = if payout > 0 {
            match self.ledger.credit(account, payout).await {
                Ok(balance) => balance,
                Err(err) => {
                    error!(player = %ctx.player, bet, payout, ?err, "failed to credit payout");
                    self.try_close(handle).await;
                    return Err(err.into());
                }
            }
        } else {
            balance
        };
        info!(
            player = %ctx.player,
            bet,
            payout,
            lines = result.winning_lines.len(),
            balance,
            "slot round settled"
        );

        let view = View::SlotResult {
            board: result.board,
            bet,
            payout,
            winning_lines: result.winning_lines.clone(),
            balance,
        };
        self.try_update(handle, view.clone()).await;
        self.try_close(handle).await;
        self.try_report(ctx, view).await;
        Ok((result, balance))
    }

    /// Play `autoplay_rounds` slot rounds back to back as one session.
    ///
    /// Each round is persisted as it settles. A round the ledger refuses ends
    /// the batch early.
    pub async fn auto_play(&self, ctx: Context, bet: i64) -> Result<AutoPlaySummary, Error> {
        let account = ctx.account();
        let _guard = self
            .registry
            .try_claim(ctx.player)
            .ok_or(Error::AlreadyPlaying(ctx.player))?;
        Self::check_bet(bet, max_return(&self.machine.payouts))?;

        let rounds = self.settings.autoplay_rounds;
        let privileged = self.is_privileged(ctx.player);
        let mut balance = self.ledger.balance(account).await?;
        let required = bet.saturating_mul(rounds as i64);
        if !privileged && balance < required {
            return Err(Error::InsufficientFunds { balance, required });
        }
        info!(player = %ctx.player, guild = %ctx.guild, bet, rounds, balance, "auto-play started");

        let handle = match self
            .presenter
            .send_initial(
                ctx.channel,
                ctx.player,
                View::AutoSlotRound {
                    round: 0,
                    rounds,
                    board: Board::placeholder(),
                    bet,
                    payout: 0,
                    balance,
                },
            )
            .await
        {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(player = %ctx.player, ?err, "failed to post auto-play");
                None
            }
        };

        let mut summary = AutoPlaySummary {
            rounds_played: 0,
            total_bet: 0,
            total_payout: 0,
            balance,
        };
        for round in 1..=rounds {
            balance = match self.ledger.debit(account, bet, privileged).await {
                Ok(balance) => balance,
                Err(LedgerError::InsufficientFunds { balance, .. }) => {
                    debug!(player = %ctx.player, round, balance, "auto-play out of funds");
                    break;
                }
                Err(err) => {
                    error!(player = %ctx.player, round, ?err, "auto-play debit failed");
                    self.try_close(handle).await;
                    return Err(err.into());
                }
            };
            let result = self.spin_round(bet);
            let payout = result.payout_coins();
            if payout > 0 {
                balance = match self.ledger.credit(account, payout).await {
                    Ok(balance) => balance,
                    Err(err) => {
                        error!(
                            player = %ctx.player,
                            round,
                            payout,
                            ?err,
                            "auto-play credit failed"
                        );
                        self.try_close(handle).await;
                        return Err(err.into());
                    }
                };
            }
            summary.rounds_played = round;
            summary.total_bet = summary.total_bet.saturating_add(bet);
            summary.total_payout = summary.total_payout.saturating_add(payout);
            summary.balance = balance;
            debug!(player = %ctx.player, round, payout, balance, "auto-play round settled");

            self.try_update(
                handle,
                View::AutoSlotRound {
                    round,
                    rounds,
                    board: result.board,
                    bet,
                    payout,
                    balance,
                },
            )
            .await;
            tokio::time::sleep(self.settings.frame_delay).await;
        }
        info!(
            player = %ctx.player,
            rounds_played = summary.rounds_played,
            total_bet = summary.total_bet,
            total_payout = summary.total_payout,
            balance = summary.balance,
            "auto-play finished"
        );

        let view = View::AutoSlotSummary {
            rounds_played: summary.rounds_played,
            rounds,
            bet,
            total_bet: summary.total_bet,
            total_payout: summary.total_payout,
            balance: summary.balance,
        };
        self.try_update(handle, view.clone()).await;
        self.try_close(handle).await;
        self.try_report(ctx, view).await;
        Ok(summary)
    }
}
