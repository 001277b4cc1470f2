use super::*;
use coinbot_types::casino::Leaderboard;
use tracing::info;

impl<L: Ledger, P: Presenter> Casino<L, P> {
    pub async fn balance(&self, ctx: Context) -> Result<i64, Error> {
        Ok(self.ledger.balance(ctx.account()).await?)
    }

    /// Richest players of the caller's guild.
    pub async fn leaderboard(&self, guild: GuildId) -> Result<Leaderboard, Error> {
        let balances = self.ledger.guild_balances(guild).await?;
        Ok(Leaderboard::from_balances(
            guild,
            self.settings.leaderboard_limit,
            balances,
        ))
    }

    /// Set every balance of the caller's guild to `amount`.
    pub async fn grant_all(&self, ctx: Context, amount: i64) -> Result<usize, Error> {
        self.ensure_operator(ctx.player)?;
        let touched = self.ledger.set_guild(ctx.guild, amount).await?;
        info!(issuer = %ctx.player, guild = %ctx.guild, amount, touched, "balances reset");
        self.try_report(
            ctx,
            View::Notice {
                message: format!("Set {touched} balances to {amount}."),
            },
        )
        .await;
        Ok(touched)
    }

    /// Add `amount` to `target`'s balance in the caller's guild.
    pub async fn give(&self, ctx: Context, target: PlayerId, amount: i64) -> Result<i64, Error> {
        self.ensure_operator(ctx.player)?;
        let balance = self
            .ledger
            .give(Account::new(ctx.guild, target), amount)
            .await?;
        info!(issuer = %ctx.player, guild = %ctx.guild, %target, amount, balance, "coins given");
        self.try_report(
            ctx,
            View::Notice {
                message: format!("Gave {amount} to {target}; new balance {balance}."),
            },
        )
        .await;
        Ok(balance)
    }

    pub(in crate::layer) async fn show_balance(&self, ctx: Context) -> Result<(), Error> {
        let balance = self.balance(ctx).await?;
        self.try_report(
            ctx,
            View::Balance {
                player: ctx.player,
                balance,
            },
        )
        .await;
        Ok(())
    }

    pub(in crate::layer) async fn show_leaderboard(&self, ctx: Context) -> Result<(), Error> {
        let leaderboard = self.leaderboard(ctx.guild).await?;
        self.try_report(ctx, View::Leaderboard(leaderboard)).await;
        Ok(())
    }
}
