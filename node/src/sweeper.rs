use coinbot_execution::{Casino, Ledger, Presenter};
use std::{sync::Arc, time::Duration};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Periodically close blackjack hands left idle past the session timeout.
///
/// Runs until the task is dropped.
pub async fn run<L: Ledger, P: Presenter>(casino: Arc<Casino<L, P>>, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let expired = casino.expire_idle(Instant::now()).await;
        if expired > 0 {
            info!(expired, "expired idle sessions");
        } else {
            debug!(active = casino.registry().len(), "no idle sessions");
        }
    }
}
