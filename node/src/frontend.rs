//! JSON-lines command intake.
//!
//! Each line is one [Request]. Requests are decoded at the boundary and run
//! concurrently, one task per command, against a shared [Casino].

use coinbot_execution::{Casino, Ledger, Presenter};
use coinbot_types::api::Request;
use std::sync::Arc;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    task::JoinSet,
};
use tracing::{debug, info, warn};

/// What happened to the lines of an input stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Intake {
    pub dispatched: usize,
    pub malformed: usize,
}

/// Dispatch every request read from `input` until it ends, then wait for
/// the dispatched commands to finish.
pub async fn run<R, L, P>(input: R, casino: Arc<Casino<L, P>>) -> std::io::Result<Intake>
where
    R: AsyncBufRead + Unpin,
    L: Ledger,
    P: Presenter,
{
    let mut lines = input.lines();
    let mut tasks = JoinSet::new();
    let mut intake = Intake::default();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let request: Request = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(err) => {
                warn!(?err, line, "malformed request");
                intake.malformed += 1;
                continue;
            }
        };
        debug!(player = %request.player, command = ?request.command, "request received");

        let casino = casino.clone();
        tasks.spawn(async move {
            let player = request.player;
            if let Err(err) = casino.execute(request).await {
                debug!(%player, %err, "request rejected");
            }
        });
        intake.dispatched += 1;

        // Reap finished commands as we go
        while let Some(result) = tasks.try_join_next() {
            if let Err(err) = result {
                warn!(?err, "command task failed");
            }
        }
    }

    info!(
        dispatched = intake.dispatched,
        malformed = intake.malformed,
        pending = tasks.len(),
        "input closed"
    );
    while let Some(result) = tasks.join_next().await {
        if let Err(err) = result {
            warn!(?err, "command task failed");
        }
    }
    Ok(intake)
}
