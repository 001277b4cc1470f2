use anyhow::Context;
use clap::{Arg, Command};
use coinbot_execution::{casino::GameRng, Casino, Memory};
use coinbot_node::{
    frontend,
    presenter::{write_events, ConsolePresenter},
    sweeper, Config,
};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse arguments
    let matches = Command::new("node")
        .about("Runs the coinbot casino over JSON lines on stdin and stdout.")
        .arg(Arg::new("config").long("config").required(true))
        .get_matches();

    // Load config
    let config_file = matches
        .get_one::<String>("config")
        .context("missing --config")?;
    let raw = std::fs::read_to_string(config_file)
        .with_context(|| format!("could not read config file {config_file}"))?;
    let config: Config = serde_yaml::from_str(&raw).context("could not parse config file")?;
    let config = config.validate().context("invalid config")?;

    // Configure logging (stdout carries events)
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_max_level(config.log_level)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(config.log_level)
            .with_writer(std::io::stderr)
            .init();
    }

    // Assemble casino
    let ledger = Memory::new(config.starting_balance, config.auto_provision);
    let (presenter, events) = ConsolePresenter::new();
    let rng = match config.seed {
        Some(seed) => GameRng::new(seed),
        None => GameRng::from_entropy(),
    };
    let casino = Arc::new(Casino::new(
        ledger,
        presenter,
        config.machine,
        rng,
        config.settings,
    ));
    info!(
        seeded = config.seed.is_some(),
        sweep_interval = ?config.sweep_interval,
        "casino ready"
    );

    // Start background tasks
    let writer = tokio::spawn(write_events(events, tokio::io::stdout()));
    let sweeper = tokio::spawn(sweeper::run(casino.clone(), config.sweep_interval));

    // Serve until input closes or we are interrupted
    let input = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = frontend::run(input, casino.clone()) => {
            let intake = result.context("failed to read commands")?;
            info!(dispatched = intake.dispatched, malformed = intake.malformed, "input finished");
        }
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for interrupt")?;
            info!("interrupted");
        }
    }

    // Drain output
    sweeper.abort();
    let _ = sweeper.await;
    drop(casino);
    match writer.await {
        Ok(Ok(written)) => info!(written, "events flushed"),
        Ok(Err(err)) => error!(?err, "failed to write events"),
        Err(err) => error!(?err, "event writer panicked"),
    }
    Ok(())
}
