use anyhow::Context;
use clap::Parser;
use coinbot_simulator::{Config, Optimizer};
use coinbot_types::casino::Machine;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Return per unit bet to calibrate for.
    #[arg(short, long, default_value_t = 0.98)]
    target: f64,

    /// Base simulation budget.
    #[arg(long, default_value_t = 5_000_000)]
    trials: u64,

    /// Trials for the final verification pass.
    #[arg(long, default_value_t = 5_000_000)]
    verify_trials: u64,

    /// Seed for a reproducible run (random when absent).
    #[arg(short, long)]
    seed: Option<u64>,

    /// Machine file to start from (production machine when absent).
    #[arg(short, long)]
    machine: Option<PathBuf>,

    /// Where to write the calibrated machine (stdout when absent).
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, default_value_t = 1)]
    decimals: u32,

    #[arg(long, default_value_t = 20)]
    population: usize,

    #[arg(long, default_value_t = 5)]
    elite: usize,

    /// Generations of the genetic search (0 skips it).
    #[arg(long, default_value_t = 50)]
    generations: usize,

    /// Hill-climb iterations (0 skips it).
    #[arg(long, default_value_t = 30)]
    hill_iterations: usize,
}

fn main() -> anyhow::Result<()> {
    // Parse args
    let args = Args::parse();

    // Create logger
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Load starting machine
    let initial = match &args.machine {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_yaml::from_str::<Machine>(&raw)
                .with_context(|| format!("invalid machine file {}", path.display()))?
        }
        None => Machine::standard(),
    };

    let seed = args.seed.unwrap_or_else(rand::random);
    let config = Config {
        target_roi: args.target,
        trials: args.trials,
        verify_trials: args.verify_trials,
        seed,
        decimals: args.decimals,
        population: args.population,
        elite: args.elite,
        generations: args.generations,
        hill_iterations: args.hill_iterations,
        ..Config::default()
    };
    let mut optimizer = Optimizer::new(config).context("invalid optimizer settings")?;
    info!(seed, target = args.target, trials = args.trials, "optimizer configured");

    let started = std::time::Instant::now();
    let report = optimizer.optimize(initial);
    for step in &report.strategies {
        info!(
            strategy = %step.strategy,
            roi = step.roi,
            improved = step.improved,
            "strategy result"
        );
    }
    info!(
        initial = report.initial_roi,
        verified = report.best.roi,
        error = report.best.distance(report.target_roi),
        elapsed = ?started.elapsed(),
        "calibration finished"
    );

    // Emit machine
    let yaml = serde_yaml::to_string(&report.best.machine).context("failed to encode machine")?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, yaml)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "machine written");
        }
        None => print!("{yaml}"),
    }
    Ok(())
}
