use coinbot_execution::Settings;
use coinbot_types::casino::{
    Decimal, Machine, PlayerId, AUTOPLAY_ROUNDS, FRAME_DELAY_MS, LEADERBOARD_LIMIT,
    REVEAL_FRAMES, SESSION_TIMEOUT_SECS, STARTING_BALANCE,
};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use thiserror::Error;
use tracing::Level;

pub mod frontend;
pub mod presenter;
pub mod sweeper;

/// Configuration of a casino process, as read from YAML.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json_logs: bool,

    #[serde(default = "default_starting_balance")]
    pub starting_balance: i64,
    #[serde(default = "default_auto_provision")]
    pub auto_provision: bool,
    #[serde(default)]
    pub privileged_players: Vec<u64>,
    #[serde(default)]
    pub operators: Vec<u64>,

    #[serde(default = "default_reveal_frames")]
    pub reveal_frames: u32,
    #[serde(default = "default_frame_delay_ms")]
    pub frame_delay_ms: u64,
    #[serde(default = "default_autoplay_rounds")]
    pub autoplay_rounds: u32,
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_natural_return")]
    pub natural_return: f64,
    #[serde(default = "default_leaderboard_limit")]
    pub leaderboard_limit: usize,

    /// Fixed seed for the game generator (random when absent).
    #[serde(default)]
    pub seed: Option<u64>,
    /// Machine file to play (production machine when absent).
    #[serde(default)]
    pub machine: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid log level: {value}")]
    InvalidLogLevel { value: String },
    #[error("{field} must be > 0 (got {value})")]
    InvalidNonZero { field: &'static str, value: u64 },
    #[error("starting_balance must not be negative (got {0})")]
    NegativeStartingBalance(i64),
    #[error("natural_return must be at least 1 (got {0})")]
    InvalidNaturalReturn(f64),
    #[error("failed to read machine file {path}")]
    MachineRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid machine file {path}")]
    MachineParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

pub struct ValidatedConfig {
    pub log_level: Level,
    pub json_logs: bool,

    pub starting_balance: i64,
    pub auto_provision: bool,
    pub settings: Settings,
    pub sweep_interval: Duration,

    pub seed: Option<u64>,
    pub machine: Machine,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_starting_balance() -> i64 {
    STARTING_BALANCE
}

fn default_auto_provision() -> bool {
    true
}

fn default_reveal_frames() -> u32 {
    REVEAL_FRAMES
}

fn default_frame_delay_ms() -> u64 {
    FRAME_DELAY_MS
}

fn default_autoplay_rounds() -> u32 {
    AUTOPLAY_ROUNDS
}

fn default_session_timeout_secs() -> u64 {
    SESSION_TIMEOUT_SECS
}

fn default_sweep_interval_secs() -> u64 {
    30
}

fn default_natural_return() -> f64 {
    3.5
}

fn default_leaderboard_limit() -> usize {
    LEADERBOARD_LIMIT
}

fn non_zero(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidNonZero { field, value });
    }
    Ok(())
}

/// Read a machine file.
pub fn load_machine(path: &Path) -> Result<Machine, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::MachineRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&raw).map_err(|source| ConfigError::MachineParse {
        path: path.to_path_buf(),
        source,
    })
}

impl Config {
    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        non_zero("autoplay_rounds", self.autoplay_rounds as u64)?;
        non_zero("session_timeout_secs", self.session_timeout_secs)?;
        non_zero("sweep_interval_secs", self.sweep_interval_secs)?;
        non_zero("leaderboard_limit", self.leaderboard_limit as u64)?;
        if self.starting_balance < 0 {
            return Err(ConfigError::NegativeStartingBalance(self.starting_balance));
        }
        if self.natural_return.is_nan() || self.natural_return < 1.0 {
            return Err(ConfigError::InvalidNaturalReturn(self.natural_return));
        }

        let log_level =
            Level::from_str(&self.log_level).map_err(|_| ConfigError::InvalidLogLevel {
                value: self.log_level.clone(),
            })?;

        let machine = match &self.machine {
            Some(path) => load_machine(path)?,
            None => Machine::standard(),
        };

        let settings = Settings {
            privileged: self.privileged_players.into_iter().map(PlayerId).collect(),
            operators: self.operators.into_iter().map(PlayerId).collect(),
            reveal_frames: self.reveal_frames,
            frame_delay: Duration::from_millis(self.frame_delay_ms),
            autoplay_rounds: self.autoplay_rounds,
            natural_return: Decimal::from_f64(self.natural_return),
            leaderboard_limit: self.leaderboard_limit,
            session_timeout: Duration::from_secs(self.session_timeout_secs),
        };

        Ok(ValidatedConfig {
            log_level,
            json_logs: self.json_logs,
            starting_balance: self.starting_balance,
            auto_provision: self.auto_provision,
            settings,
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
            seed: self.seed,
            machine,
        })
    }
}

#[cfg(test)]
mod tests;
