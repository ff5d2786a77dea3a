//! Trading configuration.

use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Prefix of environment variables that override configuration fields.
pub const ENV_PREFIX: &str = "HORIZON_";

/// Largest history any window may hold, in ticks or feature vectors.
pub const MAX_WINDOW: usize = 1_000_000;

/// Configuration for signal thresholds, position lifecycle and model wiring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    /// Prediction horizon in seconds; bounds averaging and forces time exits
    pub prediction_horizon: f64,

    /// Up-probability above which the threshold policy buys
    pub alpha_threshold_up: f64,

    /// Up-probability below which the threshold policy sells
    pub alpha_threshold_down: f64,

    /// Price points above (long) or below (short) entry that close for profit
    pub profit_target: f64,

    /// Adverse move in price points. Not consulted by the rule-based exits.
    pub stop_loss: f64,

    /// Seconds between feed ticks
    pub data_feed_interval: f64,

    /// Maximum units held in one direction
    pub max_positions: u32,

    /// Alpha model artifact (JSON)
    pub alpha_model_path: String,

    /// Use the policy-driven entry decision instead of thresholds
    pub use_rl: bool,

    /// Feature vectors buffered for the entry policy state
    pub rl_window_size: usize,

    /// Entry policy artifact (JSON)
    pub rl_model_path: String,

    /// Hand open positions to the external management policy
    pub use_position_rl: bool,

    /// Feature vectors buffered for the management policy state
    pub position_rl_window_size: usize,

    /// Management policy artifact (JSON)
    pub position_rl_model_path: String,

    /// Per-unit transaction cost used by the training environment
    pub rl_fee: f64,

    /// Position-squared penalty used by the training environment
    pub rl_risk_lambda: f64,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            prediction_horizon: 20.0,
            alpha_threshold_up: 0.6,
            alpha_threshold_down: 0.4,
            profit_target: 0.5,
            stop_loss: 0.25,
            data_feed_interval: 1.0,
            max_positions: 2, // Allow averaging into a second unit
            alpha_model_path: "models/alpha_model.json".to_string(),
            use_rl: false,
            rl_window_size: 50,
            rl_model_path: "models/entry_policy.json".to_string(),
            use_position_rl: false,
            position_rl_window_size: 50,
            position_rl_model_path: "models/position_policy.json".to_string(),
            rl_fee: 0.0001,
            rl_risk_lambda: 0.0,
        }
    }
}

impl TradingConfig {
    /// Load a JSON config file. Missing fields keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Override fields from `HORIZON_*` environment variables.
    pub fn apply_env(&mut self) -> Result<()> {
        env_override("PREDICTION_HORIZON", &mut self.prediction_horizon)?;
        env_override("ALPHA_THRESHOLD_UP", &mut self.alpha_threshold_up)?;
        env_override("ALPHA_THRESHOLD_DOWN", &mut self.alpha_threshold_down)?;
        env_override("PROFIT_TARGET", &mut self.profit_target)?;
        env_override("STOP_LOSS", &mut self.stop_loss)?;
        env_override("DATA_FEED_INTERVAL", &mut self.data_feed_interval)?;
        env_override("MAX_POSITIONS", &mut self.max_positions)?;
        env_override("ALPHA_MODEL_PATH", &mut self.alpha_model_path)?;
        env_override("USE_RL", &mut self.use_rl)?;
        env_override("RL_WINDOW_SIZE", &mut self.rl_window_size)?;
        env_override("RL_MODEL_PATH", &mut self.rl_model_path)?;
        env_override("USE_POSITION_RL", &mut self.use_position_rl)?;
        env_override("POSITION_RL_WINDOW_SIZE", &mut self.position_rl_window_size)?;
        env_override("POSITION_RL_MODEL_PATH", &mut self.position_rl_model_path)?;
        env_override("RL_FEE", &mut self.rl_fee)?;
        env_override("RL_RISK_LAMBDA", &mut self.rl_risk_lambda)?;
        Ok(())
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(self.prediction_horizon > 0.0) {
            bail!("prediction_horizon must be positive, got {}", self.prediction_horizon);
        }
        if !(self.data_feed_interval > 0.0) {
            bail!("data_feed_interval must be positive, got {}", self.data_feed_interval);
        }
        for (name, value) in [
            ("alpha_threshold_up", self.alpha_threshold_up),
            ("alpha_threshold_down", self.alpha_threshold_down),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("{} must be within [0, 1], got {}", name, value);
            }
        }
        if self.alpha_threshold_down >= self.alpha_threshold_up {
            bail!(
                "alpha_threshold_down ({}) must be below alpha_threshold_up ({})",
                self.alpha_threshold_down,
                self.alpha_threshold_up
            );
        }
        if !(self.profit_target >= 0.0) {
            bail!("profit_target must be non-negative, got {}", self.profit_target);
        }
        if self.max_positions == 0 {
            bail!("max_positions must be at least 1");
        }
        if self.rl_window_size == 0 || self.position_rl_window_size == 0 {
            bail!("policy window sizes must be at least 1");
        }
        for (name, size) in [
            ("feature window", self.feature_window()),
            ("rl_window_size", self.rl_window_size),
            ("position_rl_window_size", self.position_rl_window_size),
        ] {
            if size > MAX_WINDOW {
                bail!("{} of {} exceeds the limit of {}", name, size, MAX_WINDOW);
            }
        }
        Ok(())
    }

    /// Ticks of history kept for features: two prediction horizons' worth.
    pub fn feature_window(&self) -> usize {
        let per_horizon = (self.prediction_horizon / self.data_feed_interval).ceil();
        if per_horizon.is_finite() && per_horizon >= 1.0 {
            (per_horizon as usize).saturating_mul(2)
        } else {
            2
        }
    }
}

fn env_override<T>(name: &str, target: &mut T) -> Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let key = format!("{}{}", ENV_PREFIX, name);
    if let Ok(raw) = std::env::var(&key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {}={:?}: {}", key, raw, e))?;
    }
    Ok(())
}
