//! Pre-entry decisions: turn a signal into BUY/SELL/HOLD.

use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::debug;

use crate::features::RingBuffer;
use crate::models::{Action, FeatureRow, FeatureVector, Intent};
use crate::signal::ActionPolicy;

use super::TradingConfig;

/// Strategy that converts a signal into an entry intent while flat.
pub trait DecisionPolicy: Send {
    /// `signal` is the model's up-probability; policy-driven variants ignore it.
    fn decide(&mut self, signal: f64, features: &FeatureVector) -> Intent;
}

/// Buy above `up`, sell below `down`, otherwise hold.
#[derive(Debug, Clone)]
pub struct ThresholdDecision {
    up: f64,
    down: f64,
}

impl ThresholdDecision {
    pub fn new(up: f64, down: f64) -> Result<Self> {
        if down >= up {
            bail!("threshold down ({}) must be below threshold up ({})", down, up);
        }
        Ok(Self { up, down })
    }
}

impl DecisionPolicy for ThresholdDecision {
    fn decide(&mut self, signal: f64, _features: &FeatureVector) -> Intent {
        if signal > self.up {
            Intent::with_confidence(Action::Buy, signal)
        } else if signal < self.down {
            Intent::with_confidence(Action::Sell, 1.0 - signal)
        } else {
            Intent::with_confidence(Action::Hold, signal)
        }
    }
}

/// Feature history feeding a discrete-action policy.
///
/// Yields no action until the policy's window of vectors has been observed.
pub struct PolicyWindow {
    policy: Arc<dyn ActionPolicy>,
    buffer: RingBuffer<FeatureRow>,
}

impl PolicyWindow {
    pub fn new(policy: Arc<dyn ActionPolicy>) -> Self {
        let buffer = RingBuffer::new(policy.window());
        Self { policy, buffer }
    }

    /// Record `features` and, once the buffer is full, query the policy.
    pub fn observe(&mut self, features: &FeatureVector) -> Option<i64> {
        self.buffer.push(features.to_row());
        if !self.buffer.is_full() {
            debug!(
                buffered = self.buffer.len(),
                window = self.buffer.capacity(),
                "Policy window warming up"
            );
            return None;
        }
        Some(self.policy.predict(&self.buffer.flatten()))
    }
}

/// Entry decisions from an external discrete-action policy (0=SELL, 1=HOLD, 2=BUY).
pub struct PolicyDecision {
    window: PolicyWindow,
}

impl PolicyDecision {
    pub fn new(policy: Arc<dyn ActionPolicy>) -> Self {
        Self {
            window: PolicyWindow::new(policy),
        }
    }
}

impl DecisionPolicy for PolicyDecision {
    fn decide(&mut self, _signal: f64, features: &FeatureVector) -> Intent {
        match self.window.observe(features) {
            Some(index) => Intent::new(Action::from_entry_index(index), None),
            None => Intent::hold(),
        }
    }
}

/// Build the entry policy selected by `config.use_rl`.
pub fn decision_policy(
    config: &TradingConfig,
    entry_policy: Option<Arc<dyn ActionPolicy>>,
) -> Result<Box<dyn DecisionPolicy>> {
    if config.use_rl {
        let Some(policy) = entry_policy else {
            bail!("use_rl is set but no entry policy was loaded");
        };
        return Ok(Box::new(PolicyDecision::new(policy)));
    }
    Ok(Box::new(ThresholdDecision::new(
        config.alpha_threshold_up,
        config.alpha_threshold_down,
    )?))
}
