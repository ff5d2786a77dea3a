//! Signal sources: the narrow interfaces to externally trained models.
//!
//! Models are built once at startup and shared by `Arc` with the policies
//! that query them; nothing here holds global state.

mod artifact;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::features::RingBuffer;
use crate::models::{FeatureRow, FeatureVector};
use crate::trading::TradingConfig;

use artifact::{load_logistic, load_policy};

/// Probability of an upward move given a flattened window of feature rows.
pub trait ProbabilityModel: Send + Sync {
    /// Feature rows the model consumes.
    fn window(&self) -> usize;

    /// Up-probability in [0, 1].
    fn probability(&self, window: &[f64]) -> f64;
}

/// Discrete-action policy over a flattened window of feature rows.
pub trait ActionPolicy: Send + Sync {
    /// Feature rows the policy consumes.
    fn window(&self) -> usize;

    /// Raw action index. Callers decode it with a fail-safe default.
    fn predict(&self, state: &[f64]) -> i64;
}

/// Up-probability returned until the alpha buffer is full.
pub const NEUTRAL_PROBABILITY: f64 = 0.5;

/// Buffers feature rows for a probability model and queries it once enough
/// history has accumulated.
pub struct AlphaSignal {
    model: Arc<dyn ProbabilityModel>,
    buffer: RingBuffer<FeatureRow>,
}

impl AlphaSignal {
    pub fn new(model: Arc<dyn ProbabilityModel>) -> Self {
        let buffer = RingBuffer::new(model.window());
        Self { model, buffer }
    }

    /// Record `features` and return the current up-probability.
    pub fn predict(&mut self, features: &FeatureVector) -> f64 {
        self.buffer.push(features.to_row());
        if !self.buffer.is_full() {
            return NEUTRAL_PROBABILITY;
        }
        self.model.probability(&self.buffer.flatten()).clamp(0.0, 1.0)
    }
}

/// Models loaded for one run.
#[derive(Clone)]
pub struct SignalModels {
    pub alpha: Arc<dyn ProbabilityModel>,
    pub entry_policy: Option<Arc<dyn ActionPolicy>>,
    pub position_policy: Option<Arc<dyn ActionPolicy>>,
}

impl SignalModels {
    /// Load the artifacts the configuration asks for.
    pub fn load(config: &TradingConfig) -> Result<Self> {
        let alpha = load_logistic(&config.alpha_model_path)?;
        info!(path = %config.alpha_model_path, window = alpha.window, "Loaded alpha model");

        let entry_policy = if config.use_rl {
            let policy = load_policy(&config.rl_model_path, config.rl_window_size)?;
            info!(path = %config.rl_model_path, "Loaded entry policy");
            Some(Arc::new(policy) as Arc<dyn ActionPolicy>)
        } else {
            None
        };

        let position_policy = if config.use_position_rl {
            let policy =
                load_policy(&config.position_rl_model_path, config.position_rl_window_size)?;
            info!(path = %config.position_rl_model_path, "Loaded position policy");
            Some(Arc::new(policy) as Arc<dyn ActionPolicy>)
        } else {
            None
        };

        Ok(Self {
            alpha: Arc::new(alpha),
            entry_policy,
            position_policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedModel {
        window: usize,
        p: f64,
    }

    impl ProbabilityModel for FixedModel {
        fn window(&self) -> usize {
            self.window
        }

        fn probability(&self, window: &[f64]) -> f64 {
            assert_eq!(window.len(), self.window * 4);
            self.p
        }
    }

    #[test]
    fn test_neutral_until_buffer_full() {
        let mut alpha = AlphaSignal::new(Arc::new(FixedModel { window: 3, p: 0.9 }));
        let fv = FeatureVector::default();

        assert_eq!(alpha.predict(&fv), NEUTRAL_PROBABILITY);
        assert_eq!(alpha.predict(&fv), NEUTRAL_PROBABILITY);
        assert_eq!(alpha.predict(&fv), 0.9);
        assert_eq!(alpha.predict(&fv), 0.9);
    }

    #[test]
    fn test_probability_is_clamped() {
        let mut alpha = AlphaSignal::new(Arc::new(FixedModel { window: 1, p: 1.7 }));
        assert_eq!(alpha.predict(&FeatureVector::default()), 1.0);
    }
}
