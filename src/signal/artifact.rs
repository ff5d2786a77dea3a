//! JSON model artifacts produced by offline training.

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::FEATURE_NAMES;

use super::{ActionPolicy, ProbabilityModel};

/// Shape problems in a loaded artifact.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("artifact features {found:?} do not match expected {expected:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("artifact window must be at least 1")]
    EmptyWindow,

    #[error("expected {expected} weights for window {window}, found {found}")]
    WeightCount {
        window: usize,
        expected: usize,
        found: usize,
    },

    #[error("artifact window {found} does not match configured window {expected}")]
    WindowMismatch { expected: usize, found: usize },
}

/// Logistic regression over a flattened window of feature rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub features: Vec<String>,
    pub window: usize,
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl LogisticModel {
    pub fn validate(&self) -> Result<(), ModelError> {
        check_features(&self.features)?;
        check_weights(self.window, self.weights.len())
    }
}

impl ProbabilityModel for LogisticModel {
    fn window(&self) -> usize {
        self.window
    }

    fn probability(&self, window: &[f64]) -> f64 {
        let z = dot(&self.weights, window) + self.bias;
        1.0 / (1.0 + (-z).exp())
    }
}

/// Three linear scorers; the action is the index of the highest score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearPolicy {
    pub features: Vec<String>,
    pub window: usize,
    pub weights: [Vec<f64>; 3],
    pub biases: [f64; 3],
}

impl LinearPolicy {
    pub fn validate(&self) -> Result<(), ModelError> {
        check_features(&self.features)?;
        for row in &self.weights {
            check_weights(self.window, row.len())?;
        }
        Ok(())
    }
}

impl ActionPolicy for LinearPolicy {
    fn window(&self) -> usize {
        self.window
    }

    fn predict(&self, state: &[f64]) -> i64 {
        let mut best = 1;
        let mut best_score = f64::NEG_INFINITY;
        for (idx, (row, bias)) in self.weights.iter().zip(self.biases).enumerate() {
            let score = dot(row, state) + bias;
            if score > best_score {
                best = idx as i64;
                best_score = score;
            }
        }
        best
    }
}

/// Load and validate a probability model artifact.
pub fn load_logistic(path: impl AsRef<Path>) -> Result<LogisticModel> {
    let model: LogisticModel = load_json(path.as_ref())?;
    model
        .validate()
        .with_context(|| format!("Invalid alpha model {}", path.as_ref().display()))?;
    Ok(model)
}

/// Load a policy artifact and check it against the configured window.
pub fn load_policy(path: impl AsRef<Path>, expected_window: usize) -> Result<LinearPolicy> {
    let path = path.as_ref();
    let policy: LinearPolicy = load_json(path)?;
    policy
        .validate()
        .with_context(|| format!("Invalid policy {}", path.display()))?;
    if policy.window != expected_window {
        return Err(ModelError::WindowMismatch {
            expected: expected_window,
            found: policy.window,
        })
        .with_context(|| format!("Invalid policy {}", path.display()));
    }
    Ok(policy)
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        anyhow::bail!(
            "Model artifact not found at {}. Train and export it before starting the loop.",
            path.display()
        );
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

fn check_features(found: &[String]) -> Result<(), ModelError> {
    if found.iter().map(String::as_str).ne(FEATURE_NAMES.iter().copied()) {
        return Err(ModelError::FeatureMismatch {
            expected: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            found: found.to_vec(),
        });
    }
    Ok(())
}

fn check_weights(window: usize, found: usize) -> Result<(), ModelError> {
    if window == 0 {
        return Err(ModelError::EmptyWindow);
    }
    let expected = window * FEATURE_NAMES.len();
    if found != expected {
        return Err(ModelError::WeightCount {
            window,
            expected,
            found,
        });
    }
    Ok(())
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
