//! Trade intents emitted by the decision layer.

use serde::{Deserialize, Serialize};

/// A decision, not yet applied to position state.
///
/// BUY/SELL/HOLD are produced before entry; HOLD/ADD/EXIT while a position is
/// managed by an external policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
    Add,
    Exit,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
            Action::Add => "ADD",
            Action::Exit => "EXIT",
        }
    }

    /// Decode an entry policy output: 0=SELL, 1=HOLD, 2=BUY.
    /// Anything else is treated as HOLD.
    pub fn from_entry_index(index: i64) -> Self {
        match index {
            0 => Action::Sell,
            2 => Action::Buy,
            _ => Action::Hold,
        }
    }

    /// Decode a position-management policy output: 0=EXIT, 1=HOLD, 2=ADD.
    /// Anything else is treated as HOLD.
    pub fn from_management_index(index: i64) -> Self {
        match index {
            0 => Action::Exit,
            2 => Action::Add,
            _ => Action::Hold,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action plus optional confidence in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub action: Action,
    pub confidence: Option<f64>,
}

impl Intent {
    pub fn new(action: Action, confidence: Option<f64>) -> Self {
        Self { action, confidence }
    }

    /// HOLD without confidence.
    pub fn hold() -> Self {
        Self::new(Action::Hold, None)
    }

    pub fn with_confidence(action: Action, confidence: f64) -> Self {
        Self::new(action, Some(confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_index_decoding() {
        assert_eq!(Action::from_entry_index(0), Action::Sell);
        assert_eq!(Action::from_entry_index(1), Action::Hold);
        assert_eq!(Action::from_entry_index(2), Action::Buy);
        assert_eq!(Action::from_entry_index(3), Action::Hold);
        assert_eq!(Action::from_entry_index(-1), Action::Hold);
    }

    #[test]
    fn test_management_index_decoding() {
        assert_eq!(Action::from_management_index(0), Action::Exit);
        assert_eq!(Action::from_management_index(1), Action::Hold);
        assert_eq!(Action::from_management_index(2), Action::Add);
        assert_eq!(Action::from_management_index(42), Action::Hold);
    }
}
