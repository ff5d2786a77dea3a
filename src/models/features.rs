//! Feature vector derived from recent tick history.

use serde::{Deserialize, Serialize};

/// Names of the features, in the fixed order used to flatten a vector into
/// model input.
pub const FEATURE_NAMES: [&str; 4] = ["mid_price", "spread", "bid_ask_ratio", "recent_return"];

/// Number of features per vector.
pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// One row of model input, ordered as [`FEATURE_NAMES`].
pub type FeatureRow = [f64; FEATURE_COUNT];

/// Signal inputs computed fresh on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    /// (best_bid + best_ask) / 2
    pub mid_price: f64,

    /// best_ask - best_bid
    pub spread: f64,

    /// bid_size / (ask_size + epsilon)
    pub bid_ask_ratio: f64,

    /// Relative change of last price across the history window
    pub recent_return: f64,
}

impl FeatureVector {
    /// Values in [`FEATURE_NAMES`] order.
    pub fn to_row(&self) -> FeatureRow {
        [self.mid_price, self.spread, self.bid_ask_ratio, self.recent_return]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_order_matches_names() {
        let fv = FeatureVector {
            mid_price: 1.0,
            spread: 2.0,
            bid_ask_ratio: 3.0,
            recent_return: 4.0,
        };

        assert_eq!(fv.to_row(), [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(FEATURE_NAMES[2], "bid_ask_ratio");
        assert_eq!(FEATURE_NAMES.len(), FEATURE_COUNT);
    }
}
