//! Tick model: one top-of-book quote plus last-trade snapshot.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a tick cannot be processed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TickError {
    #[error("tick timestamp is not finite: {0}")]
    NonFiniteTimestamp(f64),

    #[error("tick field {field} is not a finite price: {value}")]
    NonFinitePrice { field: &'static str, value: f64 },

    #[error("tick field {field} is negative: {value}")]
    NegativePrice { field: &'static str, value: f64 },
}

/// Immutable market observation produced by a feed.
///
/// Every field is required when deserializing; a record missing any of them
/// is rejected rather than defaulted, since price and timestamp drive all
/// downstream math.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Seconds, monotonic within a feed
    pub timestamp: f64,

    /// Best bid price
    pub best_bid: f64,

    /// Best ask price
    pub best_ask: f64,

    /// Size resting at the best bid
    pub bid_size: u64,

    /// Size resting at the best ask
    pub ask_size: u64,

    /// Last traded price
    pub last_price: f64,

    /// Last traded size
    pub last_size: u64,
}

impl Tick {
    /// Check that timestamp and prices are usable.
    pub fn validate(&self) -> Result<(), TickError> {
        if !self.timestamp.is_finite() {
            return Err(TickError::NonFiniteTimestamp(self.timestamp));
        }

        for (field, value) in [
            ("best_bid", self.best_bid),
            ("best_ask", self.best_ask),
            ("last_price", self.last_price),
        ] {
            if !value.is_finite() {
                return Err(TickError::NonFinitePrice { field, value });
            }
            if value < 0.0 {
                return Err(TickError::NegativePrice { field, value });
            }
        }

        Ok(())
    }

    /// Mid of the quoted bid and ask.
    pub fn mid_price(&self) -> f64 {
        (self.best_bid + self.best_ask) / 2.0
    }

    /// Quoted spread (ask minus bid).
    pub fn spread(&self) -> f64 {
        self.best_ask - self.best_bid
    }
}

/// Tick with a symmetric quarter-point quote around `price`.
#[cfg(test)]
pub fn make_tick(price: f64, timestamp: f64) -> Tick {
    Tick {
        timestamp,
        best_bid: price - 0.25,
        best_ask: price + 0.25,
        bid_size: 5,
        ask_size: 3,
        last_price: price,
        last_size: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_complete_tick() {
        let json = r#"{"timestamp":1.5,"best_bid":100.0,"best_ask":100.5,
            "bid_size":4,"ask_size":2,"last_price":100.25,"last_size":1}"#;
        let tick: Tick = serde_json::from_str(json).unwrap();

        assert_eq!(tick.timestamp, 1.5);
        assert_eq!(tick.mid_price(), 100.25);
        assert_eq!(tick.spread(), 0.5);
        assert!(tick.validate().is_ok());
    }

    #[test]
    fn test_missing_field_is_rejected() {
        // No last_price
        let json = r#"{"timestamp":1.5,"best_bid":100.0,"best_ask":100.5,
            "bid_size":4,"ask_size":2,"last_size":1}"#;
        let result: Result<Tick, _> = serde_json::from_str(json);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("last_price"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut tick = make_tick(100.0, 0.0);
        tick.timestamp = f64::NAN;
        assert!(matches!(tick.validate(), Err(TickError::NonFiniteTimestamp(_))));

        let mut tick = make_tick(100.0, 0.0);
        tick.last_price = f64::INFINITY;
        assert_eq!(
            tick.validate(),
            Err(TickError::NonFinitePrice {
                field: "last_price",
                value: f64::INFINITY
            })
        );

        let mut tick = make_tick(100.0, 0.0);
        tick.best_bid = -1.0;
        assert_eq!(
            tick.validate(),
            Err(TickError::NegativePrice {
                field: "best_bid",
                value: -1.0
            })
        );
    }

    #[test]
    fn test_crossed_quote_is_accepted() {
        let mut tick = make_tick(4450.0, 0.0);
        tick.best_bid = 4480.0;
        tick.best_ask = 4420.0;

        assert!(tick.validate().is_ok());
        assert_eq!(tick.spread(), -60.0);
    }
}
