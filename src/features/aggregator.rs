//! Sliding-window feature computation over recent ticks.

use tracing::trace;

use crate::models::{FeatureVector, Tick};
use crate::trading::TradingConfig;

use super::RingBuffer;

/// Added to the ask size so the bid/ask ratio never divides by zero.
pub const RATIO_EPSILON: f64 = 1e-6;

/// Keeps a bounded history of ticks and derives a [`FeatureVector`] from it.
#[derive(Debug, Clone)]
pub struct FeatureAggregator {
    history: RingBuffer<Tick>,
}

impl FeatureAggregator {
    /// Aggregator retaining at most `window` ticks.
    pub fn new(window: usize) -> Self {
        Self {
            history: RingBuffer::new(window),
        }
    }

    /// Aggregator sized to two prediction horizons of feed ticks.
    pub fn from_config(config: &TradingConfig) -> Self {
        Self::new(config.feature_window())
    }

    /// Number of ticks the history can hold.
    pub fn window(&self) -> usize {
        self.history.capacity()
    }

    /// Ticks currently retained.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Append a tick, evicting the oldest if full.
    pub fn update(&mut self, tick: Tick) {
        if let Some(evicted) = self.history.push(tick) {
            trace!(evicted_at = evicted.timestamp, "Tick left feature window");
        }
    }

    /// Features for the current history, or `None` before the first tick.
    pub fn compute(&self) -> Option<FeatureVector> {
        let latest = self.history.latest()?;

        let recent_return = match self.history.oldest() {
            Some(oldest) if self.history.len() > 1 && oldest.last_price != 0.0 => {
                (latest.last_price - oldest.last_price) / oldest.last_price
            }
            _ => 0.0,
        };

        Some(FeatureVector {
            mid_price: latest.mid_price(),
            spread: latest.spread(),
            bid_ask_ratio: latest.bid_size as f64 / (latest.ask_size as f64 + RATIO_EPSILON),
            recent_return,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::make_tick;

    fn quote(bid: f64, ask: f64, bid_size: u64, ask_size: u64, last: f64) -> Tick {
        Tick {
            timestamp: 0.0,
            best_bid: bid,
            best_ask: ask,
            bid_size,
            ask_size,
            last_price: last,
            last_size: 1,
        }
    }

    #[test]
    fn test_empty_history() {
        let agg = FeatureAggregator::new(20);
        assert_eq!(agg.compute(), None);
    }

    #[test]
    fn test_single_tick() {
        let mut agg = FeatureAggregator::new(20);
        agg.update(quote(100.0, 102.0, 5, 3, 101.0));

        let f = agg.compute().unwrap();
        assert_eq!(f.mid_price, 101.0);
        assert_eq!(f.spread, 2.0);
        assert!((f.bid_ask_ratio - 5.0 / 3.0).abs() < 1e-6);
        assert_eq!(f.recent_return, 0.0);
    }

    #[test]
    fn test_recent_return_over_window() {
        let mut agg = FeatureAggregator::new(20);
        agg.update(quote(100.0, 102.0, 5, 3, 100.0));
        agg.update(quote(100.0, 102.0, 5, 3, 110.0));

        let f = agg.compute().unwrap();
        assert!((f.recent_return - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_zero_ask_size_is_finite() {
        let mut agg = FeatureAggregator::new(4);
        agg.update(quote(100.0, 100.5, 7, 0, 100.0));

        let f = agg.compute().unwrap();
        assert!(f.bid_ask_ratio.is_finite());
        assert!(f.to_row().iter().all(|v| v.is_finite()));
        assert!((f.bid_ask_ratio - 7.0 / RATIO_EPSILON).abs() < 1.0);
    }

    #[test]
    fn test_zero_oldest_price_gives_zero_return() {
        let mut agg = FeatureAggregator::new(4);
        agg.update(quote(0.0, 0.0, 1, 1, 0.0));
        agg.update(quote(100.0, 101.0, 1, 1, 100.5));

        assert_eq!(agg.compute().unwrap().recent_return, 0.0);
    }

    #[test]
    fn test_oldest_is_evicted() {
        let mut agg = FeatureAggregator::new(2);
        agg.update(make_tick(100.0, 0.0));
        agg.update(make_tick(50.0, 1.0));
        agg.update(make_tick(55.0, 2.0));

        assert_eq!(agg.len(), 2);
        let f = agg.compute().unwrap();
        assert!((f.recent_return - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_window_from_config() {
        let config = TradingConfig {
            prediction_horizon: 10.0,
            data_feed_interval: 3.0,
            ..TradingConfig::default()
        };
        // ceil(10 / 3) * 2
        assert_eq!(FeatureAggregator::from_config(&config).window(), 8);
    }
}
