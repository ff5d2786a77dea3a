//! Simulated quote stream for running the loop without a market connection.

use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{interval, Interval, MissedTickBehavior};

use crate::models::Tick;

const PRICE_LOW: f64 = 4400.0;
const PRICE_HIGH: f64 = 4500.0;
const MAX_SIZE: u64 = 20;

/// Uniformly random ticks, one per feed interval, stamped with wall-clock time.
pub struct SimulatedFeed {
    interval: Interval,
    rng: StdRng,
}

impl SimulatedFeed {
    pub fn new(interval_secs: f64) -> Self {
        Self::with_rng(interval_secs, StdRng::from_entropy())
    }

    #[cfg(test)]
    pub fn seeded(interval_secs: f64, seed: u64) -> Self {
        Self::with_rng(interval_secs, StdRng::seed_from_u64(seed))
    }

    fn with_rng(interval_secs: f64, rng: StdRng) -> Self {
        let period = Duration::from_secs_f64(interval_secs.max(0.001));
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval, rng }
    }

    /// Wait for the next interval and produce a tick.
    pub async fn next_tick(&mut self) -> Tick {
        self.interval.tick().await;
        self.generate(Utc::now().timestamp_micros() as f64 / 1e6)
    }

    fn generate(&mut self, timestamp: f64) -> Tick {
        Tick {
            timestamp,
            best_bid: self.rng.gen_range(PRICE_LOW..PRICE_HIGH),
            best_ask: self.rng.gen_range(PRICE_LOW..PRICE_HIGH),
            bid_size: self.rng.gen_range(1..=MAX_SIZE),
            ask_size: self.rng.gen_range(1..=MAX_SIZE),
            last_price: self.rng.gen_range(PRICE_LOW..PRICE_HIGH),
            last_size: self.rng.gen_range(1..=MAX_SIZE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ticks_are_well_formed() {
        let mut feed = SimulatedFeed::seeded(0.001, 7);
        let mut last_ts = 0.0;

        for _ in 0..3 {
            let tick = feed.next_tick().await;
            assert!(tick.validate().is_ok());
            assert!((PRICE_LOW..PRICE_HIGH).contains(&tick.last_price));
            assert!((1..=MAX_SIZE).contains(&tick.bid_size));
            assert!((1..=MAX_SIZE).contains(&tick.ask_size));
            assert!(tick.timestamp >= last_ts);
            last_ts = tick.timestamp;
        }
    }

    #[test]
    fn test_seeded_is_reproducible() {
        tokio_test::block_on(async {
            let mut a = SimulatedFeed::seeded(1.0, 42);
            let mut b = SimulatedFeed::seeded(1.0, 42);
            assert_eq!(a.generate(1.0), b.generate(1.0));
        });
    }
}
