//! Discrete-action trading environment over a recorded tick series.
//!
//! Actions: 0 = SELL one unit, 1 = HOLD, 2 = BUY one unit. Any other index
//! holds. Trades fill at the mid of the current tick; the agent observes
//! only the ticks before it.
//!
//! Reward per step: change in portfolio value, minus `fee * |Δposition|`,
//! minus `risk_lambda * position²`.

use statrs::statistics::Statistics;
use thiserror::Error;

use crate::features::RATIO_EPSILON;
use crate::models::Tick;

/// Values per tick in the observation window.
const TICK_FEATURES: usize = 3;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvError {
    #[error("episode is done; call reset() before stepping again")]
    EpisodeDone,

    #[error("need at least {needed} ticks for window {window}, got {got}")]
    InsufficientData {
        window: usize,
        needed: usize,
        got: usize,
    },
}

/// Result of one environment step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub observation: Vec<f32>,
    pub reward: f64,
    pub done: bool,
}

/// Reward statistics for one complete episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeReport {
    pub steps: usize,
    pub total_reward: f64,
    pub mean_reward: f64,
    pub reward_std_dev: f64,
    pub final_position: i64,
}

pub struct TradingEnv {
    ticks: Vec<Tick>,
    window_size: usize,
    fee: f64,
    risk_lambda: f64,
    /// Mid price used to scale cash and P&L in observations
    scale: f64,

    current_step: usize,
    position: i64,
    cash: f64,
    cost_basis: f64,
    done: bool,
}

impl TradingEnv {
    pub fn new(
        ticks: Vec<Tick>,
        window_size: usize,
        fee: f64,
        risk_lambda: f64,
    ) -> Result<Self, EnvError> {
        let window_size = window_size.max(1);
        let needed = window_size + 1;
        if ticks.len() < needed {
            return Err(EnvError::InsufficientData {
                window: window_size,
                needed,
                got: ticks.len(),
            });
        }

        let first_mid = ticks[0].mid_price();
        let scale = if first_mid.is_finite() && first_mid != 0.0 {
            first_mid.abs()
        } else {
            1.0
        };

        Ok(Self {
            ticks,
            window_size,
            fee,
            risk_lambda,
            scale,
            current_step: window_size,
            position: 0,
            cash: 0.0,
            cost_basis: 0.0,
            done: false,
        })
    }

    fn observation_len(&self) -> usize {
        self.window_size * TICK_FEATURES + 3
    }

    #[cfg(test)]
    pub fn position(&self) -> i64 {
        self.position
    }

    #[cfg(test)]
    pub fn cash(&self) -> f64 {
        self.cash
    }

    #[cfg(test)]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Start a new episode and return its first observation.
    pub fn reset(&mut self) -> Vec<f32> {
        self.current_step = self.window_size;
        self.position = 0;
        self.cash = 0.0;
        self.cost_basis = 0.0;
        self.done = false;
        self.observation()
    }

    pub fn step(&mut self, action: i64) -> Result<StepOutcome, EnvError> {
        if self.done {
            return Err(EnvError::EpisodeDone);
        }

        let delta: i64 = match action {
            0 => -1,
            2 => 1,
            _ => 0,
        };

        let price = self.ticks[self.current_step].mid_price();
        let prev_price = self.ticks[self.current_step - 1].mid_price();

        // Mark the held position to the new price, then trade
        let mark_to_market = self.position as f64 * (price - prev_price);
        self.trade(delta, price);

        let reward = mark_to_market
            - self.fee * delta.abs() as f64
            - self.risk_lambda * (self.position * self.position) as f64;

        self.current_step += 1;
        if self.current_step >= self.ticks.len() {
            self.done = true;
        }

        Ok(StepOutcome {
            observation: self.observation(),
            reward,
            done: self.done,
        })
    }

    /// Reset, then step with `policy` until the episode ends.
    pub fn run_episode<F>(&mut self, mut policy: F) -> Result<EpisodeReport, EnvError>
    where
        F: FnMut(&[f32]) -> i64,
    {
        let mut observation = self.reset();
        let mut rewards = Vec::with_capacity(self.ticks.len() - self.window_size);

        loop {
            let outcome = self.step(policy(&observation))?;
            rewards.push(outcome.reward);
            observation = outcome.observation;
            if outcome.done {
                break;
            }
        }

        let reward_std_dev = if rewards.len() > 1 {
            rewards.iter().std_dev()
        } else {
            0.0
        };

        Ok(EpisodeReport {
            steps: rewards.len(),
            total_reward: rewards.iter().sum(),
            mean_reward: rewards.iter().mean(),
            reward_std_dev,
            final_position: self.position,
        })
    }

    fn trade(&mut self, delta: i64, price: f64) {
        if delta == 0 {
            return;
        }

        let old = self.position;
        let new = old + delta;
        self.cash -= delta as f64 * price;

        if new == 0 {
            self.cost_basis = 0.0;
        } else if old == 0 || old.signum() == delta.signum() {
            self.cost_basis += delta as f64 * price;
        } else {
            // Reducing: keep the average entry of what remains
            self.cost_basis = self.cost_basis / old as f64 * new as f64;
        }
        self.position = new;
    }

    fn observation(&self) -> Vec<f32> {
        let mut obs = Vec::with_capacity(self.observation_len());
        let start = self.current_step - self.window_size;

        for i in start..self.current_step {
            let tick = &self.ticks[i];
            let mid = tick.mid_price();

            let ret = if i > 0 {
                let prev = self.ticks[i - 1].mid_price();
                if prev != 0.0 {
                    (mid - prev) / prev
                } else {
                    0.0
                }
            } else {
                0.0
            };
            let spread = if mid != 0.0 { tick.spread() / mid } else { 0.0 };
            let log_ratio = ((tick.bid_size as f64 + RATIO_EPSILON)
                / (tick.ask_size as f64 + RATIO_EPSILON))
                .ln();

            obs.push(ret as f32);
            obs.push(spread as f32);
            obs.push(log_ratio as f32);
        }

        let mark = self.ticks[self.current_step - 1].mid_price();
        let unrealized = self.position as f64 * mark - self.cost_basis;

        obs.push(self.position as f32);
        obs.push((self.cash / self.scale) as f32);
        obs.push((unrealized / self.scale) as f32);
        obs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bids 0, 1, 2, ... with asks one above and unit sizes.
    fn ladder(n: usize) -> Vec<Tick> {
        (0..n)
            .map(|i| Tick {
                timestamp: i as f64,
                best_bid: i as f64,
                best_ask: i as f64 + 1.0,
                bid_size: 1,
                ask_size: 1,
                last_price: i as f64,
                last_size: 1,
            })
            .collect()
    }

    #[test]
    fn test_reset_and_single_step_episode() {
        let mut env = TradingEnv::new(ladder(3), 2, 0.0, 0.0).unwrap();
        let obs = env.reset();
        assert_eq!(obs.len(), 2 * 3 + 3);

        let outcome = env.step(1).unwrap();
        assert_eq!(outcome.observation.len(), 9);
        assert_eq!(outcome.reward, 0.0);
        assert!(outcome.done);

        assert_eq!(env.step(1), Err(EnvError::EpisodeDone));

        env.reset();
        assert!(!env.is_done());
        assert!(env.step(1).is_ok());
    }

    #[test]
    fn test_buy_then_sell() {
        let mut env = TradingEnv::new(ladder(4), 2, 0.0, 0.0).unwrap();
        env.reset();

        let outcome = env.step(2).unwrap();
        assert_eq!(env.position(), 1);
        assert_eq!(outcome.reward, 0.0);
        assert!(!outcome.done);
        assert_eq!(env.cash(), -2.5);

        // Held unit marked from 2.5 to 3.5, then sold
        let outcome = env.step(0).unwrap();
        assert_eq!(env.position(), 0);
        assert!((outcome.reward - 1.0).abs() < 1e-12);
        assert!((env.cash() - 1.0).abs() < 1e-12);
        assert!(outcome.done);
    }

    #[test]
    fn test_fee_and_risk_penalty() {
        let mut env = TradingEnv::new(ladder(5), 2, 0.5, 0.1).unwrap();
        env.reset();

        let outcome = env.step(2).unwrap();
        assert!((outcome.reward - (-0.5 - 0.1)).abs() < 1e-12);

        // Hold one unit through a +1 move: 1 - 0.1
        let outcome = env.step(1).unwrap();
        assert!((outcome.reward - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_action_holds() {
        let mut env = TradingEnv::new(ladder(4), 2, 0.0, 0.0).unwrap();
        env.reset();
        env.step(7).unwrap();
        env.step(-1).unwrap();
        assert_eq!(env.position(), 0);
    }

    #[test]
    fn test_observation_layout() {
        let mut env = TradingEnv::new(ladder(4), 2, 0.0, 0.0).unwrap();
        env.reset();
        let obs = env.step(2).unwrap().observation;

        // Window covers ticks 1 and 2 (mids 1.5 and 2.5)
        assert!((obs[0] - 2.0).abs() < 1e-6);
        assert!((obs[1] - 1.0 / 1.5).abs() < 1e-6);
        assert_eq!(obs[2], 0.0);
        assert!((obs[3] - 1.0 / 1.5).abs() < 1e-6);
        assert!((obs[4] - 1.0 / 2.5).abs() < 1e-6);

        assert_eq!(obs[6], 1.0);
        // Cash of -2.5 scaled by the first mid of 0.5
        assert!((obs[7] + 5.0).abs() < 1e-6);
        assert_eq!(obs[8], 0.0);
    }

    #[test]
    fn test_run_episode_report() {
        let mut env = TradingEnv::new(ladder(5), 2, 0.0, 0.0).unwrap();

        // Buy on the first step, hold afterwards: rewards 0, 1, 1
        let mut first = true;
        let report = env
            .run_episode(|obs| {
                assert_eq!(obs.len(), 9);
                if std::mem::take(&mut first) {
                    2
                } else {
                    1
                }
            })
            .unwrap();

        assert_eq!(report.steps, 3);
        assert!((report.total_reward - 2.0).abs() < 1e-12);
        assert!((report.mean_reward - 2.0 / 3.0).abs() < 1e-12);
        // Sample std dev of [0, 1, 1]
        assert!((report.reward_std_dev - (1.0_f64 / 3.0).sqrt()).abs() < 1e-9);
        assert_eq!(report.final_position, 1);
        assert!(env.is_done());
    }

    #[test]
    fn test_insufficient_data() {
        let err = TradingEnv::new(ladder(2), 2, 0.0, 0.0).err().unwrap();
        assert_eq!(
            err,
            EnvError::InsufficientData {
                window: 2,
                needed: 3,
                got: 2
            }
        );
    }
}
