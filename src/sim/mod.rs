//! Offline training environment for the discrete-action policies.

mod env;

pub use env::TradingEnv;
