//! Trading logic: configuration, entry decisions, position management, lifecycle engine.

mod config;
mod decision;
mod engine;
mod position_manager;

pub use config::{TradingConfig, ENV_PREFIX};
pub use decision::{decision_policy, DecisionPolicy};
pub use engine::LifecycleEngine;
pub use position_manager::PositionManager;
