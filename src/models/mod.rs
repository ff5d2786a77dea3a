//! Data models for ticks, features, intents, positions, and lifecycle events.

mod event;
mod features;
mod intent;
mod position;
mod tick;

pub use event::{ClosedTrade, ExitReason, LifecycleEvent, Origin};
pub use features::{FeatureRow, FeatureVector, FEATURE_NAMES};
pub use intent::{Action, Intent};
pub use position::{Position, Side};
pub use tick::Tick;

#[cfg(test)]
pub use tick::make_tick;
