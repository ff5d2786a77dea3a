//! Bounded tick history and feature derivation.

mod aggregator;
mod ring_buffer;

pub use aggregator::{FeatureAggregator, RATIO_EPSILON};
pub use ring_buffer::RingBuffer;
