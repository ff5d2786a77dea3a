//! Session statistics over lifecycle events.

mod session;

pub use session::{SessionStats, SessionSummary};
