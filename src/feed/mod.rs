//! Tick sources. A feed runs in its own task and pushes ticks over a channel;
//! the orchestrator is the only consumer.

mod replay;
mod simulated;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::models::Tick;

pub use replay::ReplayFeed;
pub use simulated::SimulatedFeed;

/// Channel depth between the feed task and the orchestrator.
pub const FEED_BUFFER: usize = 64;

/// The available tick sources.
pub enum Feed {
    Simulated(SimulatedFeed),
    Replay(ReplayFeed),
}

impl Feed {
    /// Next item from the source; `None` when exhausted.
    pub async fn next_tick(&mut self) -> Option<Result<Tick>> {
        match self {
            Feed::Simulated(feed) => Some(Ok(feed.next_tick().await)),
            Feed::Replay(feed) => feed.next_tick().await,
        }
    }

    /// Run the feed in a background task, sending every item to the
    /// returned receiver. The task ends when the source is exhausted or the
    /// receiver is dropped.
    pub fn spawn(mut self) -> (mpsc::Receiver<Result<Tick>>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(FEED_BUFFER);
        let handle = tokio::spawn(async move {
            while let Some(item) = self.next_tick().await {
                if tx.send(item).await.is_err() {
                    debug!("Feed receiver dropped");
                    break;
                }
            }
            debug!("Feed finished");
        });
        (rx, handle)
    }
}
