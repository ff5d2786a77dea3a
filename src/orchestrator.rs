//! Tick loop: feed → features → decision → lifecycle engine.

use anyhow::{bail, Result};
use tracing::{debug, error, info, warn};

use crate::db::Journal;
use crate::feed::Feed;
use crate::features::FeatureAggregator;
use crate::metrics::{SessionStats, SessionSummary};
use crate::models::{LifecycleEvent, Tick};
use crate::signal::{AlphaSignal, SignalModels};
use crate::trading::{
    decision_policy, DecisionPolicy, LifecycleEngine, PositionManager, TradingConfig,
};

/// Drives one tick at a time through the pipeline. The engine is the only
/// component that mutates position state.
pub struct Orchestrator {
    aggregator: FeatureAggregator,
    alpha: AlphaSignal,
    decision: Box<dyn DecisionPolicy>,
    position_manager: PositionManager,
    engine: LifecycleEngine,
    stats: SessionStats,
    journal: Option<Journal>,
}

impl Orchestrator {
    pub fn new(config: &TradingConfig, models: SignalModels) -> Result<Self> {
        let decision = decision_policy(config, models.entry_policy.clone())?;

        let position_manager = if config.use_position_rl {
            let Some(policy) = models.position_policy.clone() else {
                bail!("use_position_rl is set but no position policy was loaded");
            };
            PositionManager::with_policy(policy)
        } else {
            PositionManager::disabled()
        };

        info!(
            feature_window = config.feature_window(),
            use_rl = config.use_rl,
            use_position_rl = config.use_position_rl,
            "Orchestrator initialized"
        );

        Ok(Self {
            aggregator: FeatureAggregator::from_config(config),
            alpha: AlphaSignal::new(models.alpha),
            decision,
            position_manager,
            engine: LifecycleEngine::new(config),
            stats: SessionStats::new(),
            journal: None,
        })
    }

    /// Journal every lifecycle event to `journal`.
    pub fn with_journal(mut self, journal: Journal) -> Self {
        info!(session_id = journal.session_id(), "Journaling lifecycle events");
        self.journal = Some(journal);
        self
    }

    #[cfg(test)]
    pub fn engine(&self) -> &LifecycleEngine {
        &self.engine
    }

    #[cfg(test)]
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Run the full pipeline for one tick.
    ///
    /// A tick failing validation is rejected and nothing downstream sees it.
    pub async fn process_tick(&mut self, tick: Tick) -> Result<Option<LifecycleEvent>> {
        if let Err(e) = tick.validate() {
            self.stats.record_rejected();
            return Err(e.into());
        }
        self.stats.record_tick();

        self.aggregator.update(tick);
        let Some(features) = self.aggregator.compute() else {
            return Ok(None);
        };
        debug!(
            mid_price = features.mid_price,
            spread = features.spread,
            bid_ask_ratio = features.bid_ask_ratio,
            recent_return = features.recent_return,
            "Features"
        );

        let externally_managed = self.position_manager.is_enabled()
            && !self.engine.position().is_flat()
            && self.engine.position().management_mode();

        let intent = if externally_managed {
            self.position_manager.decide(&features)
        } else {
            let signal = self.alpha.predict(&features);
            let intent = self.decision.decide(signal, &features);
            debug!(signal = signal, "Alpha signal");
            intent
        };
        debug!(action = %intent.action, confidence = ?intent.confidence, "Intent");

        let event = self.engine.apply(&intent, &tick);

        if let Some(event) = &event {
            self.stats.record_event(event);
            if let Some(journal) = &self.journal {
                if let Err(e) = journal.record_event(event, tick.timestamp).await {
                    warn!(error = %e, "Failed to journal lifecycle event");
                }
            }
        }

        Ok(event)
    }

    /// Consume `feed` until it is exhausted or Ctrl+C is pressed, then
    /// print and return the session summary.
    pub async fn run(&mut self, feed: Feed) -> Result<SessionSummary> {
        let (mut rx, handle) = feed.spawn();

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        info!("Starting tick loop (Ctrl+C to stop)");

        loop {
            let item = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
                item = rx.recv() => item,
            };

            let Some(item) = item else {
                info!("Feed exhausted");
                break;
            };

            match item {
                Ok(tick) => {
                    if let Err(e) = self.process_tick(tick).await {
                        error!(error = %e, "Rejected tick");
                    }
                }
                Err(e) => {
                    self.stats.record_rejected();
                    error!("Feed error: {:#}", e);
                }
            }
        }

        handle.abort();

        if let Some(side) = self.engine.position().side() {
            info!(
                side = %side,
                units = self.engine.position().abs_units(),
                "Stopping with an open position"
            );
        }

        let summary = self.stats.summary();
        println!("{}", summary);
        Ok(summary)
    }
}
