//! Position lifecycle engine: the only writer of position state.
//!
//! This module applies intents to the position under these rules:
//! - Entries open one unit from flat; opposite-direction intents never flip
//!   a position directly
//! - Same-direction intents average in while below `max_positions` and
//!   inside the horizon anchored at the first unit's entry time
//! - Rule exits run on HOLD only: time expiry first, then profit target
//! - Externally managed positions take HOLD/ADD/EXIT from the management policy

use tracing::{debug, info};

use crate::models::{
    Action, ClosedTrade, ExitReason, Intent, LifecycleEvent, Origin, Position, Side, Tick,
};

use super::TradingConfig;

/// Parameters the engine reads on every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub prediction_horizon: f64,
    pub profit_target: f64,
    pub stop_loss: f64,
    pub max_positions: u32,
    /// New positions are handed to the external management policy
    pub external_management: bool,
}

impl From<&TradingConfig> for EngineConfig {
    fn from(config: &TradingConfig) -> Self {
        Self {
            prediction_horizon: config.prediction_horizon,
            profit_target: config.profit_target,
            stop_loss: config.stop_loss,
            max_positions: config.max_positions,
            external_management: config.use_position_rl,
        }
    }
}

/// Owns the authoritative [`Position`] and mutates it one intent at a time.
#[derive(Debug, Clone)]
pub struct LifecycleEngine {
    config: EngineConfig,
    position: Position,
}

impl LifecycleEngine {
    /// Engine starting flat.
    pub fn new(config: impl Into<EngineConfig>) -> Self {
        Self {
            config: config.into(),
            position: Position::new(),
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Apply `intent` at `tick`, returning the resulting event if state changed.
    pub fn apply(&mut self, intent: &Intent, tick: &Tick) -> Option<LifecycleEvent> {
        let event = if self.config.external_management && self.position.management_mode() {
            self.apply_external(intent.action, tick)
        } else {
            match intent.action {
                Action::Buy => self.enter_or_add(Side::Long, tick),
                Action::Sell => self.enter_or_add(Side::Short, tick),
                Action::Hold => self.check_rule_exits(tick),
                Action::Add | Action::Exit => None,
            }
        };

        if let Some(event) = &event {
            info!(
                kind = event.kind(),
                side = %event.side(),
                units = event.units(),
                price = event.price(),
                "{}",
                event
            );
        }
        event
    }

    fn enter_or_add(&mut self, side: Side, tick: &Tick) -> Option<LifecycleEvent> {
        match self.position.side() {
            None => {
                self.position.open(
                    side,
                    tick.last_price,
                    tick.timestamp,
                    self.config.external_management,
                );
                Some(LifecycleEvent::Entered {
                    side,
                    price: tick.last_price,
                    time: tick.timestamp,
                })
            }
            Some(held) if held == side => self.try_average(tick, Origin::Rules),
            Some(held) => {
                debug!(held = %held, requested = %side, "Ignoring opposite-direction entry");
                None
            }
        }
    }

    /// Add a unit if below the cap and inside the original horizon.
    fn try_average(&mut self, tick: &Tick, origin: Origin) -> Option<LifecycleEvent> {
        let side = self.position.side()?;
        let entry_time = self.position.entry_time()?;

        if self.position.abs_units() >= self.config.max_positions {
            debug!(units = self.position.abs_units(), "At max positions, not adding");
            return None;
        }
        if tick.timestamp >= entry_time + self.config.prediction_horizon {
            debug!(
                entry_time = entry_time,
                now = tick.timestamp,
                "Averaging window closed, not adding"
            );
            return None;
        }

        let avg_price = self.position.average_in(tick.last_price)?;
        Some(LifecycleEvent::Added {
            side,
            units: self.position.abs_units(),
            price: tick.last_price,
            avg_price,
            origin,
        })
    }

    /// Time expiry takes precedence over the profit target.
    fn check_rule_exits(&mut self, tick: &Tick) -> Option<LifecycleEvent> {
        let side = self.position.side()?;
        let entry_price = self.position.entry_price()?;
        let entry_time = self.position.entry_time()?;

        if tick.timestamp >= entry_time + self.config.prediction_horizon {
            return self.close(ExitReason::Time, tick);
        }

        let target_hit = match side {
            Side::Long => tick.last_price >= entry_price + self.config.profit_target,
            Side::Short => tick.last_price <= entry_price - self.config.profit_target,
        };
        if target_hit {
            return self.close(ExitReason::Profit, tick);
        }

        // stop_loss is reported but never closes the position here; adverse
        // moves are bounded only by the time exit.
        let adverse = match side {
            Side::Long => entry_price - tick.last_price,
            Side::Short => tick.last_price - entry_price,
        };
        if adverse >= self.config.stop_loss {
            debug!(
                side = %side,
                entry_price = entry_price,
                price = tick.last_price,
                stop_loss = self.config.stop_loss,
                "Adverse move beyond stop_loss; holding until time exit"
            );
        }
        None
    }

    fn apply_external(&mut self, action: Action, tick: &Tick) -> Option<LifecycleEvent> {
        match action {
            Action::Exit => self.close(ExitReason::External, tick),
            Action::Add => self.try_average(tick, Origin::External),
            _ => None,
        }
    }

    fn close(&mut self, reason: ExitReason, tick: &Tick) -> Option<LifecycleEvent> {
        let lot = self.position.close()?;
        Some(LifecycleEvent::Exited(ClosedTrade {
            side: lot.side,
            units: lot.units,
            entry_price: lot.entry_price,
            exit_price: tick.last_price,
            entry_time: lot.entry_time,
            exit_time: tick.timestamp,
            reason,
        }))
    }
}
