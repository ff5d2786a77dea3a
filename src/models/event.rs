//! Lifecycle events: the observable record of entries, adds and exits.

use serde::{Deserialize, Serialize};

use super::Side;

/// Which decision path produced an addition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Rules,
    External,
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Prediction horizon elapsed since the first unit
    Time,
    /// Profit target reached
    Profit,
    /// External management policy chose EXIT
    External,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::Time => "time",
            ExitReason::Profit => "profit",
            ExitReason::External => "external",
        }
    }

    /// Wording used in exit messages.
    pub fn phrase(&self) -> &'static str {
        match self {
            ExitReason::Time => "on time",
            ExitReason::Profit => "for profit",
            ExitReason::External => "via external decision",
        }
    }
}

/// A completed round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub side: Side,
    pub units: u32,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_time: f64,
    pub exit_time: f64,
    pub reason: ExitReason,
}

impl ClosedTrade {
    /// Realized P&L in price points across all units.
    pub fn pnl(&self) -> f64 {
        let per_unit = match self.side {
            Side::Long => self.exit_price - self.entry_price,
            Side::Short => self.entry_price - self.exit_price,
        };
        per_unit * self.units as f64
    }

    /// Seconds between first entry and exit.
    pub fn holding_secs(&self) -> f64 {
        self.exit_time - self.entry_time
    }
}

/// State change applied by the lifecycle engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Entered {
        side: Side,
        price: f64,
        time: f64,
    },
    Added {
        side: Side,
        units: u32,
        price: f64,
        avg_price: f64,
        origin: Origin,
    },
    Exited(ClosedTrade),
}

impl LifecycleEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleEvent::Entered { .. } => "entered",
            LifecycleEvent::Added { .. } => "added",
            LifecycleEvent::Exited(_) => "exited",
        }
    }

    pub fn side(&self) -> Side {
        match self {
            LifecycleEvent::Entered { side, .. } | LifecycleEvent::Added { side, .. } => *side,
            LifecycleEvent::Exited(trade) => trade.side,
        }
    }

    /// Units held after an entry or add, or units closed by an exit.
    pub fn units(&self) -> u32 {
        match self {
            LifecycleEvent::Entered { .. } => 1,
            LifecycleEvent::Added { units, .. } => *units,
            LifecycleEvent::Exited(trade) => trade.units,
        }
    }

    /// Fill price of the event.
    pub fn price(&self) -> f64 {
        match self {
            LifecycleEvent::Entered { price, .. } | LifecycleEvent::Added { price, .. } => *price,
            LifecycleEvent::Exited(trade) => trade.exit_price,
        }
    }
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleEvent::Entered { side, price, time } => {
                write!(f, "Entered {} unit at {:.2} (t={:.2})", side, price, time)
            }
            LifecycleEvent::Added {
                side,
                units,
                price,
                avg_price,
                origin,
            } => {
                write!(
                    f,
                    "Added {} unit at {:.2}, new avg entry price {:.2} ({} units)",
                    side, price, avg_price, units
                )?;
                if *origin == Origin::External {
                    f.write_str(" via external decision")?;
                }
                Ok(())
            }
            LifecycleEvent::Exited(trade) => write!(
                f,
                "Exited {} position of {} units {} at {:.2}",
                trade.side,
                trade.units,
                trade.reason.phrase(),
                trade.exit_price
            ),
        }
    }
}
