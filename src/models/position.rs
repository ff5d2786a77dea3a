//! Position model: the single long-lived record of held inventory.

use serde::{Deserialize, Serialize};

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Long => "LONG",
            Side::Short => "SHORT",
        }
    }

    /// +1 for long, -1 for short.
    pub fn sign(&self) -> i64 {
        match self {
            Side::Long => 1,
            Side::Short => -1,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry bookkeeping, present only while units != 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Entry {
    /// Size-weighted average fill price
    price: f64,
    /// Timestamp of the first unit, not the latest addition
    time: f64,
}

/// Snapshot of a position taken as it is closed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosedLot {
    pub side: Side,
    pub units: u32,
    pub entry_price: f64,
    pub entry_time: f64,
}

/// Signed inventory in whole units.
///
/// `units == 0` exactly when there is no entry price and no entry time; the
/// two are stored together so they cannot drift apart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    units: i64,
    entry: Option<Entry>,
    management_mode: bool,
}

impl Position {
    /// Flat position.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signed unit count: positive long, negative short, zero flat.
    pub fn units(&self) -> i64 {
        self.units
    }

    /// Unit count without sign.
    pub fn abs_units(&self) -> u32 {
        self.units.unsigned_abs() as u32
    }

    pub fn is_flat(&self) -> bool {
        self.units == 0
    }

    pub fn side(&self) -> Option<Side> {
        match self.units.signum() {
            1 => Some(Side::Long),
            -1 => Some(Side::Short),
            _ => None,
        }
    }

    pub fn entry_price(&self) -> Option<f64> {
        self.entry.map(|e| e.price)
    }

    pub fn entry_time(&self) -> Option<f64> {
        self.entry.map(|e| e.time)
    }

    /// True while open and driven by an external management policy.
    pub fn management_mode(&self) -> bool {
        self.management_mode
    }

    /// Open one unit from flat. Returns false if already open.
    pub fn open(&mut self, side: Side, price: f64, time: f64, management_mode: bool) -> bool {
        if !self.is_flat() {
            return false;
        }
        self.units = side.sign();
        self.entry = Some(Entry { price, time });
        self.management_mode = management_mode;
        true
    }

    /// Add one same-direction unit at `price`, re-averaging the entry price.
    /// Entry time is left untouched. Returns the new average, or `None` when flat.
    pub fn average_in(&mut self, price: f64) -> Option<f64> {
        let side = self.side()?;
        let entry = self.entry.as_mut()?;

        let held = self.units.unsigned_abs() as f64;
        entry.price = (entry.price * held + price) / (held + 1.0);
        self.units += side.sign();

        Some(entry.price)
    }

    /// Clear to flat, returning what was held.
    pub fn close(&mut self) -> Option<ClosedLot> {
        let side = self.side()?;
        let entry = self.entry.take()?;
        let units = self.abs_units();

        self.units = 0;
        self.management_mode = false;

        Some(ClosedLot {
            side,
            units,
            entry_price: entry.price,
            entry_time: entry.time,
        })
    }
}
