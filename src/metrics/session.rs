//! Running statistics for one trading session: tick counts, entries, adds,
//! and realized P&L over closed round trips.

use std::collections::BTreeMap;

use crate::models::{ClosedTrade, LifecycleEvent};

/// Accumulates what the orchestrator observes.
///
/// Closed trades are folded into running totals as they arrive, so memory
/// stays constant however long the loop runs.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    ticks_processed: u64,
    ticks_rejected: u64,
    entries: u64,
    adds: u64,
    trades: TradeTotals,
}

/// Running aggregates over closed trades. Mean and variance use Welford's
/// update.
#[derive(Debug, Clone, Default)]
struct TradeTotals {
    count: usize,
    winners: usize,
    pnl_sum: f64,
    pnl_mean: f64,
    pnl_m2: f64,
    holding_secs_sum: f64,
    by_reason: BTreeMap<&'static str, usize>,
}

impl TradeTotals {
    fn record(&mut self, trade: &ClosedTrade) {
        let pnl = trade.pnl();

        self.count += 1;
        if pnl > 0.0 {
            self.winners += 1;
        }
        self.pnl_sum += pnl;
        self.holding_secs_sum += trade.holding_secs();
        *self.by_reason.entry(trade.reason.as_str()).or_insert(0) += 1;

        let delta = pnl - self.pnl_mean;
        self.pnl_mean += delta / self.count as f64;
        self.pnl_m2 += delta * (pnl - self.pnl_mean);
    }

    /// Sample standard deviation of trade P&L.
    fn pnl_std_dev(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        (self.pnl_m2 / (self.count - 1) as f64).sqrt()
    }
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tick(&mut self) {
        self.ticks_processed += 1;
    }

    pub fn record_rejected(&mut self) {
        self.ticks_rejected += 1;
    }

    pub fn record_event(&mut self, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::Entered { .. } => self.entries += 1,
            LifecycleEvent::Added { .. } => self.adds += 1,
            LifecycleEvent::Exited(trade) => self.trades.record(trade),
        }
    }

    /// Summarize everything recorded so far.
    pub fn summary(&self) -> SessionSummary {
        let trades = &self.trades;
        let per_trade = |total: f64| {
            if trades.count > 0 {
                total / trades.count as f64
            } else {
                0.0
            }
        };

        SessionSummary {
            ticks_processed: self.ticks_processed,
            ticks_rejected: self.ticks_rejected,
            entries: self.entries,
            adds: self.adds,
            closed_trades: trades.count,
            win_rate: per_trade(trades.winners as f64),
            realized_pnl: trades.pnl_sum,
            mean_pnl: trades.pnl_mean,
            pnl_std_dev: trades.pnl_std_dev(),
            avg_holding_secs: per_trade(trades.holding_secs_sum),
            exits_by_reason: trades.by_reason.clone(),
        }
    }
}

/// Point-in-time session statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub ticks_processed: u64,
    pub ticks_rejected: u64,
    pub entries: u64,
    pub adds: u64,
    pub closed_trades: usize,
    pub win_rate: f64,
    pub realized_pnl: f64,
    pub mean_pnl: f64,
    pub pnl_std_dev: f64,
    pub avg_holding_secs: f64,
    pub exits_by_reason: BTreeMap<&'static str, usize>,
}

impl std::fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n{:=^50}", " SESSION ")?;
        writeln!(f, "Ticks Processed:  {}", self.ticks_processed)?;
        writeln!(f, "Ticks Rejected:   {}", self.ticks_rejected)?;
        writeln!(f)?;
        writeln!(f, "Entries:          {}", self.entries)?;
        writeln!(f, "Adds:             {}", self.adds)?;
        writeln!(f, "Closed Trades:    {}", self.closed_trades)?;
        writeln!(f, "Win Rate:         {:.1}%", self.win_rate * 100.0)?;
        writeln!(f)?;
        writeln!(f, "Realized P&L:     {:.2}", self.realized_pnl)?;
        writeln!(f, "Mean P&L:         {:.2}", self.mean_pnl)?;
        writeln!(f, "P&L Std Dev:      {:.2}", self.pnl_std_dev)?;
        writeln!(f, "Avg Hold:         {:.1}s", self.avg_holding_secs)?;
        if !self.exits_by_reason.is_empty() {
            writeln!(f)?;
            for (reason, count) in &self.exits_by_reason {
                writeln!(f, "Exits ({:<8})  {}", reason, count)?;
            }
        }
        writeln!(f, "{:=^50}", "")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExitReason, Origin, Side};

    fn exit(side: Side, entry: f64, exit: f64, reason: ExitReason) -> LifecycleEvent {
        LifecycleEvent::Exited(ClosedTrade {
            side,
            units: 1,
            entry_price: entry,
            exit_price: exit,
            entry_time: 0.0,
            exit_time: 4.0,
            reason,
        })
    }

    #[test]
    fn test_empty_summary() {
        let summary = SessionStats::new().summary();
        assert_eq!(summary.closed_trades, 0);
        assert_eq!(summary.win_rate, 0.0);
        assert_eq!(summary.mean_pnl, 0.0);
        assert_eq!(summary.pnl_std_dev, 0.0);
        assert!(summary.to_string().contains("SESSION"));
    }

    #[test]
    fn test_summary_over_trades() {
        let mut stats = SessionStats::new();
        stats.record_tick();
        stats.record_tick();
        stats.record_rejected();
        stats.record_event(&LifecycleEvent::Entered {
            side: Side::Long,
            price: 100.0,
            time: 0.0,
        });
        stats.record_event(&LifecycleEvent::Added {
            side: Side::Long,
            units: 2,
            price: 102.0,
            avg_price: 101.0,
            origin: Origin::Rules,
        });
        stats.record_event(&exit(Side::Long, 100.0, 102.0, ExitReason::Profit));
        stats.record_event(&exit(Side::Short, 200.0, 204.0, ExitReason::Time));
        stats.record_event(&exit(Side::Short, 200.0, 198.0, ExitReason::Time));

        let summary = stats.summary();
        assert_eq!(summary.ticks_processed, 2);
        assert_eq!(summary.ticks_rejected, 1);
        assert_eq!(summary.entries, 1);
        assert_eq!(summary.adds, 1);
        assert_eq!(summary.closed_trades, 3);
        assert!((summary.win_rate - 2.0 / 3.0).abs() < 1e-12);
        // 2 - 4 + 2
        assert_eq!(summary.realized_pnl, 0.0);
        assert!(summary.mean_pnl.abs() < 1e-12);
        // Sample std dev of [2, -4, 2]
        assert!((summary.pnl_std_dev - 12.0_f64.sqrt()).abs() < 1e-9);
        assert_eq!(summary.avg_holding_secs, 4.0);
        assert_eq!(summary.exits_by_reason.get("time"), Some(&2));
        assert_eq!(summary.exits_by_reason.get("profit"), Some(&1));
    }

    #[test]
    fn test_single_trade_has_no_spread() {
        let mut stats = SessionStats::new();
        stats.record_event(&exit(Side::Long, 100.0, 101.5, ExitReason::Profit));

        let summary = stats.summary();
        assert_eq!(summary.mean_pnl, 1.5);
        assert_eq!(summary.pnl_std_dev, 0.0);
        assert_eq!(summary.win_rate, 1.0);
    }
}
