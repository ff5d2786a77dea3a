//! SQLite journal of lifecycle events and closed trades.
//!
//! Each orchestrator run writes under its own session id so several runs
//! can share one database file.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{sqlite::SqlitePoolOptions, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::models::{ClosedTrade, LifecycleEvent};

/// Connection pool plus the session id stamped on every row.
pub struct Journal {
    pool: SqlitePool,
    session_id: String,
}

/// Stored closed trade.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredTrade {
    pub id: i64,
    pub session_id: String,
    pub side: String,
    pub units: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_time: f64,
    pub exit_time: f64,
    pub reason: String,
    pub pnl: f64,
}

/// Aggregate over every stored trade.
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct TradeTotals {
    pub trades: i64,
    pub winners: i64,
    pub realized_pnl: f64,
}

impl Journal {
    /// Connect and create tables if needed.
    pub async fn new(database_url: &str) -> Result<Self> {
        // Every in-memory connection is its own database
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .with_context(|| format!("Failed to connect to journal {}", database_url))?;

        let journal = Self {
            pool,
            session_id: Uuid::new_v4().to_string(),
        };
        journal.run_migrations().await?;

        Ok(journal)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS lifecycle_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                side TEXT NOT NULL,
                units INTEGER NOT NULL,
                price REAL NOT NULL,
                tick_time REAL NOT NULL,
                message TEXT NOT NULL,
                recorded_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS closed_trades (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                side TEXT NOT NULL,
                units INTEGER NOT NULL,
                entry_price REAL NOT NULL,
                exit_price REAL NOT NULL,
                entry_time REAL NOT NULL,
                exit_time REAL NOT NULL,
                reason TEXT NOT NULL,
                pnl REAL NOT NULL,
                recorded_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_events_session ON lifecycle_events(session_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Append an event observed at `tick_time`. Exits also land in
    /// `closed_trades`, in the same transaction.
    pub async fn record_event(&self, event: &LifecycleEvent, tick_time: f64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO lifecycle_events
                (session_id, kind, side, units, price, tick_time, message, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&self.session_id)
        .bind(event.kind())
        .bind(event.side().as_str())
        .bind(event.units() as i64)
        .bind(event.price())
        .bind(tick_time)
        .bind(event.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to record lifecycle event")?;

        if let LifecycleEvent::Exited(trade) = event {
            insert_trade(&mut *tx, &self.session_id, trade).await?;
        }

        tx.commit().await.context("Failed to commit journal entry")?;
        Ok(())
    }

    /// Most recent trades across all sessions, newest first.
    pub async fn recent_trades(&self, limit: i64) -> Result<Vec<StoredTrade>> {
        let trades = sqlx::query_as::<_, StoredTrade>(
            r#"
            SELECT id, session_id, side, units, entry_price, exit_price,
                   entry_time, exit_time, reason, pnl
            FROM closed_trades
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(trades)
    }

    pub async fn trade_totals(&self) -> Result<TradeTotals> {
        let totals = sqlx::query_as::<_, TradeTotals>(
            r#"
            SELECT
                COUNT(*) AS trades,
                COALESCE(SUM(CASE WHEN pnl > 0 THEN 1 ELSE 0 END), 0) AS winners,
                COALESCE(SUM(pnl), 0.0) AS realized_pnl
            FROM closed_trades
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(totals)
    }

    /// Number of events written by this session.
    #[cfg(test)]
    pub async fn event_count(&self) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM lifecycle_events WHERE session_id = ?")
                .bind(&self.session_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

async fn insert_trade(
    conn: &mut SqliteConnection,
    session_id: &str,
    trade: &ClosedTrade,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO closed_trades
            (session_id, side, units, entry_price, exit_price, entry_time, exit_time,
             reason, pnl, recorded_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(session_id)
    .bind(trade.side.as_str())
    .bind(trade.units as i64)
    .bind(trade.entry_price)
    .bind(trade.exit_price)
    .bind(trade.entry_time)
    .bind(trade.exit_time)
    .bind(trade.reason.as_str())
    .bind(trade.pnl())
    .bind(Utc::now().to_rfc3339())
    .execute(conn)
    .await
    .context("Failed to record closed trade")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExitReason, Side};

    fn exit(entry: f64, exit: f64, units: u32) -> LifecycleEvent {
        LifecycleEvent::Exited(ClosedTrade {
            side: Side::Long,
            units,
            entry_price: entry,
            exit_price: exit,
            entry_time: 0.0,
            exit_time: 4.0,
            reason: ExitReason::Profit,
        })
    }

    #[tokio::test]
    async fn test_records_events_and_trades() {
        let journal = Journal::new("sqlite::memory:").await.unwrap();

        let entered = LifecycleEvent::Entered {
            side: Side::Long,
            price: 100.0,
            time: 0.0,
        };
        journal.record_event(&entered, 0.0).await.unwrap();
        journal.record_event(&exit(100.0, 101.0, 2), 4.0).await.unwrap();
        journal.record_event(&exit(100.0, 99.5, 1), 9.0).await.unwrap();

        assert_eq!(journal.event_count().await.unwrap(), 3);

        let trades = journal.recent_trades(10).await.unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].exit_price, 99.5);
        assert_eq!(trades[1].pnl, 2.0);
        assert_eq!(trades[1].side, "LONG");
        assert_eq!(trades[1].reason, "profit");
        assert_eq!(trades[1].session_id, journal.session_id());

        let totals = journal.trade_totals().await.unwrap();
        assert_eq!(totals.trades, 2);
        assert_eq!(totals.winners, 1);
        assert!((totals.realized_pnl - 1.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_exit_is_all_or_nothing() {
        let journal = Journal::new("sqlite::memory:").await.unwrap();
        journal.record_event(&exit(100.0, 101.0, 1), 4.0).await.unwrap();

        sqlx::query("DROP TABLE closed_trades")
            .execute(&journal.pool)
            .await
            .unwrap();

        assert!(journal.record_event(&exit(100.0, 99.0, 1), 8.0).await.is_err());
        assert_eq!(journal.event_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_totals() {
        let journal = Journal::new("sqlite::memory:").await.unwrap();
        let totals = journal.trade_totals().await.unwrap();
        assert_eq!(totals.trades, 0);
        assert_eq!(totals.realized_pnl, 0.0);
        assert!(journal.recent_trades(5).await.unwrap().is_empty());
    }
}
