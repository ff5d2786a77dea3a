//! Replay of recorded ticks from a JSON-lines file.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

use crate::models::Tick;

/// Reads one tick per line; blank lines are skipped.
pub struct ReplayFeed {
    lines: Lines<BufReader<File>>,
    line_no: usize,
    finished: bool,
}

impl ReplayFeed {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .await
            .with_context(|| format!("Failed to open tick file {}", path.display()))?;

        Ok(Self {
            lines: BufReader::new(file).lines(),
            line_no: 0,
            finished: false,
        })
    }

    /// Next tick, an error for an unreadable record, or `None` at end of file.
    ///
    /// A malformed line is reported once and the following line is read on
    /// the next call; an I/O error ends the feed.
    pub async fn next_tick(&mut self) -> Option<Result<Tick>> {
        if self.finished {
            return None;
        }

        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    self.finished = true;
                    return None;
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e).context("Failed to read tick file"));
                }
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }

            let line_no = self.line_no;
            return Some(
                serde_json::from_str(&line)
                    .with_context(|| format!("Malformed tick on line {}", line_no)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_replay_reports_malformed_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"timestamp":0,"best_bid":99.5,"best_ask":100.5,"bid_size":1,"ask_size":1,"last_price":100,"last_size":1}}"#
        )
        .unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"timestamp":1,"best_bid":99.5}}"#).unwrap();
        writeln!(
            file,
            r#"{{"timestamp":2,"best_bid":100.5,"best_ask":101.5,"bid_size":2,"ask_size":0,"last_price":101,"last_size":3}}"#
        )
        .unwrap();

        let mut feed = ReplayFeed::open(file.path()).await.unwrap();

        let first = feed.next_tick().await.unwrap().unwrap();
        assert_eq!(first.last_price, 100.0);

        let err = feed.next_tick().await.unwrap().unwrap_err();
        assert!(err.to_string().contains("line 3"));

        let third = feed.next_tick().await.unwrap().unwrap();
        assert_eq!(third.timestamp, 2.0);
        assert_eq!(third.ask_size, 0);

        assert!(feed.next_tick().await.is_none());
        assert!(feed.next_tick().await.is_none());
    }

    #[tokio::test]
    async fn test_missing_file() {
        assert!(ReplayFeed::open("no/such/ticks.jsonl").await.is_err());
    }
}
