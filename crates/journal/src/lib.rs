//! Append-only session journal.
//!
//! One JSON record per line, UTF-8, LF-terminated. The first line is the
//! `header` (seed + config + wall-clock start); after that come accepted
//! `command` records, `event` records in emission order, and periodic
//! informational `snapshot` records. Replaying `header` + `command`
//! against a fresh simulator reproduces the session exactly.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use types::{Command, ExchangeConfig, MarketSnapshot, OrderId, SessionEvent, Tick};

/// Errors surfaced by journal I/O. Fatal to the session: the tick that
/// failed to journal is not acknowledged.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("journal i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("journal record malformed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A single journal line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    /// First line only.
    Header {
        tick: Tick,
        seed: u64,
        config: ExchangeConfig,
        /// Wall-clock seconds since the Unix epoch at session start.
        started_at: u64,
    },
    /// An accepted command with its assigned order id, if any.
    Command {
        tick: Tick,
        command: Command,
        order_id: Option<OrderId>,
    },
    /// One session event (match, risk rejection, forced liquidation).
    Event { tick: Tick, event: SessionEvent },
    /// Periodic full snapshot; informational only, ignored by replay.
    Snapshot { tick: Tick, snapshot: MarketSnapshot },
}

/// Buffered append-only JSONL writer.
pub struct Journal {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl Journal {
    /// Create (truncate) the journal file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self { writer: BufWriter::new(file), path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a compact JSON line.
    pub fn append(&mut self, record: &Record) -> Result<(), JournalError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    /// Flush buffered lines to disk.
    pub fn flush(&mut self) -> Result<(), JournalError> {
        self.writer.flush()?;
        Ok(())
    }
}

impl Drop for Journal {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

/// Read every record from a journal file, skipping blank lines.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<Record>, JournalError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}
