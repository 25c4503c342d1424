//! Session replay from a journal.
//!
//! Replaying the `header` plus the accepted `command` records against a
//! fresh simulator seeded identically reproduces the original session
//! exactly, provided commands are re-queued at their recorded tick
//! indices. `event` and `snapshot` records are informational and ignored.

use std::collections::BTreeMap;
use std::fmt;

use journal::Record;
use types::{Command, MarketSnapshot, Tick};

use crate::runner::{SimError, Simulator};

#[derive(Debug)]
pub enum ReplayError {
    /// The journal does not start with a header record.
    MissingHeader,
    /// The header's embedded config failed validation.
    BadConfig(String),
    /// The simulator failed mid-replay.
    Sim(SimError),
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayError::MissingHeader => write!(f, "journal has no header record"),
            ReplayError::BadConfig(reason) => write!(f, "journal config invalid: {reason}"),
            ReplayError::Sim(err) => write!(f, "replay failed: {err}"),
        }
    }
}

impl std::error::Error for ReplayError {}

/// Outcome of a completed replay.
#[derive(Debug, Clone)]
pub struct ReplaySummary {
    pub seed: u64,
    pub ticks: Tick,
    pub commands_replayed: usize,
    pub matches: u64,
    pub volume: u64,
    pub final_snapshot: MarketSnapshot,
}

/// Reconstruct a session from journal records, stopping after `until`
/// ticks when given (otherwise at the last recorded tick).
pub fn replay(records: &[Record], until: Option<Tick>) -> Result<ReplaySummary, ReplayError> {
    let Some(Record::Header { seed, config, .. }) = records.first() else {
        return Err(ReplayError::MissingHeader);
    };
    config
        .validate()
        .map_err(|e| ReplayError::BadConfig(e.to_string()))?;

    // Commands grouped by the tick they were applied in. Control commands
    // never change tick content and are skipped.
    let mut commands: BTreeMap<Tick, Vec<Command>> = BTreeMap::new();
    let mut last_recorded = 0;
    for record in &records[1..] {
        let tick = match record {
            Record::Command { tick, command, .. } => {
                if !matches!(command, Command::Pause | Command::Resume | Command::Tick) {
                    commands.entry(*tick).or_default().push(command.clone());
                }
                *tick
            }
            Record::Event { tick, .. } | Record::Snapshot { tick, .. } => *tick,
            Record::Header { tick, .. } => *tick,
        };
        last_recorded = last_recorded.max(tick);
    }

    let end = until.unwrap_or(last_recorded);
    let mut commands_replayed = 0;

    let mut sim = Simulator::new(config.clone(), *seed);
    for tick in 1..=end {
        if let Some(batch) = commands.get(&tick) {
            for command in batch {
                sim.queue_command(command.clone());
                commands_replayed += 1;
            }
        }
        sim.step().map_err(ReplayError::Sim)?;
    }

    Ok(ReplaySummary {
        seed: *seed,
        ticks: end,
        commands_replayed,
        matches: sim.total_matches(),
        volume: sim.total_volume(),
        final_snapshot: sim.snapshot(),
    })
}
