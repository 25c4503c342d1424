//! exchange-sim - headless exchange simulator CLI.
//!
//! `run` drives a seeded session for a fixed number of ticks, journaling
//! to disk; `replay` reconstructs a session from its journal and prints a
//! final summary. Exit codes: 0 clean, 2 bad config, 3 journal I/O error.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use simulation::{ReplayError, SimError, Simulator, replay};
use types::ExchangeConfig;

const EXIT_BAD_CONFIG: u8 = 2;
const EXIT_JOURNAL_ERROR: u8 = 3;

#[derive(Parser)]
#[command(name = "exchange-sim")]
#[command(about = "Simulated electronic exchange with deterministic matching and replay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a headless session.
    Run {
        /// Session seed; random when omitted.
        #[arg(long)]
        seed: Option<u64>,

        /// Path to a JSON config file; built-in defaults when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Journal output path.
        #[arg(long)]
        journal: Option<PathBuf>,

        /// Number of ticks to run.
        #[arg(long, default_value_t = 1024)]
        ticks: u64,

        /// Delay between ticks in milliseconds (0 = fastest).
        #[arg(long, default_value_t = 0)]
        tick_delay_ms: u64,
    },
    /// Reconstruct a session from its journal and print a summary.
    Replay {
        /// Journal to replay.
        #[arg(long)]
        journal: PathBuf,

        /// Stop after this tick instead of the last recorded one.
        #[arg(long)]
        until: Option<u64>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    match Cli::parse().command {
        Commands::Run { seed, config, journal, ticks, tick_delay_ms } => {
            run_session(seed, config, journal, ticks, tick_delay_ms)
        }
        Commands::Replay { journal, until } => replay_session(&journal, until),
    }
}

fn run_session(
    seed: Option<u64>,
    config_path: Option<PathBuf>,
    journal_path: Option<PathBuf>,
    ticks: u64,
    tick_delay_ms: u64,
) -> ExitCode {
    let config = match config_path {
        Some(path) => match ExchangeConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                error!(path = %path.display(), %err, "failed to load config");
                return ExitCode::from(EXIT_BAD_CONFIG);
            }
        },
        None => ExchangeConfig::default(),
    };
    if let Err(err) = config.validate() {
        error!(%err, "invalid config");
        return ExitCode::from(EXIT_BAD_CONFIG);
    }

    let seed = seed.unwrap_or_else(rand::random);
    let mut sim = Simulator::new(config, seed);
    info!(seed, ticks, "session starting");

    if let Some(path) = &journal_path {
        if let Err(err) = sim.attach_journal(path) {
            error!(path = %path.display(), %err, "failed to open journal");
            return ExitCode::from(EXIT_JOURNAL_ERROR);
        }
        info!(path = %path.display(), "journaling");
    }

    for done in 1..=ticks {
        match sim.step() {
            Ok(report) => {
                if done % 256 == 0 {
                    info!(
                        tick = report.tick,
                        matches = sim.total_matches(),
                        volume = sim.total_volume(),
                        fair_value = format!("{:.2}", sim.fair_value()),
                        "progress"
                    );
                }
                if let Some(fatal) = &report.snapshot.fatal {
                    error!(%fatal, "simulator poisoned; stopping");
                    break;
                }
            }
            Err(SimError::Journal(err)) => {
                error!(%err, "journal write failed");
                return ExitCode::from(EXIT_JOURNAL_ERROR);
            }
            Err(SimError::Poisoned(reason)) => {
                error!(%reason, "simulator poisoned; stopping");
                break;
            }
        }
        if tick_delay_ms > 0 {
            std::thread::sleep(std::time::Duration::from_millis(tick_delay_ms));
        }
    }

    print_summary(&sim);
    ExitCode::SUCCESS
}

fn print_summary(sim: &Simulator) {
    let snapshot = sim.snapshot();
    println!("session seed {} finished at tick {}", sim.seed(), sim.now());
    println!(
        "matches {}  volume {}  fair value {:.2}  volatility {:.2}",
        sim.total_matches(),
        sim.total_volume(),
        sim.fair_value(),
        sim.volatility()
    );
    println!("{:<12} {:>8} {:>12} {:>12} {:>9}", "trader", "position", "cash", "pnl", "toxicity");
    for stat in &snapshot.traders {
        println!(
            "{:<12} {:>8} {:>12} {:>12} {:>9.3}",
            stat.name,
            stat.position,
            stat.cash.to_float(),
            (stat.realized_pnl + stat.unrealized_pnl).to_float(),
            stat.toxicity
        );
    }
}

fn replay_session(journal_path: &PathBuf, until: Option<u64>) -> ExitCode {
    let records = match journal::read_records(journal_path) {
        Ok(records) => records,
        Err(err) => {
            error!(path = %journal_path.display(), %err, "failed to read journal");
            return ExitCode::from(EXIT_JOURNAL_ERROR);
        }
    };

    match replay(&records, until) {
        Ok(summary) => {
            println!(
                "replayed seed {} to tick {}: {} commands, {} matches, volume {}",
                summary.seed,
                summary.ticks,
                summary.commands_replayed,
                summary.matches,
                summary.volume
            );
            println!(
                "{:<12} {:>8} {:>12} {:>12}",
                "trader", "position", "cash", "pnl"
            );
            for stat in &summary.final_snapshot.traders {
                println!(
                    "{:<12} {:>8} {:>12} {:>12}",
                    stat.name,
                    stat.position,
                    stat.cash.to_float(),
                    (stat.realized_pnl + stat.unrealized_pnl).to_float()
                );
            }
            ExitCode::SUCCESS
        }
        Err(ReplayError::MissingHeader) | Err(ReplayError::BadConfig(_)) => {
            error!("journal unusable for replay");
            ExitCode::from(EXIT_BAD_CONFIG)
        }
        Err(ReplayError::Sim(err)) => {
            error!(%err, "replay failed");
            ExitCode::from(EXIT_JOURNAL_ERROR)
        }
    }
}
