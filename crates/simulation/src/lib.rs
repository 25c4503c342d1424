//! The simulation crate: tick orchestration for the exchange.
//!
//! The `Simulator` owns the book, the trader ledgers, the bot roster, the
//! risk manager, and the session RNG. Exactly one thread advances the
//! pipeline; external callers push `Command`s onto an MPSC queue that is
//! drained once per tick, and read the immutable `MarketSnapshot` stream
//! published at the end of every tick.
//!
//! # Tick pipeline
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      Simulator.step()                    │
//! │                                                          │
//! │  1. now += 1                                             │
//! │  2. expire stale GTC quotes                              │
//! │  3. recompute fair value / uncertainty from the schedule │
//! │  4. inject forced liquidations queued by the last tick   │
//! │  5. consult bots behind latency gates (roster order)     │
//! │  6. drain and apply queued user commands                 │
//! │  7. match once                                           │
//! │  8. apply fills (maker, then taker; fees per side)       │
//! │  9. cancel leftover IOC remainders                       │
//! │ 10. update volatility, resolve deferred toxicity         │
//! │ 11. post-tick risk check per trader (defer directives)   │
//! │ 12. verify invariants, snapshot, journal, publish        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Given the same `(seed, config, command stream)`, the emitted event and
//! snapshot sequences are bitwise identical.

mod fair_value;
mod replay;
mod runner;

pub use fair_value::FairValueSchedule;
pub use replay::{ReplayError, ReplaySummary, replay};
pub use runner::{CommandEnvelope, SimError, Simulator, TickReport};
