//! Bot agents for the exchange simulator.
//!
//! A bot is an opaque decision function: each tick it may be shown a
//! read-only market view and returns cancels, fresh quotes, and aggressive
//! IOC intentions. Latency gates decide when a bot is consulted; all
//! randomness flows through the session RNG so the roster is fully
//! deterministic under a fixed seed.

mod roster;
mod traits;
pub mod strategies;

pub use roster::{Bot, BotHandle, standard_roster};
pub use traits::{BotView, Decision, IocRequest, QuoteRequest, Strategy};
