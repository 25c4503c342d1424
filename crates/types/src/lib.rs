//! Core types for the exchange simulator.
//!
//! This crate provides all shared data types used across the simulation:
//! newtyped identifiers, fixed-point monetary values, orders and match
//! events, market snapshots, the command interface, and the session
//! configuration.

mod command;
mod config;
mod events;
mod ids;
mod money;
mod order;
mod snapshot;

pub use command::{Command, CommandResult, RejectKind};
pub use config::{ConfigError, ExchangeConfig};
pub use events::{MatchEvent, RiskRejection, SessionEvent, TradePrint};
pub use ids::{OrderId, Tick, TraderId, USER_TRADER_ID};
pub use money::{Cash, PRICE_SCALE, Price, Quantity};
pub use order::{Order, Side, TimeInForce};
pub use snapshot::{BookLevel, MarketSnapshot, TraderStat};
