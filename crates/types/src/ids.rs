//! Identifier newtypes and time units.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for orders. Assigned monotonically by the simulator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Order({})", self.0)
    }
}

/// Unique identifier for traders (the human user and every bot).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct TraderId(pub u64);

impl fmt::Display for TraderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Trader({})", self.0)
    }
}

/// Reserved identifier for the human-operated trader.
pub const USER_TRADER_ID: TraderId = TraderId(0);

/// Simulation tick number (discrete time step). Time advances only here.
pub type Tick = u64;
