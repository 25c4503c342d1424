//! The command interface into the simulator.
//!
//! Commands are queued by external callers (UI threads, the CLI, replay)
//! and drained once per tick by the simulator. Each command receives a
//! synchronous result.

use crate::events::RiskRejection;
use crate::ids::{OrderId, TraderId};
use crate::money::{Price, Quantity};
use crate::order::{Side, TimeInForce};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A command submitted to the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    /// Submit an order. `price = None` is only valid for IOC orders and is
    /// resolved to a crossing price against the opposite best.
    Submit {
        trader: TraderId,
        side: Side,
        price: Option<Price>,
        qty: Quantity,
        tif: TimeInForce,
    },
    /// Cancel one resting order owned by `trader`.
    Cancel { trader: TraderId, order_id: OrderId },
    /// Cancel every resting order owned by `trader`.
    CancelAll { trader: TraderId },
    /// Adjust a whitelisted config parameter at runtime.
    SetParam { key: String, value: f64 },
    /// Suspend ticking (run-loop level).
    Pause,
    /// Resume ticking.
    Resume,
    /// Manually advance one tick while paused.
    Tick,
}

/// Why a command was refused. No state is mutated on rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectKind {
    Risk(RiskRejection),
    UnknownOrder,
    BadPrice,
    BadQty,
    UnknownParam,
}

impl fmt::Display for RejectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Risk(r) => write!(f, "{r}"),
            Self::UnknownOrder => write!(f, "unknown order"),
            Self::BadPrice => write!(f, "bad price"),
            Self::BadQty => write!(f, "bad quantity"),
            Self::UnknownParam => write!(f, "unknown parameter"),
        }
    }
}

/// Synchronous result of one command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CommandResult {
    /// Command applied; carries the assigned order id for submissions.
    Accepted(Option<OrderId>),
    Rejected(RejectKind),
}

impl CommandResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, CommandResult::Accepted(_))
    }

    /// The assigned order id, if this was an accepted submission.
    pub fn order_id(&self) -> Option<OrderId> {
        match self {
            CommandResult::Accepted(id) => *id,
            CommandResult::Rejected(_) => None,
        }
    }
}
