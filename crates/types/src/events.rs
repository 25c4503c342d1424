//! Match events, trade prints, and the journaled session event stream.

use crate::ids::{OrderId, Tick, TraderId};
use crate::money::{Cash, Price, Quantity};
use crate::order::Side;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single execution between a resting maker and an incoming taker.
///
/// The execution price is always the maker's resting price. Events are
/// immutable once emitted and are appended to the journal in resolution
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub maker_order_id: OrderId,
    pub taker_order_id: OrderId,
    pub maker_trader_id: TraderId,
    pub taker_trader_id: TraderId,
    /// Execution price (the maker's resting price).
    pub price: Price,
    pub qty: Quantity,
    /// Side of the taker (the newer order).
    pub aggressor_side: Side,
    pub tick: Tick,
}

impl MatchEvent {
    /// Total notional value of this match.
    pub fn value(&self) -> Cash {
        self.price * self.qty
    }
}

impl fmt::Display for MatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "match {}x{} @ {} (maker {}, taker {}, aggressor {})",
            self.qty, self.price, self.tick, self.maker_trader_id, self.taker_trader_id,
            self.aggressor_side,
        )
    }
}

/// Projection of a `MatchEvent` onto the public tape visible to bots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradePrint {
    pub price: Price,
    pub qty: Quantity,
    pub aggressor_side: Side,
    pub tick: Tick,
}

impl From<&MatchEvent> for TradePrint {
    fn from(ev: &MatchEvent) -> Self {
        Self {
            price: ev.price,
            qty: ev.qty,
            aggressor_side: ev.aggressor_side,
            tick: ev.tick,
        }
    }
}

/// Enumerated reasons the risk manager rejects an order or forces an exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskRejection {
    /// Order quantity exceeds `max_order_qty`.
    SizeLimitExceeded,
    /// A full fill would push `|position|` past `position_limit`.
    PositionLimitExceeded,
    /// Aggressive order too large relative to opposite-side depth.
    ConcentrationTooHigh,
    /// Mark-to-market P&L below `loss_limit`; all new orders refused.
    LossCircuitBreakerTripped,
    /// Post-tick margin check forced a liquidation.
    MarginCallForced,
}

impl fmt::Display for RiskRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SizeLimitExceeded => write!(f, "order size limit exceeded"),
            Self::PositionLimitExceeded => write!(f, "position limit exceeded"),
            Self::ConcentrationTooHigh => write!(f, "concentration too high"),
            Self::LossCircuitBreakerTripped => write!(f, "loss circuit breaker tripped"),
            Self::MarginCallForced => write!(f, "margin call forced"),
        }
    }
}

impl std::error::Error for RiskRejection {}

/// Observable per-tick event stream: executions, risk rejections, and
/// forced liquidations. These are the `event` records in the journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionEvent {
    Match(MatchEvent),
    RiskRejected {
        trader_id: TraderId,
        reason: RiskRejection,
        tick: Tick,
    },
    ForcedLiquidation {
        trader_id: TraderId,
        side: Side,
        qty: Quantity,
        price: Price,
        tick: Tick,
    },
}
