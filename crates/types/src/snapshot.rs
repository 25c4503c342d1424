//! Immutable per-tick market snapshot delivered to subscribers.

use crate::events::TradePrint;
use crate::ids::{Tick, TraderId};
use crate::money::{Cash, Price, Quantity};
use serde::{Deserialize, Serialize};

/// One aggregated price level as exposed in depth views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Price,
    pub qty: Quantity,
}

/// Per-trader metrics published with every snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraderStat {
    pub trader_id: TraderId,
    pub name: String,
    pub position: i64,
    pub cash: Cash,
    pub realized_pnl: Cash,
    pub unrealized_pnl: Cash,
    /// Average entry price of the open position, if any.
    pub vwap: Option<Price>,
    /// EWMA adverse-selection score in [0, 1].
    pub toxicity: f64,
    /// Value-at-risk estimate for the current position.
    pub value_at_risk: f64,
}

/// Immutable view of the market at the end of a tick.
///
/// Subscribers receive value copies; no snapshot ever exposes a partially
/// applied tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub tick: Tick,
    /// Top-N bid levels, best (highest) first.
    pub bids: Vec<BookLevel>,
    /// Top-N ask levels, best (lowest) first.
    pub asks: Vec<BookLevel>,
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
    pub mid: Option<Price>,
    pub last_trade: Option<TradePrint>,
    pub fair_value: f64,
    pub uncertainty: f64,
    pub volatility: f64,
    pub traders: Vec<TraderStat>,
    /// Set when the simulator has poisoned itself on an invariant
    /// violation; no further ticks will run.
    pub fatal: Option<String>,
}

impl MarketSnapshot {
    /// Spread between best ask and best bid.
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Metrics for a specific trader, if visible.
    pub fn trader(&self, id: TraderId) -> Option<&TraderStat> {
        self.traders.iter().find(|t| t.trader_id == id)
    }
}
