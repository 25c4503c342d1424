//! Order types for the exchange simulator.

use crate::ids::{OrderId, Tick, TraderId};
use crate::money::{Price, Quantity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the book an order rests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// Returns the opposite side.
    pub fn opposite(self) -> Self {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }

    /// Position sign of a fill on this side: +1 for a buy, -1 for a sell.
    pub fn sign(self) -> i64 {
        match self {
            Side::Bid => 1,
            Side::Ask => -1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => write!(f, "BID"),
            Side::Ask => write!(f, "ASK"),
        }
    }
}

/// Time-in-force of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good-til-cancelled; rests until filled, cancelled, or expired.
    Gtc,
    /// Immediate-or-cancel; any unfilled remainder never rests past its tick.
    Ioc,
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeInForce::Gtc => write!(f, "GTC"),
            TimeInForce::Ioc => write!(f, "IOC"),
        }
    }
}

/// A resting or incoming limit order.
///
/// Immutable after placement except for `remaining_qty`, which only the
/// matching engine decrements. Priority within a price level is strictly
/// by `(timestamp, order_id)` ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier (assigned by the simulator).
    pub id: OrderId,
    /// Trader who submitted the order.
    pub trader_id: TraderId,
    /// Bid or ask.
    pub side: Side,
    /// Limit price, a positive multiple of the tick size.
    pub price: Price,
    /// Quantity at placement.
    pub original_qty: Quantity,
    /// Quantity still open. `0 < remaining_qty <= original_qty`.
    pub remaining_qty: Quantity,
    /// Tick at which the order was placed.
    pub timestamp: Tick,
    /// GTC or IOC.
    pub time_in_force: TimeInForce,
    /// Tick at which a GTC quote goes stale; `None` never expires.
    pub expires_at: Option<Tick>,
}

impl Order {
    /// Create a new order with full remaining quantity.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: OrderId,
        trader_id: TraderId,
        side: Side,
        price: Price,
        qty: Quantity,
        timestamp: Tick,
        time_in_force: TimeInForce,
        expires_at: Option<Tick>,
    ) -> Self {
        Self {
            id,
            trader_id,
            side,
            price,
            original_qty: qty,
            remaining_qty: qty,
            timestamp,
            time_in_force,
            expires_at,
        }
    }

    /// Time-priority key: older `(timestamp, order_id)` wins.
    #[inline]
    pub fn priority_key(&self) -> (Tick, OrderId) {
        (self.timestamp, self.id)
    }

    /// Check if the order is fully filled.
    #[inline]
    pub fn is_filled(&self) -> bool {
        self.remaining_qty.is_zero()
    }

    /// Check whether a GTC order is stale at `now`.
    #[inline]
    pub fn is_expired(&self, now: Tick) -> bool {
        self.time_in_force == TimeInForce::Gtc
            && self.expires_at.is_some_and(|at| at <= now)
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}x{} @ {} ({})",
            self.id, self.side, self.remaining_qty, self.original_qty, self.price,
            self.time_in_force,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: u64, ts: Tick) -> Order {
        Order::new(
            OrderId(id),
            TraderId(1),
            Side::Bid,
            Price::from_float(100.0),
            Quantity(10),
            ts,
            TimeInForce::Gtc,
            Some(ts + 5),
        )
    }

    #[test]
    fn test_side_opposite_and_sign() {
        assert_eq!(Side::Bid.opposite(), Side::Ask);
        assert_eq!(Side::Ask.opposite(), Side::Bid);
        assert_eq!(Side::Bid.sign(), 1);
        assert_eq!(Side::Ask.sign(), -1);
    }

    #[test]
    fn test_priority_key_ordering() {
        let a = order(1, 1);
        let b = order(2, 1);
        let c = order(3, 2);
        assert!(a.priority_key() < b.priority_key());
        assert!(b.priority_key() < c.priority_key());
    }

    #[test]
    fn test_expiry() {
        let o = order(1, 10); // expires_at = 15
        assert!(!o.is_expired(14));
        assert!(o.is_expired(15));
        assert!(o.is_expired(16));

        let mut ioc = order(2, 10);
        ioc.time_in_force = TimeInForce::Ioc;
        // IOC orders are cleaned up by the simulator, never by expiry.
        assert!(!ioc.is_expired(100));
    }
}
