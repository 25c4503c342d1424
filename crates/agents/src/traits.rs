//! The bot decision contract.

use rand::rngs::StdRng;
use smallvec::SmallVec;
use types::{BookLevel, Cash, OrderId, Price, Quantity, Side, Tick, TradePrint};

/// Read-only market view handed to a bot when its latency gate opens.
///
/// The view borrows per-tick simulator state; bots must extract what they
/// need during `decide` and may not hold references.
#[derive(Debug)]
pub struct BotView<'a> {
    pub now: Tick,
    /// Top-N bid levels, best first.
    pub bids: &'a [BookLevel],
    /// Top-N ask levels, best first.
    pub asks: &'a [BookLevel],
    /// Recent trade prints, oldest first.
    pub tape: &'a [TradePrint],
    pub fair_value: f64,
    pub uncertainty: f64,
    pub volatility: f64,
    /// The bot's own signed position.
    pub position: i64,
    /// The bot's mark-to-market P&L.
    pub pnl: Cash,
    /// The bot's own toxicity score.
    pub toxicity: f64,
    /// The human trader's toxicity score; market makers defend against it.
    pub user_toxicity: f64,
    /// The bot's resting order ids, in id order.
    pub open_orders: &'a [OrderId],
    pub position_limit: i64,
    pub tick_size: Price,
}

impl BotView<'_> {
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|l| l.price)
    }

    pub fn mid(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(Price::midpoint(bid, ask)),
            _ => None,
        }
    }

    /// Snap a raw price onto the session tick grid.
    pub fn snap(&self, px: f64) -> Price {
        Price::from_float(px).snap_to_tick(self.tick_size)
    }
}

/// A passive quote the bot wants resting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteRequest {
    pub side: Side,
    pub price: Price,
    pub qty: Quantity,
    /// Explicit staleness tick; `None` uses the session quote lifetime.
    pub expires_at: Option<Tick>,
}

/// An aggressive immediate-or-cancel intention. The simulator prices it
/// to cross against the opposite best.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IocRequest {
    pub side: Side,
    pub qty: Quantity,
}

/// Result of one bot consultation.
#[derive(Debug, Clone, Default)]
pub struct Decision {
    /// Resting orders to cancel before new placement.
    pub cancels: Vec<OrderId>,
    /// Fresh passive quotes.
    pub quotes: SmallVec<[QuoteRequest; 2]>,
    /// Aggressive IOC intentions.
    pub ioc: SmallVec<[IocRequest; 2]>,
}

impl Decision {
    /// Do nothing this consultation.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.cancels.is_empty() && self.quotes.is_empty() && self.ioc.is_empty()
    }
}

/// The core trait every bot strategy implements.
///
/// `decide` must be a pure function of the view and the RNG draws it
/// makes; the session RNG is shared, so draw order is part of the
/// deterministic contract.
pub trait Strategy: Send {
    /// Inspect the market and produce a decision.
    fn decide(&mut self, view: &BotView<'_>, rng: &mut StdRng) -> Decision;

    /// Human-readable strategy name for logs.
    fn name(&self) -> &str {
        "Strategy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_accessors() {
        let bids = [BookLevel { price: Price::from_float(99.0), qty: Quantity(10) }];
        let asks = [BookLevel { price: Price::from_float(101.0), qty: Quantity(5) }];
        let view = BotView {
            now: 1,
            bids: &bids,
            asks: &asks,
            tape: &[],
            fair_value: 100.0,
            uncertainty: 1.0,
            volatility: 1.0,
            position: 0,
            pnl: Cash::ZERO,
            toxicity: 0.0,
            user_toxicity: 0.0,
            open_orders: &[],
            position_limit: 5,
            tick_size: Price::from_float(0.1),
        };
        assert_eq!(view.best_bid(), Some(Price::from_float(99.0)));
        assert_eq!(view.best_ask(), Some(Price::from_float(101.0)));
        assert_eq!(view.mid(), Some(Price::from_float(100.0)));
        assert_eq!(view.snap(100.07), Price::from_float(100.1));
    }

    #[test]
    fn test_empty_decision() {
        let d = Decision::none();
        assert!(d.is_empty());
    }
}
