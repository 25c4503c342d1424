//! Trader ledger: position, cash, realized/unrealized P&L, fill history,
//! and the adverse-selection (toxicity) score.
//!
//! The ledger is the only state a fill mutates. Accounting is average-cost
//! in integer cash units: the open position carries its entry notional, so
//! VWAP and realized P&L never round through floating point. Cash is exact
//! by construction (`mark_to_market = cash + position * mark`); the
//! realized/unrealized split is derived reporting.

use std::collections::VecDeque;

use types::{Cash, Price, Quantity, Side, Tick, TraderId};

/// Fill records retained per trader. Older fills age out of the window;
/// position and P&L are unaffected by the trim.
const FILL_HISTORY: usize = 256;

/// One execution applied to this ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillRecord {
    pub price: Price,
    pub qty: Quantity,
    pub side: Side,
    pub fee: Cash,
    pub tick: Tick,
}

/// A trader's account for the whole session.
#[derive(Debug, Clone)]
pub struct Trader {
    trader_id: TraderId,
    name: String,
    is_bot: bool,
    position: i64,
    cash: Cash,
    fees_paid: Cash,
    realized_pnl: Cash,
    /// Entry notional of the open position (always non-negative).
    open_notional: Cash,
    fills: VecDeque<FillRecord>,
    toxicity: f64,
}

impl Trader {
    pub fn new(trader_id: TraderId, name: impl Into<String>, is_bot: bool) -> Self {
        Self {
            trader_id,
            name: name.into(),
            is_bot,
            position: 0,
            cash: Cash::ZERO,
            fees_paid: Cash::ZERO,
            realized_pnl: Cash::ZERO,
            open_notional: Cash::ZERO,
            fills: VecDeque::new(),
            toxicity: 0.0,
        }
    }

    pub fn trader_id(&self) -> TraderId {
        self.trader_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_bot(&self) -> bool {
        self.is_bot
    }

    /// Signed position: positive long, negative short.
    pub fn position(&self) -> i64 {
        self.position
    }

    /// Cumulative cash flow from trades and fees. Not P&L on its own.
    pub fn cash(&self) -> Cash {
        self.cash
    }

    pub fn fees_paid(&self) -> Cash {
        self.fees_paid
    }

    pub fn realized_pnl(&self) -> Cash {
        self.realized_pnl
    }

    /// EWMA adverse-selection score in [0, 1].
    pub fn toxicity(&self) -> f64 {
        self.toxicity
    }

    pub fn num_fills(&self) -> usize {
        self.fills.len()
    }

    /// Recent fills, oldest first.
    pub fn fills(&self) -> impl ExactSizeIterator<Item = &FillRecord> {
        self.fills.iter()
    }

    /// Average entry price of the open position.
    pub fn vwap(&self) -> Option<Price> {
        if self.position == 0 {
            return None;
        }
        Some(Price(self.open_notional.raw() / self.position.abs()))
    }

    /// Total P&L at `mark`: `cash + position * mark`. Exact.
    pub fn mark_to_market(&self, mark: Price) -> Cash {
        self.cash + Cash(self.position * mark.raw())
    }

    /// Open-position P&L at `mark` relative to average entry.
    pub fn unrealized_pnl(&self, mark: Price) -> Cash {
        let entry = if self.position >= 0 {
            self.open_notional.raw()
        } else {
            -self.open_notional.raw()
        };
        Cash(self.position * mark.raw() - entry)
    }

    /// Apply one execution.
    ///
    /// Cash moves by the full notional (out on buys, in on sells) and the
    /// fee is debited (a negative fee credits a rebate). Reducing fills
    /// realize P&L against the average entry price; a fill that flips the
    /// position re-opens the remainder at the fill price.
    pub fn apply_fill(&mut self, side: Side, price: Price, qty: Quantity, fee: Cash, tick: Tick) {
        let notional = price * qty;
        let signed = side.sign() * qty.raw() as i64;

        match side {
            Side::Bid => self.cash -= notional,
            Side::Ask => self.cash += notional,
        }
        self.cash -= fee;
        self.fees_paid += fee;

        if self.position == 0 || self.position.signum() == signed.signum() {
            // Extending (or opening) the position.
            self.open_notional += notional;
            self.position += signed;
        } else {
            // Reducing; realize against average entry.
            let old_abs = self.position.abs();
            let closed = old_abs.min(qty.raw() as i64);
            let entry_portion = Cash(self.open_notional.raw() * closed / old_abs);
            let close_value = Cash(price.raw() * closed);
            let gain = if self.position > 0 {
                close_value - entry_portion
            } else {
                entry_portion - close_value
            };
            self.realized_pnl += gain;
            self.open_notional -= entry_portion;
            self.position += signed;

            if self.position.signum() == signed.signum() {
                // Flipped through flat: remainder opens at the fill price.
                self.open_notional = Cash(price.raw() * self.position.abs());
            } else if self.position == 0 {
                self.open_notional = Cash::ZERO;
            }
        }

        self.fills.push_back(FillRecord { price, qty, side, fee, tick });
        if self.fills.len() > FILL_HISTORY {
            self.fills.pop_front();
        }
    }

    /// EWMA toxicity update: `t <- (1-a)*t + a*[adverse]`.
    ///
    /// Called one tick after each taker fill, once the post-fill mid is
    /// known. `adverse` means the mid moved in the aggressor's favor.
    pub fn observe_toxicity(&mut self, adverse: bool, alpha: f64) {
        let x = if adverse { 1.0 } else { 0.0 };
        self.toxicity = (1.0 - alpha) * self.toxicity + alpha * x;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trader() -> Trader {
        Trader::new(TraderId(1), "t1", true)
    }

    fn px(v: f64) -> Price {
        Price::from_float(v)
    }

    #[test]
    fn test_buy_then_mark() {
        let mut t = trader();
        t.apply_fill(Side::Bid, px(100.0), Quantity(5), Cash::ZERO, 1);

        assert_eq!(t.position(), 5);
        assert_eq!(t.cash(), Cash::from_float(-500.0));
        assert_eq!(t.vwap(), Some(px(100.0)));
        assert_eq!(t.mark_to_market(px(102.0)), Cash::from_float(10.0));
        assert_eq!(t.unrealized_pnl(px(102.0)), Cash::from_float(10.0));
        assert_eq!(t.realized_pnl(), Cash::ZERO);
    }

    #[test]
    fn test_vwap_extends() {
        let mut t = trader();
        t.apply_fill(Side::Bid, px(100.0), Quantity(10), Cash::ZERO, 1);
        t.apply_fill(Side::Bid, px(110.0), Quantity(10), Cash::ZERO, 2);
        assert_eq!(t.vwap(), Some(px(105.0)));
        assert_eq!(t.position(), 20);
    }

    #[test]
    fn test_reduce_realizes_pnl() {
        let mut t = trader();
        t.apply_fill(Side::Bid, px(100.0), Quantity(10), Cash::ZERO, 1);
        t.apply_fill(Side::Ask, px(104.0), Quantity(4), Cash::ZERO, 2);

        assert_eq!(t.position(), 6);
        assert_eq!(t.realized_pnl(), Cash::from_float(16.0));
        assert_eq!(t.vwap(), Some(px(100.0)));
        // mtm at entry price equals realized (no unrealized move).
        assert_eq!(t.mark_to_market(px(100.0)), Cash::from_float(16.0));
    }

    #[test]
    fn test_short_side_accounting() {
        let mut t = trader();
        t.apply_fill(Side::Ask, px(100.0), Quantity(8), Cash::ZERO, 1);
        assert_eq!(t.position(), -8);
        assert_eq!(t.cash(), Cash::from_float(800.0));
        assert_eq!(t.vwap(), Some(px(100.0)));
        // Short profits when the mark drops.
        assert_eq!(t.unrealized_pnl(px(95.0)), Cash::from_float(40.0));

        t.apply_fill(Side::Bid, px(95.0), Quantity(8), Cash::ZERO, 2);
        assert_eq!(t.position(), 0);
        assert_eq!(t.realized_pnl(), Cash::from_float(40.0));
        assert_eq!(t.vwap(), None);
    }

    #[test]
    fn test_flip_through_flat() {
        let mut t = trader();
        t.apply_fill(Side::Bid, px(100.0), Quantity(5), Cash::ZERO, 1);
        // Sell 8: closes 5 at +2 each, opens short 3 at 102.
        t.apply_fill(Side::Ask, px(102.0), Quantity(8), Cash::ZERO, 2);

        assert_eq!(t.position(), -3);
        assert_eq!(t.realized_pnl(), Cash::from_float(10.0));
        assert_eq!(t.vwap(), Some(px(102.0)));
    }

    #[test]
    fn test_fees_and_rebates() {
        let mut t = trader();
        t.apply_fill(Side::Bid, px(100.0), Quantity(1), Cash::from_float(0.1), 1);
        assert_eq!(t.cash(), Cash::from_float(-100.1));
        assert_eq!(t.fees_paid(), Cash::from_float(0.1));

        // Maker rebate credits cash.
        t.apply_fill(Side::Ask, px(100.0), Quantity(1), Cash::from_float(-0.02), 2);
        assert_eq!(t.cash(), Cash::from_float(-0.08));
        assert_eq!(t.fees_paid(), Cash::from_float(0.08));
    }

    #[test]
    fn test_toxicity_ewma() {
        let mut t = trader();
        assert_eq!(t.toxicity(), 0.0);
        t.observe_toxicity(true, 0.5);
        assert!((t.toxicity() - 0.5).abs() < 1e-12);
        t.observe_toxicity(true, 0.5);
        assert!((t.toxicity() - 0.75).abs() < 1e-12);
        t.observe_toxicity(false, 0.5);
        assert!((t.toxicity() - 0.375).abs() < 1e-12);
        // Always bounded in [0, 1].
        for _ in 0..100 {
            t.observe_toxicity(true, 0.5);
        }
        assert!(t.toxicity() <= 1.0);
    }

    #[test]
    fn test_fill_history_bounded() {
        let mut t = trader();
        for i in 0..(FILL_HISTORY + 50) {
            t.apply_fill(Side::Bid, px(100.0), Quantity(1), Cash::ZERO, i as Tick);
        }
        assert_eq!(t.num_fills(), FILL_HISTORY);
        assert_eq!(t.position(), (FILL_HISTORY + 50) as i64);
    }
}
