//! Risk management: pre-trade gating and post-tick margin enforcement.
//!
//! Pre-trade checks run in a fixed order (size, position, concentration,
//! loss circuit breaker) and the first failure wins. The post-tick check
//! marks every trader to market and, below the margin threshold, emits a
//! flatten directive that the simulator injects at the start of the NEXT
//! tick — risk never triggers a second matching pass inside the current
//! tick.

mod stats;

pub use stats::RollingWindow;

use ledger::Trader;
use sim_core::OrderBook;
use types::{
    Cash, ExchangeConfig, Price, Quantity, RiskRejection, Side, TimeInForce, TraderId,
};

/// z-score for the 95% VaR estimate.
const VAR_Z: f64 = 1.65;

/// Number of recent mid returns in the volatility window.
const RETURN_WINDOW: usize = 32;

/// A forced liquidation to be injected at the start of the next tick:
/// a market-IOC for the trader's full position at a penalty price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlattenDirective {
    pub trader_id: TraderId,
    pub side: Side,
    pub qty: Quantity,
    pub price: Price,
}

/// Centralized risk state: limits plus the rolling mid-return window.
#[derive(Debug, Clone)]
pub struct RiskManager {
    max_order_qty: Quantity,
    position_limit: i64,
    loss_limit: Cash,
    margin_threshold: Cash,
    margin_penalty_ticks: i64,
    concentration_frac: f64,
    tick_size: Price,
    returns: RollingWindow,
    last_mid: Option<f64>,
}

impl RiskManager {
    pub fn new(config: &ExchangeConfig) -> Self {
        Self {
            max_order_qty: Quantity(config.max_order_qty),
            position_limit: config.position_limit,
            loss_limit: config.loss_limit_cash(),
            margin_threshold: config.margin_threshold_cash(),
            margin_penalty_ticks: config.margin_penalty_ticks,
            concentration_frac: config.concentration_frac,
            tick_size: config.tick(),
            returns: RollingWindow::new(RETURN_WINDOW),
            last_mid: None,
        }
    }

    /// Re-read the adjustable limits after a `SetParam` change.
    pub fn refresh(&mut self, config: &ExchangeConfig) {
        self.max_order_qty = Quantity(config.max_order_qty);
        self.concentration_frac = config.concentration_frac;
    }

    pub fn position_limit(&self) -> i64 {
        self.position_limit
    }

    // =========================================================================
    // Pre-trade
    // =========================================================================

    /// Validate an order before insertion. Checks run in a fixed order and
    /// the first failure wins:
    ///
    /// 1. max order size
    /// 2. position limit assuming a full fill
    /// 3. concentration vs opposite-side depth (aggressive orders only)
    /// 4. loss circuit breaker on mark-to-market P&L
    pub fn check_order(
        &self,
        trader: &Trader,
        side: Side,
        qty: Quantity,
        tif: TimeInForce,
        book: &OrderBook,
        mark: Price,
    ) -> Result<(), RiskRejection> {
        if qty > self.max_order_qty {
            return Err(RiskRejection::SizeLimitExceeded);
        }

        let projected = trader.position() + side.sign() * qty.raw() as i64;
        if projected.abs() > self.position_limit {
            return Err(RiskRejection::PositionLimitExceeded);
        }

        if tif == TimeInForce::Ioc {
            let opposite_depth = book.total_quantity(side.opposite()).raw();
            let allowed = self.concentration_frac * opposite_depth as f64;
            if (qty.raw() as f64) > allowed {
                return Err(RiskRejection::ConcentrationTooHigh);
            }
        }

        if trader.mark_to_market(mark) < self.loss_limit {
            return Err(RiskRejection::LossCircuitBreakerTripped);
        }

        Ok(())
    }

    // =========================================================================
    // Post-tick
    // =========================================================================

    /// Record the tick-end mid into the return window.
    pub fn observe_mid(&mut self, mid: f64) {
        if let Some(prev) = self.last_mid
            && prev != 0.0
        {
            self.returns.push((mid - prev) / prev);
        }
        self.last_mid = Some(mid);
    }

    /// Standard deviation of the recent mid returns.
    pub fn sigma_recent(&self) -> f64 {
        self.returns.std_dev().unwrap_or(0.0)
    }

    /// `VAR = z * sigma_recent * |position|`.
    pub fn value_at_risk(&self, position: i64) -> f64 {
        VAR_Z * self.sigma_recent() * position.abs() as f64
    }

    /// Mark the trader to market; below the margin threshold, emit a
    /// flatten directive priced at best-opposite shifted by the penalty
    /// (falling back to the mark when that side is empty).
    pub fn post_tick_check(
        &self,
        trader: &Trader,
        book: &OrderBook,
        mark: Price,
    ) -> Option<FlattenDirective> {
        let position = trader.position();
        if position == 0 {
            return None;
        }
        if trader.mark_to_market(mark) >= self.margin_threshold {
            return None;
        }

        let (side, reference, shift) = if position > 0 {
            (Side::Ask, book.best_bid(), -self.margin_penalty_ticks)
        } else {
            (Side::Bid, book.best_ask(), self.margin_penalty_ticks)
        };
        let raw = reference
            .unwrap_or(mark)
            .offset_ticks(self.tick_size, shift)
            .snap_to_tick(self.tick_size);
        // A penalty price can never leave the grid's positive range.
        let price = if raw.is_positive() { raw } else { self.tick_size };

        Some(FlattenDirective {
            trader_id: trader.trader_id(),
            side,
            qty: Quantity(position.unsigned_abs()),
            price,
        })
    }
}
