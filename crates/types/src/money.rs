//! Fixed-point monetary types.
//!
//! Prices and cash are stored as `i64` minor units so that tick snapping,
//! VWAP accounting, and book-key comparisons never touch binary floating
//! point.

use derive_more::{Add, AddAssign, From, Into, Neg, Sub, SubAssign, Sum};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Mul;

/// Fixed-point scale for `Price` and `Cash`.
/// 10,000 = 1.00, 15,000 = 1.50, 100 = 0.01.
pub const PRICE_SCALE: i64 = 10_000;

// =============================================================================
// Quantity
// =============================================================================

/// Number of lots (newtype for type safety).
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Default,
    Add,
    Sub,
    AddAssign,
    SubAssign,
    Sum,
    From,
    Into,
)]
pub struct Quantity(pub u64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    /// Get raw value.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }

    /// Check if zero.
    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Saturating subtraction.
    #[inline]
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Quantity(self.0.saturating_sub(rhs.0))
    }

    /// Minimum of two quantities.
    #[inline]
    pub fn min(self, other: Self) -> Self {
        Quantity(self.0.min(other.0))
    }
}

impl fmt::Debug for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Qty({})", self.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Allow `quantity == 50` comparisons in tests.
impl PartialEq<u64> for Quantity {
    fn eq(&self, other: &u64) -> bool {
        self.0 == *other
    }
}

// =============================================================================
// Price
// =============================================================================

/// Fixed-point price with 4 decimal places.
///
/// # Examples
/// - `Price(10000)` = 1.00
/// - `Price(15000)` = 1.50
/// - `Price(100)` = 0.01
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Default,
    Add,
    Sub,
    Neg,
    AddAssign,
    SubAssign,
    From,
    Into,
)]
pub struct Price(pub i64);

impl Price {
    pub const ZERO: Price = Price(0);

    /// Create a Price from a floating-point value.
    #[inline]
    pub fn from_float(v: f64) -> Self {
        Self((v * PRICE_SCALE as f64).round() as i64)
    }

    /// Convert to floating-point for display or statistics.
    #[inline]
    pub fn to_float(self) -> f64 {
        self.0 as f64 / PRICE_SCALE as f64
    }

    /// Raw internal value.
    #[inline]
    pub fn raw(self) -> i64 {
        self.0
    }

    /// Check if price is positive.
    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Absolute value.
    #[inline]
    pub fn abs(self) -> Self {
        Price(self.0.abs())
    }

    /// Snap to the nearest multiple of `tick` (round half away from zero).
    #[inline]
    pub fn snap_to_tick(self, tick: Price) -> Price {
        debug_assert!(tick.0 > 0);
        let t = tick.0;
        let half = t / 2;
        let snapped = if self.0 >= 0 {
            (self.0 + half) / t * t
        } else {
            (self.0 - half) / t * t
        };
        Price(snapped)
    }

    /// Check whether this price lies exactly on the tick grid.
    #[inline]
    pub fn is_on_tick(self, tick: Price) -> bool {
        tick.0 > 0 && self.0 % tick.0 == 0
    }

    /// Move by `n` ticks (`n` may be negative).
    #[inline]
    pub fn offset_ticks(self, tick: Price, n: i64) -> Price {
        Price(self.0 + tick.0 * n)
    }

    /// Midpoint of two prices.
    #[inline]
    pub fn midpoint(a: Price, b: Price) -> Price {
        Price((a.0 + b.0) / 2)
    }
}

impl fmt::Debug for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Price({:.4})", self.to_float())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.to_float())
    }
}

// =============================================================================
// Cash
// =============================================================================

/// Fixed-point cash with 4 decimal places.
///
/// Semantically identical to `Price` but represents account balances and
/// P&L amounts.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Default,
    Add,
    Sub,
    Neg,
    AddAssign,
    SubAssign,
    Sum,
    From,
    Into,
)]
pub struct Cash(pub i64);

impl Cash {
    pub const ZERO: Cash = Cash(0);

    /// Create Cash from a floating-point value.
    #[inline]
    pub fn from_float(v: f64) -> Self {
        Self((v * PRICE_SCALE as f64).round() as i64)
    }

    /// Convert to floating-point for display or statistics.
    #[inline]
    pub fn to_float(self) -> f64 {
        self.0 as f64 / PRICE_SCALE as f64
    }

    /// Raw internal value.
    #[inline]
    pub fn raw(self) -> i64 {
        self.0
    }

    /// Check if cash is negative.
    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Debug for Cash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cash({:.4})", self.to_float())
    }
}

impl fmt::Display for Cash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.to_float())
    }
}

// =============================================================================
// Price-Quantity operations
// =============================================================================

impl Mul<Quantity> for Price {
    type Output = Cash;

    /// Multiply price by quantity to get total notional value.
    fn mul(self, qty: Quantity) -> Cash {
        Cash(self.0 * qty.0 as i64)
    }
}

impl Mul<Price> for Quantity {
    type Output = Cash;

    fn mul(self, price: Price) -> Cash {
        Cash(price.0 * self.0 as i64)
    }
}
