//! Session configuration.
//!
//! All market parameters live here. The config is loaded from a JSON file
//! (unknown keys are rejected at load), validated once, and embedded in
//! the journal header so replay reconstructs the exact session.

use crate::money::{Cash, Price, Quantity};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors raised while loading or validating a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse failed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Market and session parameters.
///
/// Fee fields are per lot; `maker_fee` is usually negative (a rebate).
/// `loss_limit` and `margin_threshold` are P&L floors and therefore
/// negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ExchangeConfig {
    /// Minimum price increment. All order prices snap to this grid.
    pub min_tick_size: f64,
    /// Ticks a GTC quote rests before expiry. 0 disables expiry.
    pub quote_lifetime: u64,
    /// Largest accepted order quantity (fat-finger guard).
    pub max_order_qty: u64,
    /// Maximum absolute position per trader.
    pub position_limit: i64,
    /// Mark-to-market P&L below which all new orders are refused.
    pub loss_limit: f64,
    /// Mark-to-market P&L below which a trader is force-flattened.
    pub margin_threshold: f64,
    /// Ticks of penalty applied to the forced-liquidation price.
    pub margin_penalty_ticks: i64,
    /// Per-lot fee debited from the maker (negative = rebate).
    pub maker_fee: f64,
    /// Per-lot fee debited from the taker.
    pub taker_fee: f64,
    /// EWMA weight for the toxicity score, in (0, 1).
    pub toxicity_alpha: f64,
    /// Global multiplier applied to every bot's base latency.
    pub bot_latency_multiplier: f64,
    /// Upper clamp on the volatility state.
    pub volatility_cap: f64,
    /// Max fraction of opposite-side depth an aggressive order may take.
    pub concentration_frac: f64,
    /// Book levels per side included in snapshots and bot views.
    pub snapshot_depth_n: usize,
    /// Number of trade prints retained on the tape.
    pub tape_window: usize,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self::medium()
    }
}

impl ExchangeConfig {
    /// Relaxed preset: slow bots, no fees, wide limits.
    pub fn easy() -> Self {
        Self {
            min_tick_size: 0.1,
            quote_lifetime: 9,
            max_order_qty: 10,
            position_limit: 10,
            loss_limit: -1000.0,
            margin_threshold: -500.0,
            margin_penalty_ticks: 5,
            maker_fee: 0.0,
            taker_fee: 0.0,
            toxicity_alpha: 0.15,
            bot_latency_multiplier: 2.0,
            volatility_cap: 3.0,
            concentration_frac: 0.5,
            snapshot_depth_n: 6,
            tape_window: 120,
        }
    }

    /// Default preset.
    pub fn medium() -> Self {
        Self {
            quote_lifetime: 7,
            taker_fee: 0.10,
            maker_fee: -0.02,
            bot_latency_multiplier: 1.2,
            volatility_cap: 4.5,
            ..Self::easy()
        }
    }

    /// Aggressive preset: fast bots, higher fees, tighter vol cap usage.
    pub fn hard() -> Self {
        Self {
            quote_lifetime: 6,
            taker_fee: 0.15,
            maker_fee: -0.03,
            bot_latency_multiplier: 0.9,
            volatility_cap: 6.0,
            ..Self::easy()
        }
    }

    /// Load from a JSON file. Unknown keys are rejected by serde.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency. Called at load and before a session.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_tick_size <= 0.0 {
            return Err(ConfigError::Invalid("min_tick_size must be > 0".into()));
        }
        if self.max_order_qty == 0 {
            return Err(ConfigError::Invalid("max_order_qty must be > 0".into()));
        }
        if self.position_limit <= 0 {
            return Err(ConfigError::Invalid("position_limit must be > 0".into()));
        }
        if !(0.0..1.0).contains(&self.toxicity_alpha) || self.toxicity_alpha == 0.0 {
            return Err(ConfigError::Invalid(
                "toxicity_alpha must be in (0, 1)".into(),
            ));
        }
        if self.bot_latency_multiplier <= 0.0 {
            return Err(ConfigError::Invalid(
                "bot_latency_multiplier must be > 0".into(),
            ));
        }
        if self.volatility_cap < 1.0 {
            return Err(ConfigError::Invalid("volatility_cap must be >= 1".into()));
        }
        if self.concentration_frac <= 0.0 {
            return Err(ConfigError::Invalid(
                "concentration_frac must be > 0".into(),
            ));
        }
        if self.margin_penalty_ticks < 0 {
            return Err(ConfigError::Invalid(
                "margin_penalty_ticks must be >= 0".into(),
            ));
        }
        if self.snapshot_depth_n == 0 || self.tape_window == 0 {
            return Err(ConfigError::Invalid(
                "snapshot_depth_n and tape_window must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// The tick size as a fixed-point price.
    pub fn tick(&self) -> Price {
        Price::from_float(self.min_tick_size)
    }

    /// Loss circuit-breaker floor as fixed-point cash.
    pub fn loss_limit_cash(&self) -> Cash {
        Cash::from_float(self.loss_limit)
    }

    /// Margin-call floor as fixed-point cash.
    pub fn margin_threshold_cash(&self) -> Cash {
        Cash::from_float(self.margin_threshold)
    }

    /// Maker fee for a fill of `qty` lots (negative = rebate credited).
    pub fn maker_fee_for(&self, qty: Quantity) -> Cash {
        Cash::from_float(self.maker_fee * qty.raw() as f64)
    }

    /// Taker fee for a fill of `qty` lots.
    pub fn taker_fee_for(&self, qty: Quantity) -> Cash {
        Cash::from_float(self.taker_fee * qty.raw() as f64)
    }

    /// Keys adjustable at runtime via `SetParam`. Structural keys (tick
    /// size, position and margin limits) are fixed for the session.
    pub const ADJUSTABLE_KEYS: &'static [&'static str] = &[
        "maker_fee",
        "taker_fee",
        "toxicity_alpha",
        "bot_latency_multiplier",
        "volatility_cap",
        "concentration_frac",
        "snapshot_depth_n",
        "tape_window",
        "quote_lifetime",
        "max_order_qty",
    ];

    /// Apply a whitelisted runtime parameter change. Returns `Err(())` for
    /// keys outside the whitelist or values that fail validation.
    pub fn set_param(&mut self, key: &str, value: f64) -> Result<(), ()> {
        let mut next = self.clone();
        match key {
            "maker_fee" => next.maker_fee = value,
            "taker_fee" => next.taker_fee = value,
            "toxicity_alpha" => next.toxicity_alpha = value,
            "bot_latency_multiplier" => next.bot_latency_multiplier = value,
            "volatility_cap" => next.volatility_cap = value,
            "concentration_frac" => next.concentration_frac = value,
            "snapshot_depth_n" => next.snapshot_depth_n = value as usize,
            "tape_window" => next.tape_window = value as usize,
            "quote_lifetime" => next.quote_lifetime = value as u64,
            "max_order_qty" => next.max_order_qty = value as u64,
            _ => return Err(()),
        }
        if next.validate().is_err() {
            return Err(());
        }
        *self = next;
        Ok(())
    }

    // Builder-style setters, mainly for tests.

    pub fn with_min_tick_size(mut self, tick: f64) -> Self {
        self.min_tick_size = tick;
        self
    }

    pub fn with_quote_lifetime(mut self, ticks: u64) -> Self {
        self.quote_lifetime = ticks;
        self
    }

    pub fn with_max_order_qty(mut self, qty: u64) -> Self {
        self.max_order_qty = qty;
        self
    }

    pub fn with_position_limit(mut self, limit: i64) -> Self {
        self.position_limit = limit;
        self
    }

    pub fn with_margin_threshold(mut self, threshold: f64) -> Self {
        self.margin_threshold = threshold;
        self
    }

    pub fn with_loss_limit(mut self, limit: f64) -> Self {
        self.loss_limit = limit;
        self
    }

    pub fn with_fees(mut self, maker: f64, taker: f64) -> Self {
        self.maker_fee = maker;
        self.taker_fee = taker;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        ExchangeConfig::easy().validate().unwrap();
        ExchangeConfig::medium().validate().unwrap();
        ExchangeConfig::hard().validate().unwrap();
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let raw = r#"{"min_tick_size": 0.1, "not_a_key": 1}"#;
        let parsed: Result<ExchangeConfig, _> = serde_json::from_str(raw);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let raw = r#"{"taker_fee": 0.25}"#;
        let config: ExchangeConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.taker_fee, 0.25);
        assert_eq!(config.min_tick_size, ExchangeConfig::default().min_tick_size);
    }

    #[test]
    fn test_validation_failures() {
        assert!(ExchangeConfig::default().with_min_tick_size(0.0).validate().is_err());
        assert!(ExchangeConfig::default().with_position_limit(0).validate().is_err());

        let mut bad_alpha = ExchangeConfig::default();
        bad_alpha.toxicity_alpha = 1.0;
        assert!(bad_alpha.validate().is_err());
    }

    #[test]
    fn test_set_param_whitelist() {
        let mut config = ExchangeConfig::default();
        assert!(config.set_param("taker_fee", 0.5).is_ok());
        assert_eq!(config.taker_fee, 0.5);

        // Structural keys stay fixed.
        assert!(config.set_param("min_tick_size", 1.0).is_err());
        assert!(config.set_param("position_limit", 50.0).is_err());
        assert!(config.set_param("nonsense", 1.0).is_err());

        // Values still validate.
        assert!(config.set_param("toxicity_alpha", 2.0).is_err());
        assert_eq!(config.toxicity_alpha, ExchangeConfig::default().toxicity_alpha);
    }

    #[test]
    fn test_fee_conversion() {
        let config = ExchangeConfig::default().with_fees(-0.02, 0.10);
        assert_eq!(config.taker_fee_for(Quantity(10)), Cash::from_float(1.0));
        assert_eq!(config.maker_fee_for(Quantity(10)), Cash::from_float(-0.2));
    }
}
