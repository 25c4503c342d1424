//! The standard strategy set: passive market making, momentum taking,
//! fair-value arbitrage, and noise flow.

mod arbitrageur;
mod market_maker;
mod momentum;
mod noise_trader;

pub use arbitrageur::{Arbitrageur, ArbitrageurConfig};
pub use market_maker::{MarketMaker, MarketMakerConfig};
pub use momentum::{Momentum, MomentumConfig};
pub use noise_trader::{NoiseTrader, NoiseTraderConfig};

/// Exponentially weighted mean, seeded by the first observation.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Ewma {
    alpha: f64,
    value: Option<f64>,
}

impl Ewma {
    pub(crate) fn new(alpha: f64) -> Self {
        Self { alpha, value: None }
    }

    pub(crate) fn update(&mut self, x: f64) -> f64 {
        let next = match self.value {
            None => x,
            Some(v) => self.alpha * x + (1.0 - self.alpha) * v,
        };
        self.value = Some(next);
        next
    }
}
