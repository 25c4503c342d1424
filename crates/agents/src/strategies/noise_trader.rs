//! Noise trader: random liquidity demand plus wide resting quotes.

use rand::Rng;
use rand::rngs::StdRng;
use smallvec::smallvec;
use types::{Quantity, Side};

use crate::traits::{BotView, Decision, IocRequest, QuoteRequest, Strategy};

#[derive(Debug, Clone)]
pub struct NoiseTraderConfig {
    pub quote_size: u64,
    /// Chance per consultation of wanting immediate liquidity.
    pub activity: f64,
    /// Chance the liquidity urge is acted on.
    pub aggression: f64,
}

impl Default for NoiseTraderConfig {
    fn default() -> Self {
        Self { quote_size: 1, activity: 0.3, aggression: 0.5 }
    }
}

pub struct NoiseTrader {
    config: NoiseTraderConfig,
}

impl NoiseTrader {
    pub fn new(config: NoiseTraderConfig) -> Self {
        Self { config }
    }
}

impl Strategy for NoiseTrader {
    fn decide(&mut self, view: &BotView<'_>, rng: &mut StdRng) -> Decision {
        let mut ioc = smallvec![];
        if rng.random_bool(self.config.activity) && rng.random_bool(self.config.aggression) {
            if rng.random_bool(0.5) && view.position < view.position_limit {
                ioc.push(IocRequest { side: Side::Bid, qty: Quantity(1) });
            } else if view.position > -view.position_limit {
                ioc.push(IocRequest { side: Side::Ask, qty: Quantity(1) });
            }
        }

        // Wide quotes so retail flow never dominates the inside market.
        let vol = view.volatility.max(0.25);
        let spread = 3.5 + 0.8 * vol;
        let qty = Quantity(self.config.quote_size);

        let mut quotes = smallvec![];
        if view.position < view.position_limit {
            quotes.push(QuoteRequest {
                side: Side::Bid,
                price: view.snap(view.fair_value - spread / 2.0),
                qty,
                expires_at: None,
            });
        }
        if view.position > -view.position_limit {
            quotes.push(QuoteRequest {
                side: Side::Ask,
                price: view.snap(view.fair_value + spread / 2.0),
                qty,
                expires_at: None,
            });
        }

        Decision { cancels: view.open_orders.to_vec(), quotes, ioc }
    }

    fn name(&self) -> &str {
        "noise-trader"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use types::{Cash, Price};

    fn view(position: i64) -> BotView<'static> {
        BotView {
            now: 1,
            bids: &[],
            asks: &[],
            tape: &[],
            fair_value: 100.0,
            uncertainty: 0.0,
            volatility: 1.0,
            position,
            pnl: Cash::ZERO,
            toxicity: 0.0,
            user_toxicity: 0.0,
            open_orders: &[],
            position_limit: 2,
            tick_size: Price::from_float(0.1),
        }
    }

    #[test]
    fn test_quotes_are_wide() {
        let mut bot = NoiseTrader::new(NoiseTraderConfig::default());
        let mut rng = StdRng::seed_from_u64(7);
        let d = bot.decide(&view(0), &mut rng);
        let bid = d.quotes.iter().find(|q| q.side == Side::Bid).unwrap();
        let ask = d.quotes.iter().find(|q| q.side == Side::Ask).unwrap();
        assert!((ask.price - bid.price).to_float() >= 3.5);
    }

    #[test]
    fn test_eventually_takes_liquidity() {
        let config = NoiseTraderConfig { activity: 1.0, aggression: 1.0, quote_size: 1 };
        let mut bot = NoiseTrader::new(config);
        let mut rng = StdRng::seed_from_u64(7);
        let d = bot.decide(&view(0), &mut rng);
        assert_eq!(d.ioc.len(), 1);
    }

    #[test]
    fn test_respects_position_limits() {
        let config = NoiseTraderConfig { activity: 1.0, aggression: 1.0, quote_size: 1 };
        let mut bot = NoiseTrader::new(config);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let d = bot.decide(&view(2), &mut rng);
            // Pinned long: never buys, bid quote suppressed.
            assert!(d.ioc.iter().all(|i| i.side == Side::Ask));
            assert!(d.quotes.iter().all(|q| q.side == Side::Ask));
        }
    }
}
