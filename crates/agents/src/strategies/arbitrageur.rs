//! Fair-value arbitrageur.
//!
//! Compares the book mid against the session fair value; when the market
//! is wrong by more than an uncertainty-scaled edge it hits the book with
//! an IOC to correct it. Rests quotes near fair value otherwise.

use rand::Rng;
use rand::rngs::StdRng;
use smallvec::smallvec;
use types::{Quantity, Side};

use crate::traits::{BotView, Decision, IocRequest, QuoteRequest, Strategy};

#[derive(Debug, Clone)]
pub struct ArbitrageurConfig {
    pub quote_size: u64,
    /// Probability of firing when an edge is found.
    pub aggression: f64,
}

impl Default for ArbitrageurConfig {
    fn default() -> Self {
        Self { quote_size: 1, aggression: 0.55 }
    }
}

pub struct Arbitrageur {
    config: ArbitrageurConfig,
}

impl Arbitrageur {
    pub fn new(config: ArbitrageurConfig) -> Self {
        Self { config }
    }
}

impl Strategy for Arbitrageur {
    fn decide(&mut self, view: &BotView<'_>, rng: &mut StdRng) -> Decision {
        let Some(mid) = view.mid() else {
            return Decision::none();
        };
        let mid = mid.to_float();
        let vol = view.volatility.max(0.25);

        // Required mispricing before entry; a noisy fair value needs more.
        let edge = (0.9 * vol + 0.25 * view.uncertainty).max(0.8);

        let mut ioc = smallvec![];
        if mid < view.fair_value - edge
            && view.position < view.position_limit
            && rng.random_bool(self.config.aggression)
        {
            ioc.push(IocRequest { side: Side::Bid, qty: Quantity(1) });
        } else if mid > view.fair_value + edge
            && view.position > -view.position_limit
            && rng.random_bool(self.config.aggression)
        {
            ioc.push(IocRequest { side: Side::Ask, qty: Quantity(1) });
        }

        let spread = (1.0 + 0.7 * vol).clamp(1.0, 4.0);
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
        "arbitrageur"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use types::{BookLevel, Cash, Price};

    fn view<'a>(bids: &'a [BookLevel], asks: &'a [BookLevel], fair_value: f64) -> BotView<'a> {
        BotView {
            now: 1,
            bids,
            asks,
            tape: &[],
            fair_value,
            uncertainty: 0.0,
            volatility: 1.0,
            position: 0,
            pnl: Cash::ZERO,
            toxicity: 0.0,
            user_toxicity: 0.0,
            open_orders: &[],
            position_limit: 5,
            tick_size: Price::from_float(0.1),
        }
    }

    #[test]
    fn test_cheap_market_gets_bought() {
        let mut bot = Arbitrageur::new(ArbitrageurConfig { aggression: 1.0, quote_size: 1 });
        let mut rng = StdRng::seed_from_u64(1);
        // Mid 95 vs fair value 100: far below the edge.
        let bids = [BookLevel { price: Price::from_float(94.5), qty: Quantity(5) }];
        let asks = [BookLevel { price: Price::from_float(95.5), qty: Quantity(5) }];
        let d = bot.decide(&view(&bids, &asks, 100.0), &mut rng);
        assert!(d.ioc.iter().any(|i| i.side == Side::Bid));
    }

    #[test]
    fn test_rich_market_gets_sold() {
        let mut bot = Arbitrageur::new(ArbitrageurConfig { aggression: 1.0, quote_size: 1 });
        let mut rng = StdRng::seed_from_u64(1);
        let bids = [BookLevel { price: Price::from_float(104.5), qty: Quantity(5) }];
        let asks = [BookLevel { price: Price::from_float(105.5), qty: Quantity(5) }];
        let d = bot.decide(&view(&bids, &asks, 100.0), &mut rng);
        assert!(d.ioc.iter().any(|i| i.side == Side::Ask));
    }

    #[test]
    fn test_fairly_priced_market_left_alone() {
        let mut bot = Arbitrageur::new(ArbitrageurConfig { aggression: 1.0, quote_size: 1 });
        let mut rng = StdRng::seed_from_u64(1);
        let bids = [BookLevel { price: Price::from_float(99.5), qty: Quantity(5) }];
        let asks = [BookLevel { price: Price::from_float(100.5), qty: Quantity(5) }];
        let d = bot.decide(&view(&bids, &asks, 100.0), &mut rng);
        assert!(d.ioc.is_empty());
        assert_eq!(d.quotes.len(), 2);
    }
}
