//! Momentum taker.
//!
//! Watches the mid through a fast/slow EMA pair and the tape for
//! aggressive flow imbalance; when both agree it takes liquidity with an
//! IOC. Rests leaning quotes otherwise so it stays present in the book.

use rand::Rng;
use rand::rngs::StdRng;
use smallvec::smallvec;
use types::{Quantity, Side};

use crate::strategies::Ewma;
use crate::traits::{BotView, Decision, IocRequest, QuoteRequest, Strategy};

/// Tape prints considered for the flow imbalance signal.
const FLOW_LOOKBACK: usize = 12;

#[derive(Debug, Clone)]
pub struct MomentumConfig {
    pub quote_size: u64,
    /// Probability of firing when the signal triggers.
    pub aggression: f64,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self { quote_size: 1, aggression: 0.4 }
    }
}

pub struct Momentum {
    config: MomentumConfig,
    fast: Ewma,
    slow: Ewma,
}

impl Momentum {
    pub fn new(config: MomentumConfig) -> Self {
        Self {
            config,
            fast: Ewma::new(0.35),
            slow: Ewma::new(0.08),
        }
    }
}

impl Strategy for Momentum {
    fn decide(&mut self, view: &BotView<'_>, rng: &mut StdRng) -> Decision {
        let Some(mid) = view.mid() else {
            return Decision::none();
        };

        let fast = self.fast.update(mid.to_float());
        let slow = self.slow.update(mid.to_float());
        let trend = fast - slow;

        // Signed aggressive flow: positive when buyers are lifting.
        let flow: f64 = view
            .tape
            .iter()
            .rev()
            .take(FLOW_LOOKBACK)
            .map(|p| match p.aggressor_side {
                Side::Bid => p.qty.raw() as f64,
                Side::Ask => -(p.qty.raw() as f64),
            })
            .sum();

        let vol = view.volatility.max(0.25);
        let trend_threshold = 0.25 * vol;
        let flow_threshold = 2.0;

        let mut ioc = smallvec![];
        if view.position < view.position_limit
            && trend > trend_threshold
            && flow > flow_threshold
            && rng.random_bool(self.config.aggression)
        {
            ioc.push(IocRequest { side: Side::Bid, qty: Quantity(1) });
        }
        if view.position > -view.position_limit
            && trend < -trend_threshold
            && flow < -flow_threshold
            && rng.random_bool(self.config.aggression)
        {
            ioc.push(IocRequest { side: Side::Ask, qty: Quantity(1) });
        }

        // Lean the passive quotes toward the trend.
        let spread = (1.2 + 0.9 * vol).clamp(1.0, 4.0);
        let lean = (trend / (2.0 * trend_threshold)).clamp(-1.0, 1.0) * 0.25 * spread;
        let qty = Quantity(self.config.quote_size);

        let mut quotes = smallvec![];
        if view.position < view.position_limit {
            quotes.push(QuoteRequest {
                side: Side::Bid,
                price: view.snap(view.fair_value - spread / 2.0 + lean),
                qty,
                expires_at: None,
            });
        }
        if view.position > -view.position_limit {
            quotes.push(QuoteRequest {
                side: Side::Ask,
                price: view.snap(view.fair_value + spread / 2.0 + lean),
                qty,
                expires_at: None,
            });
        }

        Decision { cancels: view.open_orders.to_vec(), quotes, ioc }
    }

    fn name(&self) -> &str {
        "momentum"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use types::{BookLevel, Cash, Price, TradePrint};

    fn levels(bid: f64, ask: f64) -> ([BookLevel; 1], [BookLevel; 1]) {
        (
            [BookLevel { price: Price::from_float(bid), qty: Quantity(10) }],
            [BookLevel { price: Price::from_float(ask), qty: Quantity(10) }],
        )
    }

    fn view<'a>(
        bids: &'a [BookLevel],
        asks: &'a [BookLevel],
        tape: &'a [TradePrint],
    ) -> BotView<'a> {
        BotView {
            now: 1,
            bids,
            asks,
            tape,
            fair_value: 100.0,
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
    fn test_empty_book_no_decision() {
        let mut bot = Momentum::new(MomentumConfig::default());
        let mut rng = StdRng::seed_from_u64(1);
        let v = view(&[], &[], &[]);
        assert!(bot.decide(&v, &mut rng).is_empty());
    }

    #[test]
    fn test_uptrend_with_buy_flow_fires_buy_ioc() {
        let config = MomentumConfig { aggression: 1.0, ..Default::default() };
        let mut bot = Momentum::new(config);
        let mut rng = StdRng::seed_from_u64(1);

        // Feed a rising mid so fast EMA pulls above slow.
        for step in 0..20 {
            let mid = 100.0 + step as f64;
            let (bids, asks) = levels(mid - 0.5, mid + 0.5);
            let tape: Vec<TradePrint> = (0..6)
                .map(|i| TradePrint {
                    price: Price::from_float(mid),
                    qty: Quantity(2),
                    aggressor_side: Side::Bid,
                    tick: i,
                })
                .collect();
            let v = view(&bids, &asks, &tape);
            let d = bot.decide(&v, &mut rng);
            if d.ioc.iter().any(|i| i.side == Side::Bid) {
                return;
            }
        }
        panic!("buy IOC never fired on a strong uptrend with buy flow");
    }

    #[test]
    fn test_quotes_lean_and_rest_both_sides_when_flat() {
        let mut bot = Momentum::new(MomentumConfig::default());
        let mut rng = StdRng::seed_from_u64(1);
        let (bids, asks) = levels(99.5, 100.5);
        let v = view(&bids, &asks, &[]);
        let d = bot.decide(&v, &mut rng);
        assert_eq!(d.quotes.len(), 2);
    }
}
