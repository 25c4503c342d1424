//! Passive market maker.
//!
//! Always quotes two-sided around a reservation price unless pinned at a
//! position limit. Tight in calm markets; widens with volatility,
//! uncertainty, and observed toxicity, and skews the reservation price
//! against inventory so the book leans toward unwinding.

use rand::rngs::StdRng;
use smallvec::smallvec;
use types::{Price, Quantity, Side};

use crate::traits::{BotView, Decision, QuoteRequest, Strategy};

#[derive(Debug, Clone)]
pub struct MarketMakerConfig {
    /// Lots quoted per side.
    pub quote_size: u64,
    /// Higher values widen and skew harder against inventory.
    pub risk_aversion: f64,
    /// Reservation-price shift per unit of normalized inventory.
    pub inventory_skew: f64,
    /// How strongly toxicity widens the spread.
    pub toxicity_sensitivity: f64,
    /// Quotes are refreshed only after moving this many ticks.
    pub stickiness_ticks: i64,
}

impl Default for MarketMakerConfig {
    fn default() -> Self {
        Self {
            quote_size: 1,
            risk_aversion: 0.7,
            inventory_skew: 1.1,
            toxicity_sensitivity: 1.4,
            stickiness_ticks: 1,
        }
    }
}

pub struct MarketMaker {
    config: MarketMakerConfig,
    last_bid: Option<Price>,
    last_ask: Option<Price>,
}

impl MarketMaker {
    pub fn new(config: MarketMakerConfig) -> Self {
        Self { config, last_bid: None, last_ask: None }
    }

    fn moved(&self, old: Option<Price>, new: Option<Price>, threshold: Price) -> bool {
        match (old, new) {
            (None, None) => false,
            (Some(a), Some(b)) => (a - b).abs() >= threshold,
            _ => true,
        }
    }
}

impl Strategy for MarketMaker {
    fn decide(&mut self, view: &BotView<'_>, _rng: &mut StdRng) -> Decision {
        let vol = view.volatility.max(0.25);
        // Blend of the user's toxicity and our own fill quality.
        let tox = view.user_toxicity * 0.7 + view.toxicity * 0.3;
        let tox_mult = 1.0 + self.config.toxicity_sensitivity * tox * 0.12;

        let spread = ((0.9 + 1.2 * vol + 0.3 * view.uncertainty) * tox_mult).clamp(0.8, 5.0);

        // Reservation price shifted against inventory.
        let inv = view.position as f64 / view.position_limit.max(1) as f64;
        let reservation = view.fair_value
            - self.config.inventory_skew * self.config.risk_aversion * inv * vol * vol * 0.8;

        let mut bid = Some(view.snap(reservation - spread / 2.0));
        let mut ask = Some(view.snap(reservation + spread / 2.0));
        if let (Some(b), Some(a)) = (bid, ask)
            && b >= a
        {
            ask = Some(b + view.tick_size);
        }

        if view.position >= view.position_limit {
            bid = None;
        }
        if view.position <= -view.position_limit {
            ask = None;
        }

        // Don't churn the queue position for sub-threshold moves.
        let threshold = Price(view.tick_size.raw() * self.config.stickiness_ticks.max(1));
        let has_previous = self.last_bid.is_some() || self.last_ask.is_some();
        if has_previous
            && !self.moved(self.last_bid, bid, threshold)
            && !self.moved(self.last_ask, ask, threshold)
        {
            return Decision::none();
        }

        self.last_bid = bid;
        self.last_ask = ask;

        let qty = Quantity(self.config.quote_size);
        let mut decision = Decision {
            cancels: view.open_orders.to_vec(),
            quotes: smallvec![],
            ioc: smallvec![],
        };
        if let Some(price) = bid
            && price.is_positive()
        {
            decision.quotes.push(QuoteRequest { side: Side::Bid, price, qty, expires_at: None });
        }
        if let Some(price) = ask
            && price.is_positive()
        {
            decision.quotes.push(QuoteRequest { side: Side::Ask, price, qty, expires_at: None });
        }
        decision
    }

    fn name(&self) -> &str {
        "market-maker"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use types::Cash;

    fn view(position: i64, volatility: f64, user_toxicity: f64) -> BotView<'static> {
        BotView {
            now: 1,
            bids: &[],
            asks: &[],
            tape: &[],
            fair_value: 90.0,
            uncertainty: 2.0,
            volatility,
            position,
            pnl: Cash::ZERO,
            toxicity: 0.0,
            user_toxicity,
            open_orders: &[],
            position_limit: 5,
            tick_size: Price::from_float(0.1),
        }
    }

    fn quoted_spread(d: &Decision) -> f64 {
        let bid = d.quotes.iter().find(|q| q.side == Side::Bid).unwrap();
        let ask = d.quotes.iter().find(|q| q.side == Side::Ask).unwrap();
        (ask.price - bid.price).to_float()
    }

    #[test]
    fn test_two_sided_quotes_around_fair_value() {
        let mut mm = MarketMaker::new(MarketMakerConfig::default());
        let mut rng = StdRng::seed_from_u64(1);
        let d = mm.decide(&view(0, 1.0, 0.0), &mut rng);

        assert_eq!(d.quotes.len(), 2);
        let bid = d.quotes.iter().find(|q| q.side == Side::Bid).unwrap();
        let ask = d.quotes.iter().find(|q| q.side == Side::Ask).unwrap();
        assert!(bid.price.to_float() < 90.0);
        assert!(ask.price.to_float() > 90.0);
    }

    #[test]
    fn test_toxicity_widens_spread() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut calm = MarketMaker::new(MarketMakerConfig::default());
        let mut toxic = MarketMaker::new(MarketMakerConfig::default());

        let narrow = quoted_spread(&calm.decide(&view(0, 1.0, 0.0), &mut rng));
        let wide = quoted_spread(&toxic.decide(&view(0, 1.0, 0.9), &mut rng));
        assert!(wide > narrow);
    }

    #[test]
    fn test_position_limit_drops_side() {
        let mut mm = MarketMaker::new(MarketMakerConfig::default());
        let mut rng = StdRng::seed_from_u64(1);
        let d = mm.decide(&view(5, 1.0, 0.0), &mut rng);
        assert!(d.quotes.iter().all(|q| q.side == Side::Ask));
    }

    #[test]
    fn test_sticky_quotes_do_not_churn() {
        let mut mm = MarketMaker::new(MarketMakerConfig::default());
        let mut rng = StdRng::seed_from_u64(1);
        let first = mm.decide(&view(0, 1.0, 0.0), &mut rng);
        assert!(!first.quotes.is_empty());
        // Identical view: quotes unchanged, nothing republished.
        let second = mm.decide(&view(0, 1.0, 0.0), &mut rng);
        assert!(second.is_empty());
    }

    #[test]
    fn test_inventory_skews_reservation_down_when_long() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut flat = MarketMaker::new(MarketMakerConfig::default());
        let mut long = MarketMaker::new(MarketMakerConfig::default());

        let d_flat = flat.decide(&view(0, 2.0, 0.0), &mut rng);
        let d_long = long.decide(&view(4, 2.0, 0.0), &mut rng);
        let ask_flat = d_flat.quotes.iter().find(|q| q.side == Side::Ask).unwrap();
        let ask_long = d_long.quotes.iter().find(|q| q.side == Side::Ask).unwrap();
        // Long inventory lowers the ask to attract unwinding flow.
        assert!(ask_long.price < ask_flat.price);
    }
}
