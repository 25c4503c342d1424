//! Bot registration and latency gating.
//!
//! Roster order is fixed at registration and is part of the deterministic
//! contract: bots are consulted in this order every tick, and their
//! latency jitter draws come from the session RNG in the same order.

use rand::Rng;
use rand::rngs::StdRng;
use types::{Tick, TraderId};

use crate::traits::{BotView, Decision, Strategy};
use crate::strategies::{
    Arbitrageur, ArbitrageurConfig, MarketMaker, MarketMakerConfig, Momentum, MomentumConfig,
    NoiseTrader, NoiseTraderConfig,
};

/// A registered bot: its identity, latency gate, and strategy.
pub struct BotHandle {
    trader_id: TraderId,
    name: String,
    /// Ticks between consultations before jitter and scaling.
    base_latency: u64,
    /// Upper bound of the uniform jitter added per reschedule.
    jitter: u64,
    next_action_tick: Tick,
}

/// `BotHandle` plus its boxed strategy. Split so the simulator can borrow
/// the gate and the strategy independently.
pub struct Bot {
    pub handle: BotHandle,
    pub strategy: Box<dyn Strategy>,
}

impl BotHandle {
    pub fn trader_id(&self) -> TraderId {
        self.trader_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the latency gate opens at `now`.
    pub fn ready(&self, now: Tick) -> bool {
        now >= self.next_action_tick
    }

    /// Close the gate until `now + base * multiplier + uniform(0..=jitter)`.
    pub fn reschedule(&mut self, now: Tick, latency_multiplier: f64, rng: &mut StdRng) {
        let base = ((self.base_latency as f64) * latency_multiplier).round().max(1.0) as u64;
        let jitter = if self.jitter > 0 {
            rng.random_range(0..=self.jitter)
        } else {
            0
        };
        self.next_action_tick = now + base + jitter;
    }
}

impl Bot {
    pub fn new(
        trader_id: TraderId,
        name: impl Into<String>,
        base_latency: u64,
        jitter: u64,
        strategy: Box<dyn Strategy>,
    ) -> Self {
        Self {
            handle: BotHandle {
                trader_id,
                name: name.into(),
                base_latency,
                jitter,
                next_action_tick: 0,
            },
            strategy,
        }
    }

    /// Run the strategy and close the gate in one step.
    pub fn consult(
        &mut self,
        view: &BotView<'_>,
        latency_multiplier: f64,
        rng: &mut StdRng,
    ) -> Decision {
        let decision = self.strategy.decide(view, rng);
        self.handle.reschedule(view.now, latency_multiplier, rng);
        decision
    }
}

/// Build the standard bot ecosystem. Trader ids are assigned sequentially
/// from `first_id`; id 0 is reserved for the human user.
///
/// Market makers are fastest, arbitrageurs close behind, momentum traders
/// slower, and retail noise slowest — the same speed hierarchy as a real
/// venue.
pub fn standard_roster(first_id: u64) -> Vec<Bot> {
    let mut bots = Vec::new();
    let mut id = first_id;
    let mut next_id = || {
        let t = TraderId(id);
        id += 1;
        t
    };

    for i in 0..3 {
        bots.push(Bot::new(
            next_id(),
            format!("mm-{}", i + 1),
            2,
            1,
            Box::new(MarketMaker::new(MarketMakerConfig::default())),
        ));
    }
    for i in 0..2 {
        bots.push(Bot::new(
            next_id(),
            format!("arb-{}", i + 1),
            3,
            1,
            Box::new(Arbitrageur::new(ArbitrageurConfig::default())),
        ));
    }
    for i in 0..3 {
        bots.push(Bot::new(
            next_id(),
            format!("trend-{}", i + 1),
            4,
            2,
            Box::new(Momentum::new(MomentumConfig::default())),
        ));
    }
    for i in 0..6 {
        bots.push(Bot::new(
            next_id(),
            format!("retail-{}", i + 1),
            8,
            4,
            Box::new(NoiseTrader::new(NoiseTraderConfig::default())),
        ));
    }

    bots
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_roster_ids_sequential_and_named() {
        let bots = standard_roster(1);
        assert_eq!(bots.len(), 14);
        for (i, bot) in bots.iter().enumerate() {
            assert_eq!(bot.handle.trader_id(), TraderId(i as u64 + 1));
        }
        assert_eq!(bots[0].handle.name(), "mm-1");
        assert_eq!(bots[13].handle.name(), "retail-6");
    }

    #[test]
    fn test_latency_gate() {
        let mut bots = standard_roster(1);
        let bot = &mut bots[0];
        let mut rng = StdRng::seed_from_u64(3);

        // Gate starts open.
        assert!(bot.handle.ready(1));
        bot.handle.reschedule(1, 1.0, &mut rng);
        // base 2 + jitter in 0..=1: closed at the next tick at least.
        assert!(!bot.handle.ready(2));
        assert!(bot.handle.ready(1 + 2 + 1));
    }

    #[test]
    fn test_latency_multiplier_slows_bots() {
        let mut bots = standard_roster(1);
        let bot = &mut bots[0];
        let mut rng = StdRng::seed_from_u64(3);
        bot.handle.reschedule(10, 10.0, &mut rng);
        // base 2 * 10 = 20 ticks minimum.
        assert!(!bot.handle.ready(29));
    }

    #[test]
    fn test_reschedule_deterministic_for_seed() {
        let draw = |seed: u64| {
            let mut bots = standard_roster(1);
            let mut rng = StdRng::seed_from_u64(seed);
            bots.iter_mut()
                .map(|b| {
                    b.handle.reschedule(5, 1.0, &mut rng);
                    b.handle.next_action_tick
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(42), draw(42));
        assert_ne!(draw(42), draw(43));
    }
}
