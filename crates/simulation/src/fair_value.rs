//! Session fair-value schedule.
//!
//! The "true" price of the instrument is the settlement sum of hidden
//! components drawn once from the session RNG. Components reveal on a
//! fixed cadence; between reveals, fair value is the revealed sum plus
//! the expected value of what remains, and uncertainty is the standard
//! deviation of the unrevealed remainder. Both are pure functions of
//! (seed, tick).

use rand::Rng;
use rand::rngs::StdRng;
use types::Tick;

/// Hidden components per session.
const COMPONENT_COUNT: usize = 8;
/// Ticks between reveals.
const REVEAL_INTERVAL: Tick = 64;
/// Mean of a uniform 0..=9 component.
const COMPONENT_MEAN: f64 = 4.5;
/// Variance of a uniform 0..=9 component.
const COMPONENT_VARIANCE: f64 = 8.25;
/// Price units per component point.
const SCALE: f64 = 2.5;

#[derive(Debug, Clone)]
pub struct FairValueSchedule {
    components: Vec<u8>,
}

impl FairValueSchedule {
    /// Draw the session's hidden components from the seeded RNG.
    pub fn draw(rng: &mut StdRng) -> Self {
        let components = (0..COMPONENT_COUNT).map(|_| rng.random_range(0..=9)).collect();
        Self { components }
    }

    fn revealed(&self, now: Tick) -> usize {
        ((now / REVEAL_INTERVAL) as usize).min(self.components.len())
    }

    /// Fair value at `now`: revealed sum plus expectation of the rest.
    pub fn fair_value(&self, now: Tick) -> f64 {
        let revealed = self.revealed(now);
        let known: u32 = self.components[..revealed].iter().map(|&c| c as u32).sum();
        let unknown = (self.components.len() - revealed) as f64;
        SCALE * (known as f64 + unknown * COMPONENT_MEAN)
    }

    /// Standard deviation of the unrevealed remainder at `now`.
    pub fn uncertainty(&self, now: Tick) -> f64 {
        let unknown = (self.components.len() - self.revealed(now)) as f64;
        SCALE * (unknown * COMPONENT_VARIANCE).sqrt()
    }

    /// The fully revealed settlement value.
    pub fn settlement(&self) -> f64 {
        let total: u32 = self.components.iter().map(|&c| c as u32).sum();
        SCALE * total as f64
    }
}
