use crate::{rng, SplitMix64};

/// Per-tick inputs shared by every node run during one `update`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickContext {
    pub tick: u64,
    pub dt_seconds: f32,
    pub seed: u64,
}

impl TickContext {
    pub fn new(tick: u64, dt_seconds: f32) -> Self {
        Self {
            tick,
            dt_seconds,
            seed: 0,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Deterministic RNG for one consumer (`scope`, `stream`) on this tick.
    pub fn rng_for(&self, scope: u64, stream: u64) -> SplitMix64 {
        let seed = rng::derive_seed(self.seed ^ rng::mix64(self.tick), scope, stream);
        SplitMix64::new(seed)
    }
}
