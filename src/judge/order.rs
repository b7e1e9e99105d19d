//! Presentation-order sources for the pairwise judge.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::types::Presentation;

/// Decides, per example, which candidate the judge sees as "A".
pub trait OrderSource: Send {
    fn next_presentation(&mut self) -> Presentation;
}

/// Fair coin flip from an explicit RNG.
#[derive(Debug, Clone)]
pub struct RngOrder<R> {
    rng: R,
}

impl<R: Rng + Send> RngOrder<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngOrder<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng + Send> OrderSource for RngOrder<R> {
    fn next_presentation(&mut self) -> Presentation {
        if self.rng.gen::<f64>() < 0.5 {
            Presentation::BaselineFirst
        } else {
            Presentation::ConciseFirst
        }
    }
}

/// Replays a fixed sequence, cycling when exhausted.
#[derive(Debug, Clone)]
pub struct FixedOrder {
    sequence: Vec<Presentation>,
    next: usize,
}

impl FixedOrder {
    /// `None` for an empty sequence.
    pub fn new(sequence: Vec<Presentation>) -> Option<Self> {
        if sequence.is_empty() {
            return None;
        }
        Some(Self { sequence, next: 0 })
    }

    pub fn always(presentation: Presentation) -> Self {
        Self {
            sequence: vec![presentation],
            next: 0,
        }
    }
}

impl OrderSource for FixedOrder {
    fn next_presentation(&mut self) -> Presentation {
        let p = self.sequence[self.next % self.sequence.len()];
        self.next += 1;
        p
    }
}
