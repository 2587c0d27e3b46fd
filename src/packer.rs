use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::config::OptimizerConfig;
use crate::error::{OptimizeError, Result};
use crate::types::{Packing, StockBar};

/// Randomized first-fit-decreasing search over one classification.
///
/// Every trial shuffles the demand, sorts it longest first and places each
/// piece into the first open bar with room. The best trial is kept: least
/// total waste, then fewest bars, then earliest trial.
#[derive(Debug, Clone)]
pub struct Packer {
    capacity: f64,
    trials: u32,
    time_limit: Option<Duration>,
}

impl Packer {
    pub fn new(capacity: f64, trials: u32) -> Result<Self> {
        Self::from_config(&OptimizerConfig {
            bar_length: capacity,
            trials,
            time_limit_ms: None,
            seed: None,
        })
    }

    pub fn from_config(config: &OptimizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            capacity: config.bar_length,
            trials: config.trials,
            time_limit: config.time_limit(),
        })
    }

    /// Trials starting after `limit` has elapsed are skipped. The first
    /// trial always runs to completion; its cost grows with pieces × bars
    /// and is bounded only by the order size.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn trials(&self) -> u32 {
        self.trials
    }

    /// Runs the trials one after another, drawing from `rng`.
    pub fn pack<R: Rng + ?Sized>(&self, demand: &[f64], rng: &mut R) -> Result<Packing> {
        self.validate(demand)?;
        if demand.is_empty() {
            return Ok(Packing::empty(self.capacity));
        }

        let deadline = self.time_limit.map(|limit| Instant::now() + limit);
        let mut order = Vec::with_capacity(demand.len());
        let mut best = self.trial(demand, &mut order, rng);

        for trial in 1..self.trials {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                tracing::warn!(
                    completed = trial,
                    budget = self.trials,
                    "time limit reached, stopping search"
                );
                break;
            }
            let candidate = self.trial(demand, &mut order, rng);
            if is_better(&candidate, &best) {
                tracing::debug!(
                    trial,
                    waste = candidate.total_waste(),
                    bars = candidate.bar_count(),
                    "new best packing"
                );
                best = candidate;
            }
        }

        Ok(best)
    }

    /// Runs the trials on the rayon pool. Trial `i` draws from a ChaCha8
    /// stream `i` of `seed`, so the result does not depend on scheduling.
    pub fn pack_seeded(&self, demand: &[f64], seed: u64) -> Result<Packing> {
        self.validate(demand)?;
        if demand.is_empty() {
            return Ok(Packing::empty(self.capacity));
        }

        let deadline = self.time_limit.map(|limit| Instant::now() + limit);
        let skipped = AtomicU32::new(0);
        let first = (0, self.seeded_trial(demand, seed, 0));

        let best = (1..self.trials)
            .into_par_iter()
            .filter_map(|trial| {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    skipped.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
                Some((trial, self.seeded_trial(demand, seed, trial)))
            })
            .reduce_with(pick);
        let best = match best {
            Some(other) => pick(first, other),
            None => first,
        };

        let skipped = skipped.into_inner();
        if skipped > 0 {
            tracing::warn!(skipped, budget = self.trials, "time limit reached, trials skipped");
        }
        tracing::debug!(
            trial = best.0,
            waste = best.1.total_waste(),
            bars = best.1.bar_count(),
            "best packing"
        );

        Ok(best.1)
    }

    /// Places `pieces` in the given order, each into the first bar with room.
    pub fn first_fit(&self, pieces: &[f64]) -> Packing {
        let mut bars: Vec<StockBar> = Vec::new();
        for &piece in pieces {
            match bars.iter_mut().find(|bar| bar.fits(piece, self.capacity)) {
                Some(bar) => bar.place(piece),
                None => {
                    let mut bar = StockBar::new();
                    bar.place(piece);
                    bars.push(bar);
                }
            }
        }
        Packing {
            capacity: self.capacity,
            bars,
        }
    }

    fn validate(&self, demand: &[f64]) -> Result<()> {
        match demand
            .iter()
            .find(|&&length| !length.is_finite() || length <= 0.0 || length > self.capacity)
        {
            Some(&length) => Err(OptimizeError::InvalidPiece {
                length,
                capacity: self.capacity,
            }),
            None => Ok(()),
        }
    }

    fn trial<R: Rng + ?Sized>(&self, demand: &[f64], order: &mut Vec<f64>, rng: &mut R) -> Packing {
        order.clear();
        order.extend_from_slice(demand);
        order.shuffle(rng);
        // Stable sort: the shuffle only decides the order among equal lengths.
        order.sort_by(|a, b| b.total_cmp(a));
        self.first_fit(order)
    }

    fn seeded_trial(&self, demand: &[f64], seed: u64, trial: u32) -> Packing {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(trial as u64);
        let mut order = Vec::with_capacity(demand.len());
        self.trial(demand, &mut order, &mut rng)
    }
}

/// True when `candidate` should replace `best`: strictly less waste, or
/// equal waste on strictly fewer bars.
pub fn is_better(candidate: &Packing, best: &Packing) -> bool {
    let candidate_waste = candidate.total_waste();
    let best_waste = best.total_waste();
    candidate_waste < best_waste
        || (candidate_waste == best_waste && candidate.bar_count() < best.bar_count())
}

fn pick(a: (u32, Packing), b: (u32, Packing)) -> (u32, Packing) {
    let b_wins = if is_better(&b.1, &a.1) {
        true
    } else if is_better(&a.1, &b.1) {
        false
    } else {
        b.0 < a.0
    };
    if b_wins { b } else { a }
}
