//! Artificial latency and failure injection used to produce realistic telemetry.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

use crate::config::LatencyRange;

/// Source of randomness for simulation draws and booking defaults.
pub trait RandomSource: Send + Sync {
    /// Uniform draw in `[0, 1)`.
    fn unit(&self) -> f64;

    /// Uniform integer in `[low, high]`.
    fn between(&self, low: u64, high: u64) -> u64;
}

/// Per-thread OS-seeded generator; every draw is independent.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn unit(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }

    fn between(&self, low: u64, high: u64) -> u64 {
        if low >= high {
            return low;
        }
        rand::thread_rng().gen_range(low..=high)
    }
}

/// Reproducible generator for load tests and fixed-seed runs.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn unit(&self) -> f64 {
        self.rng.lock().gen::<f64>()
    }

    fn between(&self, low: u64, high: u64) -> u64 {
        if low >= high {
            return low;
        }
        self.rng.lock().gen_range(low..=high)
    }
}

/// Suspends the current request for a random duration within `range`.
pub async fn simulate_latency(random: &dyn RandomSource, range: LatencyRange) -> Duration {
    let delay = Duration::from_millis(random.between(range.min_ms, range.max_ms));
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    delay
}

/// One independent draw: true with probability `probability`.
pub fn draw_failure(random: &dyn RandomSource, probability: f64) -> bool {
    random.unit() < probability
}

/// Picks one element uniformly.
pub fn choose<'a>(random: &dyn RandomSource, options: &[&'a str]) -> Option<&'a str> {
    if options.is_empty() {
        return None;
    }
    let index = random.between(0, options.len() as u64 - 1) as usize;
    options.get(index).copied()
}
