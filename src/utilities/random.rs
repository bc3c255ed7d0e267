//! Injectable randomness.
//!
//! Every random decision in the relay (amnesia, emoji picks, meow synthesis,
//! stream jitter) goes through [`RandomSource`] so tests can replay fixed
//! sequences.

use std::fmt;
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A source of uniform random numbers.
pub trait RandomSource: Send + Sync + fmt::Debug {
    /// A value uniformly distributed in `[0, 1)`.
    fn unit(&self) -> f64;

    /// A uniform index in `0..len`. `len` must be non-zero.
    fn index(&self, len: usize) -> usize {
        debug_assert!(len > 0, "index() called with empty range");
        let idx = (self.unit() * len as f64) as usize;
        idx.min(len.saturating_sub(1))
    }

    /// `true` with probability `p`. `p <= 0` never fires, `p >= 1` always does.
    fn chance(&self, p: f64) -> bool {
        if p <= 0.0 {
            return false;
        }
        if p >= 1.0 {
            return true;
        }
        self.unit() < p
    }

    /// A value uniformly distributed in `[0, max)`.
    fn up_to(&self, max: f64) -> f64 {
        self.unit() * max
    }
}

/// Pick one element uniformly.
pub fn choose<'a, T>(rng: &dyn RandomSource, items: &'a [T]) -> &'a T {
    &items[rng.index(items.len())]
}

/// Pick `count` distinct elements, in draw order.
pub fn choose_distinct<'a, T>(rng: &dyn RandomSource, items: &'a [T], count: usize) -> Vec<&'a T> {
    let mut pool: Vec<&T> = items.iter().collect();
    let mut picked = Vec::with_capacity(count.min(pool.len()));
    while picked.len() < count && !pool.is_empty() {
        let idx = rng.index(pool.len());
        picked.push(pool.swap_remove(idx));
    }
    picked
}

/// [`RandomSource`] backed by a seeded `StdRng`.
pub struct ThreadRandom {
    rng: Mutex<StdRng>,
}

impl ThreadRandom {
    /// Seed from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible sequence.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for ThreadRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ThreadRandom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadRandom").finish_non_exhaustive()
    }
}

impl RandomSource for ThreadRandom {
    fn unit(&self) -> f64 {
        self.rng.lock().gen::<f64>()
    }
}

/// [`RandomSource`] that cycles through a fixed list of unit values.
#[cfg(test)]
#[derive(Debug)]
pub struct ScriptedRandom {
    values: Vec<f64>,
    cursor: AtomicUsize,
}

#[cfg(test)]
impl ScriptedRandom {
    /// Values are clamped into `[0, 1)`. An empty list behaves like `[0.0]`.
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        let mut values: Vec<f64> = values
            .into()
            .into_iter()
            .map(|v| v.clamp(0.0, 1.0 - f64::EPSILON))
            .collect();
        if values.is_empty() {
            values.push(0.0);
        }
        Self {
            values,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Always returns the same value.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }

    /// Number of values drawn so far.
    pub fn draws(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
impl RandomSource for ScriptedRandom {
    fn unit(&self) -> f64 {
        let n = self.cursor.fetch_add(1, Ordering::SeqCst);
        self.values[n % self.values.len()]
    }
}
