use std::ops::RangeInclusive;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

/// Lower bound of the base offset.
pub const MIN: i32 = -0x10000;
/// Upper bound of the base offset (inclusive).
pub const MAX: i32 = 0x10000;
/// Divisors the offset is scaled by.
pub const DIVISORS: RangeInclusive<u32> = 2..=12;

/// The individual draws behind one generated value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Draw {
    pub divisor: u32,
    pub offset: i32,
    pub value: f64,
}

/// Scaled pseudo-random values rounded to two decimals.
///
/// The randomizer owns its generator. Seed it from the clock with
/// [`Randomizer::new`] / [`Randomizer::init`], or with a fixed seed for
/// reproducible sequences.
#[derive(Debug, Clone)]
pub struct Randomizer<R = StdRng> {
    rng: R,
}

impl Default for Randomizer<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng + SeedableRng> Randomizer<R> {
    pub fn new() -> Self {
        Self::from_seed(clock_seed())
    }

    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: R::seed_from_u64(seed),
        }
    }

    /// Reseed from the wall clock. Calling it again restarts the sequence
    /// from the new seed.
    pub fn init(&mut self) {
        self.reseed(clock_seed());
    }

    pub fn reseed(&mut self, seed: u64) {
        trace!(seed, "reseeding randomizer");
        self.rng = R::seed_from_u64(seed);
    }
}

impl<R: Rng> Randomizer<R> {
    pub fn from_rng(rng: R) -> Self {
        Self { rng }
    }

    pub fn draw(&mut self) -> Draw {
        let divisor = self.rng.gen_range(DIVISORS);
        let offset = self.rng.gen_range(MIN..=MAX);
        let value = round_cents(f64::from(offset) / f64::from(divisor));
        trace!(divisor, offset, value, "draw");
        Draw {
            divisor,
            offset,
            value,
        }
    }

    pub fn gen(&mut self) -> f64 {
        self.draw().value
    }
}

/// Round to two decimal places, ties away from zero.
#[must_use]
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Seconds since the Unix epoch.
pub fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
