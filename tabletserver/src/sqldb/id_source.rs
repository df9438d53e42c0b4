//! Identifier source abstraction for deterministic testing.
//!
//! Connection and driver identifiers come from an `IdSource`, so production
//! code can draw random ids while tests use a counter or a seeded generator.

use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicI64, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Abstraction over identifier generation.
///
/// Implementations must be safe to call from connections created
/// concurrently and must not hand out negative ids.
pub trait IdSource: Send + Sync {
    /// Produce the next identifier.
    fn next_id(&self) -> i64;
}

/// Random non-negative 63-bit ids from the thread-local generator.
///
/// This is the default used outside of tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdSource;

impl IdSource for RandomIdSource {
    fn next_id(&self) -> i64 {
        rand::rng().random_range(0..=i64::MAX)
    }
}

/// Random ids from a seeded generator; the same seed yields the same ids.
#[derive(Debug)]
pub struct SeededIdSource {
    rng: Mutex<StdRng>,
}

impl SeededIdSource {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl IdSource for SeededIdSource {
    fn next_id(&self) -> i64 {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .random_range(0..=i64::MAX)
    }
}

/// Monotonically increasing ids starting at a chosen value.
#[derive(Debug)]
pub struct SequentialIdSource {
    next: AtomicI64,
}

impl SequentialIdSource {
    #[must_use]
    pub const fn starting_at(first: i64) -> Self {
        Self {
            next: AtomicI64::new(first),
        }
    }
}

impl Default for SequentialIdSource {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdSource for SequentialIdSource {
    fn next_id(&self) -> i64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}
