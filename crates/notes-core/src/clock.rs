//! Time and index-suffix sources.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use rand::Rng;

/// Lowest suffix handed out for a note index.
pub const MIN_SUFFIX: u8 = 10;
/// Highest suffix handed out for a note index.
pub const MAX_SUFFIX: u8 = 99;

/// Supplies the current time in unix seconds (UTC).
pub trait Clock {
    fn now(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// A clock pinned to a settable instant.
#[derive(Debug, Default)]
pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Supplies the two-digit suffix that disambiguates same-second indexes.
pub trait SuffixSource {
    /// A value in `MIN_SUFFIX..=MAX_SUFFIX`.
    fn next_suffix(&self) -> u8;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngSuffix;

impl SuffixSource for ThreadRngSuffix {
    fn next_suffix(&self) -> u8 {
        rand::thread_rng().gen_range(MIN_SUFFIX..=MAX_SUFFIX)
    }
}

/// Replays a fixed sequence of suffixes, then repeats the last one.
///
/// Values outside the two-digit range are clamped into it.
#[derive(Debug)]
pub struct ScriptedSuffix {
    queue: Mutex<VecDeque<u8>>,
    last: Mutex<u8>,
}

impl ScriptedSuffix {
    pub fn new(suffixes: &[u8]) -> Self {
        Self {
            queue: Mutex::new(suffixes.iter().copied().collect()),
            last: Mutex::new(MIN_SUFFIX),
        }
    }
}

impl SuffixSource for ScriptedSuffix {
    fn next_suffix(&self) -> u8 {
        let next = match self.queue.lock() {
            Ok(mut guard) => guard.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(value) = next {
            *last = value.clamp(MIN_SUFFIX, MAX_SUFFIX);
        }
        *last
    }
}
