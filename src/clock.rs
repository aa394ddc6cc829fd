/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Source of time for round deadlines and transaction timestamps.
//!
//! The consensus core never sleeps to wait for a deadline. It stores deadlines as [`Instant`]s read from
//! a [`Clock`] and compares them against the clock whenever it is [ticked](crate::sumeragi::Sumeragi::on_tick).
//! Swapping [`SystemClock`] for a [`ManualClock`] therefore makes round timing fully controllable.

use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant, SystemTime},
};

use crate::types::data_types::Timestamp;

pub trait Clock: Send + Sync {
    /// Monotonic time, used for deadlines.
    fn now(&self) -> Instant;

    /// Wall-clock time, used for `created_at` fields and timestamp acceptance windows.
    fn timestamp(&self) -> Timestamp;
}

#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn timestamp(&self) -> Timestamp {
        Timestamp::from_system_time(SystemTime::now())
    }
}

/// A clock that only moves when [`advance`](ManualClock::advance) is called. Clones share the same time.
#[derive(Clone)]
pub struct ManualClock {
    elapsed: Arc<Mutex<Duration>>,
    start_instant: Instant,
    start_timestamp: Timestamp,
}

impl ManualClock {
    pub fn new(start_timestamp: Timestamp) -> ManualClock {
        ManualClock {
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
            start_instant: Instant::now(),
            start_timestamp,
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut elapsed = self
            .elapsed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *elapsed += duration;
    }

    fn elapsed(&self) -> Duration {
        *self
            .elapsed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start_instant + self.elapsed()
    }

    fn timestamp(&self) -> Timestamp {
        self.start_timestamp.saturating_add(self.elapsed())
    }
}
