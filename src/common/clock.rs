//! Clock abstraction for time-based exits
//!
//! The evaluation path never calls `Local::now()` directly; it asks an injected
//! [`Clock`] so the same code runs against a live feed and a replay.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of exchange-local "now"
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Wall clock, optionally pinned to a fixed exchange offset
#[derive(Debug, Clone, Default)]
pub struct SystemClock {
    offset: Option<FixedOffset>,
}

impl SystemClock {
    /// Wall clock in the host's local zone
    pub fn local() -> Self {
        Self { offset: None }
    }

    /// Wall clock in a fixed exchange zone (e.g. +05:30)
    pub fn with_offset(offset: FixedOffset) -> Self {
        Self {
            offset: Some(offset),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        match self.offset {
            Some(offset) => Utc::now().with_timezone(&offset).naive_local(),
            None => Local::now().naive_local(),
        }
    }
}

/// Manually advanced clock for replay and tests
///
/// Stored as epoch milliseconds in an atomic so the tick path reads it without
/// locking.
#[derive(Debug)]
pub struct SimulatedClock {
    millis: AtomicI64,
}

impl SimulatedClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            millis: AtomicI64::new(start.and_utc().timestamp_millis()),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        self.millis
            .store(now.and_utc().timestamp_millis(), Ordering::Release);
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.millis
            .fetch_add(by.num_milliseconds(), Ordering::AcqRel);
    }
}

impl Clock for SimulatedClock {
    fn now(&self) -> NaiveDateTime {
        let millis = self.millis.load(Ordering::Acquire);
        DateTime::from_timestamp_millis(millis)
            .map(|dt| dt.naive_utc())
            .unwrap_or_default()
    }
}
