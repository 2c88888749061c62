//! Lock-free numeric cells and copy-on-write publication
//!
//! Prices and running marks cross threads through [`DecimalCell`], a
//! fixed-point `AtomicI64` at [`PRICE_SCALE`] decimal places. Values that must
//! change together (a leg table, a set of thresholds) are published through
//! [`Published`]: writers build a fresh `Arc<T>` and swap it in, readers load
//! the current `Arc` without locking and work on an immutable snapshot.

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Decimal places kept by [`DecimalCell`]
pub const PRICE_SCALE: u32 = 4;

const SCALE_FACTOR: f64 = 10_000.0;

/// Atomic decimal value stored as a scaled `i64`
#[derive(Debug)]
pub struct DecimalCell(AtomicI64);

impl DecimalCell {
    pub fn new(value: Decimal) -> Self {
        Self(AtomicI64::new(to_fixed(value)))
    }

    pub fn load(&self) -> Decimal {
        Decimal::new(self.0.load(Ordering::Acquire), PRICE_SCALE)
    }

    pub fn store(&self, value: Decimal) {
        self.0.store(to_fixed(value), Ordering::Release);
    }

    /// Store a raw feed price. Returns false (and leaves the cell untouched)
    /// for NaN, infinite or out-of-range input.
    pub fn store_f64(&self, value: f64) -> bool {
        let scaled = (value * SCALE_FACTOR).round();
        if !scaled.is_finite() || scaled.abs() >= i64::MAX as f64 {
            return false;
        }
        self.0.store(scaled as i64, Ordering::Release);
        true
    }

    /// Raise the cell to `value` if it is larger; returns the resulting value
    pub fn fetch_max(&self, value: Decimal) -> Decimal {
        let candidate = to_fixed(value);
        let previous = self.0.fetch_max(candidate, Ordering::AcqRel);
        Decimal::new(previous.max(candidate), PRICE_SCALE)
    }
}

fn to_fixed(value: Decimal) -> i64 {
    let mut rounded = value.round_dp(PRICE_SCALE);
    rounded.rescale(PRICE_SCALE);
    i64::try_from(rounded.mantissa()).unwrap_or(if rounded.is_sign_negative() {
        i64::MIN
    } else {
        i64::MAX
    })
}

/// Single-writer, many-reader snapshot holder
///
/// Readers go through an [`ArcSwap`] and never take a lock. Writers are
/// serialized by a mutex that readers never touch, so read-modify-write
/// updates cannot lose each other's changes.
#[derive(Debug)]
pub struct Published<T> {
    current: ArcSwap<T>,
    writer: Mutex<()>,
}

impl<T> Published<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: ArcSwap::from_pointee(value),
            writer: Mutex::new(()),
        }
    }

    /// Current snapshot
    pub fn load(&self) -> Arc<T> {
        self.current.load_full()
    }

    /// Replace the snapshot wholesale
    pub fn store(&self, value: T) {
        let _writer = self.writer.lock();
        self.current.store(Arc::new(value));
    }

    /// Derive the next snapshot from the current one
    pub fn update<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> (T, R),
    {
        let _writer = self.writer.lock();
        let (next, out) = f(&self.current.load());
        self.current.store(Arc::new(next));
        out
    }

    /// Fallible [`update`](Self::update); on `Err` the current snapshot is kept
    pub fn try_update<R, E, F>(&self, f: F) -> std::result::Result<R, E>
    where
        F: FnOnce(&T) -> std::result::Result<(T, R), E>,
    {
        let _writer = self.writer.lock();
        let (next, out) = f(&self.current.load())?;
        self.current.store(Arc::new(next));
        Ok(out)
    }
}
