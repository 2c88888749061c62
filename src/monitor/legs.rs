//! Leg registry
//!
//! Legs live in an immutable [`LegSnapshot`] indexed by instrument id and by
//! symbol. Every add/remove publishes a fresh snapshot; the tick path only ever
//! clones the current `Arc` and writes prices through each leg's atomic cell.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::common::cells::{DecimalCell, Published};
use crate::common::errors::{MonitorError, Result};
use crate::common::types::{Direction, LegRole, OptionType};

/// Maximum legs per monitor (a hedged iron-condor style structure)
pub const MAX_LEGS: usize = 4;

/// Filled leg as reported by the order-placement layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegSpec {
    pub order_id: String,
    pub symbol: String,
    pub instrument_id: u64,
    pub entry_price: Decimal,
    pub quantity: u32,
    pub option_type: OptionType,
    #[serde(default)]
    pub role: LegRole,
}

impl LegSpec {
    pub fn new(
        order_id: impl Into<String>,
        symbol: impl Into<String>,
        instrument_id: u64,
        entry_price: Decimal,
        quantity: u32,
        option_type: OptionType,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            symbol: symbol.into(),
            instrument_id,
            entry_price,
            quantity,
            option_type,
            role: LegRole::Primary,
        }
    }

    /// Mark the leg as a hedge (inverted P&L sign)
    pub fn hedge(mut self) -> Self {
        self.role = LegRole::Hedge;
        self
    }
}

/// A live leg
#[derive(Debug)]
pub struct Leg {
    pub order_id: String,
    pub symbol: String,
    pub instrument_id: u64,
    pub entry_price: Decimal,
    pub quantity: u32,
    pub option_type: OptionType,
    pub role: LegRole,
    current_price: DecimalCell,
}

impl Leg {
    pub fn from_spec(spec: LegSpec) -> Self {
        Self {
            current_price: DecimalCell::new(spec.entry_price),
            order_id: spec.order_id,
            symbol: spec.symbol,
            instrument_id: spec.instrument_id,
            entry_price: spec.entry_price,
            quantity: spec.quantity,
            option_type: spec.option_type,
            role: spec.role,
        }
    }

    /// Last traded price (entry price until the first tick)
    pub fn current_price(&self) -> Decimal {
        self.current_price.load()
    }

    /// Record a feed price; non-positive or non-finite prices are rejected
    pub fn update_price(&self, ltp: f64) -> bool {
        if ltp <= 0.0 || !ltp.is_finite() {
            return false;
        }
        self.current_price.store_f64(ltp)
    }

    /// P&L in points at `price` for a position held in `direction`
    pub fn pnl_at(&self, price: Decimal, direction: Direction) -> Decimal {
        (price - self.entry_price) * direction.multiplier() * self.role.multiplier()
    }
}

/// Immutable view of a monitor's legs
#[derive(Debug, Default)]
pub struct LegSnapshot {
    legs: Vec<Arc<Leg>>,
    by_instrument: HashMap<u64, usize>,
    by_symbol: HashMap<String, usize>,
}

impl LegSnapshot {
    fn from_legs(legs: Vec<Arc<Leg>>) -> Self {
        let by_instrument = legs
            .iter()
            .enumerate()
            .map(|(i, leg)| (leg.instrument_id, i))
            .collect();
        let by_symbol = legs
            .iter()
            .enumerate()
            .map(|(i, leg)| (leg.symbol.clone(), i))
            .collect();
        Self {
            legs,
            by_instrument,
            by_symbol,
        }
    }

    pub fn legs(&self) -> &[Arc<Leg>] {
        &self.legs
    }

    pub fn len(&self) -> usize {
        self.legs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    pub fn by_instrument(&self, instrument_id: u64) -> Option<&Arc<Leg>> {
        self.by_instrument.get(&instrument_id).map(|&i| &self.legs[i])
    }

    pub fn by_symbol(&self, symbol: &str) -> Option<&Arc<Leg>> {
        self.by_symbol.get(symbol).map(|&i| &self.legs[i])
    }

    /// Sum of entry prices across legs
    pub fn entry_premium(&self) -> Decimal {
        self.legs.iter().map(|leg| leg.entry_price).sum()
    }

    fn validate_new(&self, spec: &LegSpec) -> Result<()> {
        if self.legs.len() >= MAX_LEGS {
            return Err(MonitorError::TooManyLegs { max: MAX_LEGS });
        }
        if self.by_instrument.contains_key(&spec.instrument_id) {
            return Err(MonitorError::DuplicateInstrument {
                instrument_id: spec.instrument_id,
                symbol: spec.symbol.clone(),
            });
        }
        if self.by_symbol.contains_key(&spec.symbol) {
            return Err(MonitorError::DuplicateSymbol(spec.symbol.clone()));
        }
        Ok(())
    }

    fn with_leg(&self, spec: LegSpec) -> Result<(Self, Arc<Leg>)> {
        self.validate_new(&spec)?;
        let leg = Arc::new(Leg::from_spec(spec));
        let mut legs = self.legs.clone();
        legs.push(leg.clone());
        Ok((Self::from_legs(legs), leg))
    }

    fn without(&self, symbol: &str) -> Option<(Self, Arc<Leg>)> {
        let idx = *self.by_symbol.get(symbol)?;
        let mut legs = self.legs.clone();
        let removed = legs.remove(idx);
        Some((Self::from_legs(legs), removed))
    }
}

/// Copy-on-write leg table owned by one monitor
#[derive(Debug)]
pub struct LegRegistry {
    snapshot: Published<LegSnapshot>,
}

impl LegRegistry {
    /// Build the initial table; any invalid leg rejects the whole set
    pub fn new(specs: Vec<LegSpec>) -> Result<Self> {
        if specs.is_empty() {
            return Err(MonitorError::NoLegs);
        }
        let mut snapshot = LegSnapshot::default();
        for spec in specs {
            snapshot = snapshot.with_leg(spec)?.0;
        }
        Ok(Self {
            snapshot: Published::new(snapshot),
        })
    }

    pub fn load(&self) -> Arc<LegSnapshot> {
        self.snapshot.load()
    }

    /// Publish a snapshot with one more leg
    pub fn add(&self, spec: LegSpec) -> Result<Arc<Leg>> {
        self.snapshot.try_update(|current| current.with_leg(spec))
    }

    /// Publish a snapshot without `symbol`
    ///
    /// Only one caller can ever receive a given leg back, which makes removal
    /// the exactly-once guard for per-leg exits.
    pub fn remove(&self, symbol: &str) -> Option<Arc<Leg>> {
        self.snapshot
            .try_update(|current| current.without(symbol).ok_or(()))
            .ok()
    }
}
