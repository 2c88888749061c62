//! Shared domain types used across the monitor, strategies and feeds

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::errors::MonitorError;

/// Position direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short
    pub fn multiplier(&self) -> Decimal {
        match self {
            Direction::Long => Decimal::ONE,
            Direction::Short => Decimal::NEGATIVE_ONE,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

impl FromStr for Direction {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LONG" | "BUY" => Ok(Direction::Long),
            "SHORT" | "SELL" => Ok(Direction::Short),
            other => Err(MonitorError::InvalidDirection(other.to_string())),
        }
    }
}

/// Option contract type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    /// Call
    #[serde(rename = "CE", alias = "CALL")]
    Ce,
    /// Put
    #[serde(rename = "PE", alias = "PUT")]
    Pe,
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionType::Ce => write!(f, "CE"),
            OptionType::Pe => write!(f, "PE"),
        }
    }
}

impl FromStr for OptionType {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CE" | "CALL" => Ok(OptionType::Ce),
            "PE" | "PUT" => Ok(OptionType::Pe),
            other => Err(MonitorError::InvalidOptionType(other.to_string())),
        }
    }
}

/// Role of a leg inside the position
///
/// Hedge legs contribute their price move with inverted sign relative to the
/// monitor direction, so a four-leg hedged structure shares one monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegRole {
    #[default]
    Primary,
    Hedge,
}

impl LegRole {
    /// +1 for primary legs, -1 for hedges
    pub fn multiplier(&self) -> Decimal {
        match self {
            LegRole::Primary => Decimal::ONE,
            LegRole::Hedge => Decimal::NEGATIVE_ONE,
        }
    }
}

/// Tenant/session that owns a monitor
///
/// Handed to every callback so downstream order routing never depends on
/// ambient per-thread state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct OwnerContext {
    pub user_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl OwnerContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

impl std::fmt::Display for OwnerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.session_id {
            Some(session) => write!(f, "{}/{}", self.user_id, session),
            None => write!(f, "{}", self.user_id),
        }
    }
}

/// A single last-traded-price update
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub instrument_id: u64,
    /// Last traded price
    pub ltp: f64,
}

impl Tick {
    pub fn new(instrument_id: u64, ltp: f64) -> Self {
        Self { instrument_id, ltp }
    }
}

/// A batch of ticks delivered together by a feed
///
/// Replay feeds stamp each batch with the simulated exchange time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickBatch {
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
    pub ticks: Vec<Tick>,
}

impl TickBatch {
    pub fn new(ticks: Vec<Tick>) -> Self {
        Self {
            timestamp: None,
            ticks,
        }
    }

    pub fn at(timestamp: NaiveDateTime, ticks: Vec<Tick>) -> Self {
        Self {
            timestamp: Some(timestamp),
            ticks,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parsing() {
        assert_eq!("short".parse::<Direction>().unwrap(), Direction::Short);
        assert_eq!(" LONG ".parse::<Direction>().unwrap(), Direction::Long);
        assert!(matches!(
            "sideways".parse::<Direction>(),
            Err(MonitorError::InvalidDirection(_))
        ));
    }

    #[test]
    fn test_multipliers() {
        assert_eq!(Direction::Short.multiplier(), Decimal::NEGATIVE_ONE);
        assert_eq!(Direction::Long.multiplier(), Decimal::ONE);
        assert_eq!(LegRole::Hedge.multiplier(), Decimal::NEGATIVE_ONE);
        assert_eq!(LegRole::default(), LegRole::Primary);
    }

    #[test]
    fn test_option_type_serde() {
        let parsed: OptionType = serde_json::from_str("\"PE\"").unwrap();
        assert_eq!(parsed, OptionType::Pe);
        assert_eq!(serde_json::to_string(&OptionType::Ce).unwrap(), "\"CE\"");
        assert_eq!("call".parse::<OptionType>().unwrap(), OptionType::Ce);
    }

    #[test]
    fn test_tick_batch_deserialize_without_timestamp() {
        let batch: TickBatch =
            serde_json::from_str(r#"{"ticks":[{"instrument_id":7,"ltp":101.5}]}"#).unwrap();
        assert!(batch.timestamp.is_none());
        assert_eq!(batch.ticks, vec![Tick::new(7, 101.5)]);
    }
}
