//! Configuration types

use chrono::{NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::PathBuf;

use crate::common::types::{Direction, OptionType, OwnerContext};
use crate::monitor::legs::LegSpec;
use crate::strategy::ExitPolicy;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
    /// Tick replay source
    #[serde(default)]
    pub replay: ReplaySettings,
    /// Replacement leg search
    #[serde(default)]
    pub replacement: ReplacementSettings,
    /// Instruments quoted by the paper order board
    #[serde(default)]
    pub universe: Vec<InstrumentConfig>,
    /// One entry per open position
    #[serde(default)]
    pub monitors: Vec<MonitorConfig>,
}

/// Construction parameters for one position monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub execution_id: String,
    pub direction: Direction,
    pub exit_policy: ExitPolicy,
    #[serde(default)]
    pub trailing_stop: Option<TrailingStopConfig>,
    #[serde(default)]
    pub forced_exit: Option<ForcedExitConfig>,
    /// Only valid for SHORT positions under the points policy
    #[serde(default)]
    pub leg_stop: Option<LegStopConfig>,
    #[serde(default)]
    pub owner: OwnerContext,
    pub legs: Vec<LegSpec>,
}

impl MonitorConfig {
    pub fn new(
        execution_id: impl Into<String>,
        direction: Direction,
        exit_policy: ExitPolicy,
        legs: Vec<LegSpec>,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            direction,
            exit_policy,
            trailing_stop: None,
            forced_exit: None,
            leg_stop: None,
            owner: OwnerContext::default(),
            legs,
        }
    }

    pub fn with_owner(mut self, owner: OwnerContext) -> Self {
        self.owner = owner;
        self
    }

    pub fn with_trailing_stop(mut self, activation_points: Decimal, distance_points: Decimal) -> Self {
        self.trailing_stop = Some(TrailingStopConfig {
            activation_points,
            distance_points,
        });
        self
    }

    pub fn with_forced_exit(mut self, cutoff: NaiveTime) -> Self {
        self.forced_exit = Some(ForcedExitConfig { cutoff });
        self
    }

    pub fn with_leg_stop(mut self, transfer_risk_budget: bool) -> Self {
        self.leg_stop = Some(LegStopConfig {
            transfer_risk_budget,
        });
        self
    }
}

/// Trailing stop on cumulative points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailingStopConfig {
    pub activation_points: Decimal,
    pub distance_points: Decimal,
}

/// Time-of-day square-off
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForcedExitConfig {
    /// Exchange-local cutoff, `HH:MM` or `HH:MM:SS`
    #[serde(serialize_with = "serialize_cutoff", deserialize_with = "deserialize_cutoff")]
    pub cutoff: NaiveTime,
}

/// Per-leg stop for short positions
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LegStopConfig {
    /// Add the stop-loss points to the target after a leg is stopped out
    #[serde(default)]
    pub transfer_risk_budget: bool,
}

/// Parse `HH:MM` or `HH:MM:SS`
pub fn parse_cutoff(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

fn deserialize_cutoff<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_cutoff(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid cutoff time '{}'", raw)))
}

fn serialize_cutoff<S>(cutoff: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&cutoff.format("%H:%M:%S").to_string())
}

/// Instrument the paper board may quote for replacements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub instrument_id: u64,
    pub symbol: String,
    pub option_type: OptionType,
}

/// Tick replay source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplaySettings {
    /// JSON-lines file of tick batches
    #[serde(default)]
    pub ticks_path: Option<PathBuf>,
    /// Simulated clock reading before the first stamped batch
    #[serde(default)]
    pub clock_start: Option<NaiveDateTime>,
}

/// Replacement leg search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplacementSettings {
    /// Stop searching once a candidate is within this distance of the target
    #[serde(default = "default_near_match_tolerance")]
    pub near_match_tolerance: Decimal,
}

impl Default for ReplacementSettings {
    fn default() -> Self {
        Self {
            near_match_tolerance: default_near_match_tolerance(),
        }
    }
}

fn default_near_match_tolerance() -> Decimal {
    Decimal::new(5, 2)
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
