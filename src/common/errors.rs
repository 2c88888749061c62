//! Error types for the monitor

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type alias using our MonitorError
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Main error type for monitor construction and mutation
///
/// Construction-time variants are fatal to `PositionMonitor::build`. Once a
/// monitor is live, mutation errors are returned to the caller and leave the
/// monitor untouched.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Two legs share an instrument id
    #[error("Duplicate instrument id {instrument_id} (symbol {symbol})")]
    DuplicateInstrument { instrument_id: u64, symbol: String },

    /// Two legs share a symbol
    #[error("Duplicate leg symbol: {0}")]
    DuplicateSymbol(String),

    /// A monitor needs at least one leg
    #[error("Monitor has no legs")]
    NoLegs,

    /// Leg count would exceed the per-monitor limit
    #[error("Too many legs: at most {max} legs per monitor")]
    TooManyLegs { max: usize },

    /// Entry premium must be strictly positive
    #[error("Non-positive premium: {0}")]
    NonPositivePremium(Decimal),

    /// Threshold values must be strictly positive
    #[error("Invalid threshold {name}: {value} (must be positive)")]
    InvalidThreshold { name: &'static str, value: Decimal },

    /// Unrecognised direction string
    #[error("Invalid direction: {0}")]
    InvalidDirection(String),

    /// Unrecognised option type string
    #[error("Invalid option type: {0}")]
    InvalidOptionType(String),

    /// Strategy enabled for a policy/direction it does not support
    #[error("Unsupported strategy combination: {0}")]
    UnsupportedStrategy(String),

    /// Leg lookup by symbol failed
    #[error("Leg not found: {0}")]
    LegNotFound(String),

    /// Operation on a monitor that already terminated
    #[error("Monitor {0} is no longer active")]
    MonitorInactive(String),

    /// A monitor with this execution id is already registered
    #[error("Monitor already registered: {0}")]
    DuplicateMonitor(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Order placement collaborator failure
    #[error("Order placement error: {0}")]
    Placement(String),

    /// Malformed line in a tick replay file
    #[error("Replay line {line}: {message}")]
    ReplayFormat { line: usize, message: String },

    /// File access errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for MonitorError {
    fn from(err: config::ConfigError) -> Self {
        MonitorError::Configuration(err.to_string())
    }
}
