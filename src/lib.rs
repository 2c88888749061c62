//! StraddleMonitor Library
//!
//! Tick-driven exit-decision engine for multi-leg options positions: leg
//! registry, exit strategy chain, exactly-once exit dispatch and leg
//! replacement.

pub mod common;
pub mod config;
pub mod feed;
pub mod monitor;
pub mod replacement;
pub mod strategy;

// Re-export commonly used types
pub use common::channels::{create_event_channel, ChannelExitHandler, MonitorEvent};
pub use common::clock::{Clock, SimulatedClock, SystemClock};
pub use common::errors::{MonitorError, Result};
pub use common::traits::{ExitHandler, LegReplacementRequest};
pub use common::types::{Direction, LegRole, OptionType, OwnerContext, Tick, TickBatch};
pub use config::types::{AppConfig, MonitorConfig};
pub use feed::{ReplayFeed, ReplaySession, ReplaySummary};
pub use monitor::{LegSpec, MonitorRouter, MonitorSnapshot, PositionMonitor};
pub use replacement::{OrderPlacement, PaperPlacement, ReplacementCoordinator, ReplacementOutcome};

// Strategy types
pub use strategy::{ExitCode, ExitPolicy, ExitResult, ExitStrategy};
