//! Callback contract between a monitor and the orchestration layer

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{OptionType, OwnerContext};

/// Request to swap an exited leg for a freshly sold one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegReplacementRequest {
    pub execution_id: String,
    pub exited_symbol: String,
    pub new_leg_type: OptionType,
    /// Premium the replacement should trade near
    pub target_premium: Decimal,
    /// Leg whose current price set the target
    pub reference_symbol: String,
    /// Candidates must be priced strictly above this
    pub exited_leg_last_price: Decimal,
    pub quantity: u32,
}

/// Receiver of exit decisions
///
/// Called on the tick path, so implementations must not block: hand the work
/// to another task (see `ChannelExitHandler`) instead of placing orders here.
/// Each monitor fires `on_exit_all` at most once.
#[cfg_attr(test, mockall::automock)]
pub trait ExitHandler: Send + Sync {
    /// Unwind every remaining leg
    fn on_exit_all(&self, owner: &OwnerContext, execution_id: &str, reason: &str);

    /// Unwind one leg
    fn on_exit_leg(&self, owner: &OwnerContext, execution_id: &str, symbol: &str, reason: &str);

    /// Find and sell a replacement for a leg that was just exited
    ///
    /// Premium exits stay suspended until the implementation answers with
    /// `PositionMonitor::add_replacement_leg` or
    /// `PositionMonitor::abandon_replacement`. An implementation that cannot
    /// replace the leg must still call `abandon_replacement`, otherwise the
    /// remaining legs run without premium protection.
    fn on_leg_replacement_requested(&self, owner: &OwnerContext, request: &LegReplacementRequest);
}
