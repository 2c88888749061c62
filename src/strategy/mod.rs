//! Exit strategies evaluated on every tick
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    HOT PATH (sync)                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Tick arrives → leg price written to its atomic cell        │
//! │       │                                                     │
//! │       ▼                                                     │
//! │  ExitContext::build() → P&L, MTM, combined LTP              │
//! │       │                                                     │
//! │       ▼                                                     │
//! │  ExitChain (ascending priority, first exit wins)            │
//! │    0   ForcedTimeExit                                       │
//! │    50  PremiumExit        ┐                                 │
//! │    100 CumulativeExit     ┘ exactly one per monitor         │
//! │    200 IndividualLegStop                                    │
//! │    300 TrailingStop                                         │
//! │       │                                                     │
//! │       ▼ (if exit)                                           │
//! │  Dispatcher → ExitHandler callbacks                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`ExitStrategy`]: Trait implemented by every evaluator
//! - [`ExitResult`]: NoExit / ExitAll / ExitLeg / AdjustLeg
//! - [`ExitPolicy`]: Which cumulative evaluator a monitor runs
//! - [`ExitContext`]: Read-only per-tick view handed to strategies
//! - [`RiskBudget`] / [`PremiumLevels`]: Thresholds published as a unit

mod context;
mod cumulative;
mod forced_exit;
mod leg_stop;
mod premium;
mod thresholds;
mod traits;
mod trailing;
mod types;

pub use context::ExitContext;
pub use cumulative::{CumulativeExit, PnlBasis};
pub use forced_exit::ForcedTimeExit;
pub use leg_stop::IndividualLegStop;
pub use premium::PremiumExit;
pub use thresholds::{
    normalize_pct, PremiumLevels, RiskBudget, DEFAULT_STOP_LOSS_EXPANSION, DEFAULT_TARGET_DECAY,
};
pub use traits::{ExitChain, ExitStrategy, SharedExitStrategy};
pub use trailing::{TrailingState, TrailingStop};
pub use types::{ExitCode, ExitPolicy, ExitReason, ExitResult};
