//! Leg replacement after a premium adjustment
//!
//! The monitor only emits a [`LegReplacementRequest`](crate::common::traits::LegReplacementRequest);
//! everything here runs on the worker path and re-enters the monitor through
//! `add_replacement_leg` or `abandon_replacement`.

mod coordinator;
mod paper;
mod selection;
mod traits;

pub use coordinator::{ReplacementCoordinator, ReplacementOutcome};
pub use paper::PaperPlacement;
pub use selection::select_replacement;
pub use traits::{FilledOrder, OrderPlacement, Quote};
