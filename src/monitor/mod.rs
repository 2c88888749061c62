//! Position monitors
//!
//! - [`PositionMonitor`]: one open multi-leg position, evaluated on every tick
//! - [`LegRegistry`]: copy-on-write leg table owned by a monitor
//! - [`MonitorRouter`]: routes tick batches to every live monitor

mod dispatcher;
pub mod legs;
mod position;
mod router;

pub use legs::{Leg, LegRegistry, LegSnapshot, LegSpec, MAX_LEGS};
pub use position::{LegView, MonitorBuilder, MonitorSnapshot, PositionMonitor};
pub use router::MonitorRouter;
