//! Shared types, errors and plumbing

pub mod cells;
pub mod channels;
pub mod clock;
pub mod errors;
pub mod traits;
pub mod types;
