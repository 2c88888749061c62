//! Tick sources

pub mod replay;

pub use replay::{ExitRecord, ReplayFeed, ReplaySession, ReplaySummary};
