//! Channel plumbing between monitors and the orchestration worker

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::error;

use super::traits::{ExitHandler, LegReplacementRequest};
use super::types::OwnerContext;

/// Exit decision forwarded off the tick path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MonitorEvent {
    ExitAll {
        owner: OwnerContext,
        execution_id: String,
        reason: String,
    },
    ExitLeg {
        owner: OwnerContext,
        execution_id: String,
        symbol: String,
        reason: String,
    },
    LegReplacementRequested {
        owner: OwnerContext,
        request: LegReplacementRequest,
    },
}

impl MonitorEvent {
    /// Execution the event belongs to
    pub fn execution_id(&self) -> &str {
        match self {
            MonitorEvent::ExitAll { execution_id, .. } => execution_id,
            MonitorEvent::ExitLeg { execution_id, .. } => execution_id,
            MonitorEvent::LegReplacementRequested { request, .. } => &request.execution_id,
        }
    }
}

/// Create a new monitor event channel
///
/// Unbounded: exits are rare and must never be dropped because a worker fell
/// behind.
pub fn create_event_channel() -> (
    mpsc::UnboundedSender<MonitorEvent>,
    mpsc::UnboundedReceiver<MonitorEvent>,
) {
    mpsc::unbounded_channel()
}

/// [`ExitHandler`] that forwards every callback as a [`MonitorEvent`]
#[derive(Debug, Clone)]
pub struct ChannelExitHandler {
    sender: mpsc::UnboundedSender<MonitorEvent>,
}

impl ChannelExitHandler {
    pub fn new(sender: mpsc::UnboundedSender<MonitorEvent>) -> Self {
        Self { sender }
    }

    fn forward(&self, event: MonitorEvent) {
        if let Err(e) = self.sender.send(event) {
            error!(execution_id = e.0.execution_id(), "Monitor event dropped, receiver closed");
        }
    }
}

impl ExitHandler for ChannelExitHandler {
    fn on_exit_all(&self, owner: &OwnerContext, execution_id: &str, reason: &str) {
        self.forward(MonitorEvent::ExitAll {
            owner: owner.clone(),
            execution_id: execution_id.to_string(),
            reason: reason.to_string(),
        });
    }

    fn on_exit_leg(&self, owner: &OwnerContext, execution_id: &str, symbol: &str, reason: &str) {
        self.forward(MonitorEvent::ExitLeg {
            owner: owner.clone(),
            execution_id: execution_id.to_string(),
            symbol: symbol.to_string(),
            reason: reason.to_string(),
        });
    }

    fn on_leg_replacement_requested(&self, owner: &OwnerContext, request: &LegReplacementRequest) {
        self.forward(MonitorEvent::LegReplacementRequested {
            owner: owner.clone(),
            request: request.clone(),
        });
    }
}
