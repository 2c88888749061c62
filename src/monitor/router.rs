use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::common::cells::Published;
use crate::common::errors::{MonitorError, Result};
use crate::common::types::Tick;
use crate::monitor::position::PositionMonitor;

type MonitorMap = HashMap<String, Arc<PositionMonitor>>;

/// Fans tick batches out to every live monitor
///
/// Terminated monitors are pruned after each batch.
#[derive(Debug)]
pub struct MonitorRouter {
    monitors: Published<MonitorMap>,
}

impl Default for MonitorRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorRouter {
    pub fn new() -> Self {
        Self {
            monitors: Published::new(HashMap::new()),
        }
    }

    pub fn register(&self, monitor: Arc<PositionMonitor>) -> Result<()> {
        let execution_id = monitor.execution_id().to_string();
        self.monitors.try_update(|current| {
            if current.contains_key(&execution_id) {
                return Err(MonitorError::DuplicateMonitor(execution_id.clone()));
            }
            let mut next = current.clone();
            next.insert(execution_id.clone(), monitor);
            Ok((next, ()))
        })?;
        info!(execution_id = %execution_id, "Monitor registered");
        Ok(())
    }

    pub fn get(&self, execution_id: &str) -> Option<Arc<PositionMonitor>> {
        self.monitors.load().get(execution_id).cloned()
    }

    pub fn remove(&self, execution_id: &str) -> Option<Arc<PositionMonitor>> {
        self.monitors
            .try_update(|current| {
                let mut next = current.clone();
                let removed = next.remove(execution_id).ok_or(())?;
                Ok::<_, ()>((next, removed))
            })
            .ok()
    }

    /// Route one batch
    ///
    /// Monitors with no leg in the batch still get a clock evaluation so a
    /// forced exit is not held back by a quiet instrument. Returns the ids of
    /// monitors that terminated and were pruned.
    pub fn on_batch(&self, ticks: &[Tick]) -> Vec<String> {
        let monitors = self.monitors.load();
        for monitor in monitors.values() {
            if !monitor.on_ticks(ticks) {
                monitor.on_clock();
            }
        }
        self.prune_inactive()
    }

    /// Drop terminated monitors, returning their ids
    pub fn prune_inactive(&self) -> Vec<String> {
        if self.monitors.load().values().all(|m| m.is_active()) {
            return Vec::new();
        }
        let pruned = self.monitors.update(|current| {
            let (live, done): (MonitorMap, MonitorMap) =
                current.iter().map(|(k, v)| (k.clone(), v.clone())).partition(|(_, m)| m.is_active());
            let mut done: Vec<String> = done.into_keys().collect();
            done.sort();
            (live, done)
        });
        for execution_id in &pruned {
            debug!(execution_id = %execution_id, "Pruned terminated monitor");
        }
        pruned
    }

    pub fn active_count(&self) -> usize {
        self.monitors.load().values().filter(|m| m.is_active()).count()
    }

    pub fn len(&self) -> usize {
        self.monitors.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.load().is_empty()
    }

    pub fn execution_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.monitors.load().keys().cloned().collect();
        ids.sort();
        ids
    }
}
