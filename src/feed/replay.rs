//! Deterministic tick replay
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   TickBatch   ┌──────────────────────────────┐
//! │ ReplayFeed  │ ────────────► │ ReplaySession                │
//! │ (JSON lines)│               │  clock.set(timestamp)        │
//! └─────────────┘               │  PaperPlacement.on_batch()   │
//!                               │  MonitorRouter.on_batch()    │
//!                               └──────────────┬───────────────┘
//!                                              │ MonitorEvent (mpsc)
//!                                              ▼
//!                               ┌──────────────────────────────┐
//!                               │ worker: exits are logged,    │
//!                               │ replacements go through the  │
//!                               │ ReplacementCoordinator       │
//!                               └──────────────────────────────┘
//! ```
//!
//! Pending events are always serviced before the next batch, so a replacement
//! leg is installed before the prices that follow it are applied.

use chrono::NaiveDateTime;
use futures_util::stream::{self, Stream, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

use crate::common::channels::{create_event_channel, ChannelExitHandler, MonitorEvent};
use crate::common::clock::{Clock, SimulatedClock};
use crate::common::errors::{MonitorError, Result};
use crate::common::traits::ExitHandler;
use crate::common::types::TickBatch;
use crate::config::types::AppConfig;
use crate::monitor::{MonitorRouter, MonitorSnapshot, PositionMonitor};
use crate::replacement::{FilledOrder, PaperPlacement, ReplacementCoordinator, ReplacementOutcome};
use crate::strategy::ExitCode;

/// Tick batches loaded from a JSON-lines file
///
/// One batch per line:
/// `{"timestamp":"2024-05-02T09:20:00","ticks":[{"instrument_id":101,"ltp":99.5}]}`.
/// Blank lines and lines starting with `#` are skipped.
#[derive(Debug, Clone, Default)]
pub struct ReplayFeed {
    batches: Vec<TickBatch>,
}

impl ReplayFeed {
    pub fn from_batches(batches: Vec<TickBatch>) -> Self {
        Self { batches }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut batches = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let batch: TickBatch =
                serde_json::from_str(trimmed).map_err(|e| MonitorError::ReplayFormat {
                    line: index + 1,
                    message: e.to_string(),
                })?;
            batches.push(batch);
        }
        Ok(Self { batches })
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn into_stream(self) -> impl Stream<Item = TickBatch> + Unpin {
        stream::iter(self.batches)
    }
}

/// Full exit observed during a replay
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExitRecord {
    pub execution_id: String,
    pub code: Option<ExitCode>,
    pub reason: String,
    pub at: NaiveDateTime,
}

/// What happened during a replay
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplaySummary {
    pub batches: usize,
    pub ticks: usize,
    pub exits: Vec<ExitRecord>,
    pub leg_exits: usize,
    pub replacements_filled: usize,
    pub replacements_abandoned: usize,
    /// Replacement fills left without a monitor, to be squared off
    pub orphaned_fills: Vec<FilledOrder>,
    pub monitors: Vec<MonitorSnapshot>,
}

impl ReplaySummary {
    pub fn exit_for(&self, execution_id: &str) -> Option<&ExitRecord> {
        self.exits.iter().find(|e| e.execution_id == execution_id)
    }
}

/// Replays ticks through every configured monitor
pub struct ReplaySession {
    router: Arc<MonitorRouter>,
    monitors: HashMap<String, Arc<PositionMonitor>>,
    clock: Arc<SimulatedClock>,
    board: Arc<PaperPlacement>,
    coordinator: ReplacementCoordinator,
    events: mpsc::UnboundedReceiver<MonitorEvent>,
}

impl ReplaySession {
    /// Build every monitor in `config` on a simulated clock and paper board
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let start = config.replay.clock_start.unwrap_or_default();
        let clock = Arc::new(SimulatedClock::new(start));
        let board = Arc::new(PaperPlacement::new(config.universe.clone()));
        let coordinator = ReplacementCoordinator::new(
            board.clone(),
            config.replacement.near_match_tolerance,
        );

        let (sender, events) = create_event_channel();
        let handler: Arc<dyn ExitHandler> = Arc::new(ChannelExitHandler::new(sender));
        let router = Arc::new(MonitorRouter::new());
        let mut monitors = HashMap::new();

        for monitor_config in &config.monitors {
            let monitor = PositionMonitor::builder(monitor_config.clone())
                .with_handler(handler.clone())
                .with_clock(clock.clone())
                .build()?;
            router.register(monitor.clone())?;
            monitors.insert(monitor.execution_id().to_string(), monitor);
        }
        info!(
            monitors = monitors.len(),
            universe = board.universe_len(),
            clock_start = %start,
            "Replay session ready"
        );

        Ok(Self {
            router,
            monitors,
            clock,
            board,
            coordinator,
            events,
        })
    }

    pub fn router(&self) -> &Arc<MonitorRouter> {
        &self.router
    }

    pub fn monitor(&self, execution_id: &str) -> Option<&Arc<PositionMonitor>> {
        self.monitors.get(execution_id)
    }

    /// Drive the session until the tick stream ends
    #[instrument(skip_all, fields(monitors = self.monitors.len()))]
    pub async fn run<S>(self, mut ticks: S) -> Result<ReplaySummary>
    where
        S: Stream<Item = TickBatch> + Unpin,
    {
        let ReplaySession {
            router,
            monitors,
            clock,
            board,
            coordinator,
            mut events,
        } = self;
        let worker = Worker {
            monitors: &monitors,
            clock: &clock,
            coordinator: &coordinator,
        };
        let mut summary = ReplaySummary::default();

        loop {
            tokio::select! {
                biased;
                Some(event) = events.recv() => worker.handle(event, &mut summary).await,
                batch = ticks.next() => match batch {
                    Some(batch) => {
                        if let Some(timestamp) = batch.timestamp {
                            clock.set(timestamp);
                        }
                        board.on_batch(&batch.ticks);
                        router.on_batch(&batch.ticks);
                        summary.batches += 1;
                        summary.ticks += batch.ticks.len();
                    }
                    None => break,
                },
            }
        }
        while let Ok(event) = events.try_recv() {
            worker.handle(event, &mut summary).await;
        }

        let mut ids: Vec<&String> = monitors.keys().collect();
        ids.sort();
        summary.monitors = ids
            .into_iter()
            .filter_map(|id| monitors.get(id))
            .map(|m| m.snapshot())
            .collect();
        info!(
            batches = summary.batches,
            ticks = summary.ticks,
            exits = summary.exits.len(),
            still_active = router.active_count(),
            "Replay finished"
        );
        Ok(summary)
    }
}

/// Event side of the session
struct Worker<'a> {
    monitors: &'a HashMap<String, Arc<PositionMonitor>>,
    clock: &'a SimulatedClock,
    coordinator: &'a ReplacementCoordinator,
}

impl Worker<'_> {
    async fn handle(&self, event: MonitorEvent, summary: &mut ReplaySummary) {
        match event {
            MonitorEvent::ExitAll {
                owner,
                execution_id,
                reason,
            } => {
                info!(execution_id = %execution_id, owner = %owner, reason = %reason, "Square off all legs");
                summary.exits.push(ExitRecord {
                    code: ExitCode::from_reason(&reason),
                    execution_id,
                    reason,
                    at: self.clock.now(),
                });
            }
            MonitorEvent::ExitLeg {
                owner,
                execution_id,
                symbol,
                reason,
            } => {
                info!(execution_id = %execution_id, owner = %owner, symbol = %symbol, reason = %reason, "Square off leg");
                summary.leg_exits += 1;
            }
            MonitorEvent::LegReplacementRequested { owner, request } => {
                let Some(monitor) = self.monitors.get(&request.execution_id) else {
                    warn!(execution_id = %request.execution_id, "Replacement for unknown monitor");
                    return;
                };
                match self.coordinator.replace(monitor, &owner, &request).await {
                    ReplacementOutcome::Filled(_) => summary.replacements_filled += 1,
                    ReplacementOutcome::Abandoned { .. } => summary.replacements_abandoned += 1,
                    ReplacementOutcome::Orphaned { fill, reason } => {
                        error!(
                            execution_id = %request.execution_id,
                            order_id = %fill.order_id,
                            symbol = %fill.symbol,
                            reason = %reason,
                            "Square off orphaned replacement fill"
                        );
                        summary.orphaned_fills.push(fill);
                    }
                    ReplacementOutcome::Skipped => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Tick;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[test]
    fn test_reads_json_lines() {
        let raw = r#"
# opening prints
{"timestamp":"2024-05-02T09:20:00","ticks":[{"instrument_id":101,"ltp":99.5}]}

{"ticks":[{"instrument_id":102,"ltp":80.25},{"instrument_id":101,"ltp":99.0}]}
"#;
        let feed = ReplayFeed::from_reader(Cursor::new(raw)).unwrap();
        assert_eq!(feed.len(), 2);
        assert!(!feed.is_empty());
    }

    #[test]
    fn test_reports_bad_line_number() {
        let raw = "{\"ticks\":[]}\n{\"ticks\": oops}\n";
        match ReplayFeed::from_reader(Cursor::new(raw)) {
            Err(MonitorError::ReplayFormat { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected ReplayFormat, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stream_yields_batches_in_order() {
        let feed = ReplayFeed::from_batches(vec![
            TickBatch::new(vec![Tick::new(1, 1.0)]),
            TickBatch::new(vec![Tick::new(2, 2.0)]),
        ]);
        let batches: Vec<TickBatch> = feed.into_stream().collect().await;
        assert_eq!(batches[1].ticks[0].instrument_id, 2);
    }

    #[tokio::test]
    async fn test_empty_session_summary() {
        let session = ReplaySession::from_config(&AppConfig::default()).unwrap();
        let summary = session
            .run(ReplayFeed::from_batches(vec![TickBatch::new(vec![Tick::new(1, 1.0)])]).into_stream())
            .await
            .unwrap();
        assert_eq!(summary.batches, 1);
        assert_eq!(summary.ticks, 1);
        assert!(summary.exits.is_empty());
        assert!(summary.monitors.is_empty());
    }
}
