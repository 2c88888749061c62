//! Common test utilities and fixtures

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use straddle_monitor::common::clock::SimulatedClock;
use straddle_monitor::{
    Direction, ExitHandler, ExitPolicy, LegReplacementRequest, LegSpec, MonitorConfig,
    MonitorEvent, OptionType, OwnerContext, PositionMonitor,
};

pub const CE_ID: u64 = 101;
pub const PE_ID: u64 = 102;
pub const CE_SYMBOL: &str = "NIFTY24MAY22500CE";
pub const PE_SYMBOL: &str = "NIFTY24MAY22500PE";

/// Exchange-local time on the fixture trading day
pub fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 2)
        .unwrap()
        .and_hms_opt(hour, minute, second)
        .unwrap()
}

/// Sold CE @ 100 and sold PE @ 80, 50 qty each
pub fn straddle_legs() -> Vec<LegSpec> {
    vec![
        LegSpec::new("ord-ce", CE_SYMBOL, CE_ID, dec!(100), 50, OptionType::Ce),
        LegSpec::new("ord-pe", PE_SYMBOL, PE_ID, dec!(80), 50, OptionType::Pe),
    ]
}

pub fn points_policy(target: Decimal, stop_loss: Decimal) -> ExitPolicy {
    ExitPolicy::Points {
        target_points: target,
        stop_loss_points: stop_loss,
    }
}

pub fn premium_policy(decay: Decimal, expansion: Decimal) -> ExitPolicy {
    ExitPolicy::Premium {
        target_decay_pct: decay,
        stop_loss_expansion_pct: expansion,
        leg_replacement: true,
    }
}

pub fn short_straddle(execution_id: &str, policy: ExitPolicy) -> MonitorConfig {
    MonitorConfig::new(execution_id, Direction::Short, policy, straddle_legs())
        .with_owner(OwnerContext::new("trader-1").with_session("sess-1"))
}

/// Build a monitor wired to a fresh recorder and a simulated clock at 10:00
pub fn build_monitor(
    config: MonitorConfig,
) -> (Arc<PositionMonitor>, Arc<RecordingHandler>, Arc<SimulatedClock>) {
    let handler = Arc::new(RecordingHandler::default());
    let clock = Arc::new(SimulatedClock::new(at(10, 0, 0)));
    let monitor = PositionMonitor::builder(config)
        .with_handler(handler.clone())
        .with_clock(clock.clone())
        .build()
        .expect("valid monitor config");
    (monitor, handler, clock)
}

/// [`ExitHandler`] that records every callback in arrival order
#[derive(Debug, Default)]
pub struct RecordingHandler {
    events: Mutex<Vec<MonitorEvent>>,
}

impl RecordingHandler {
    pub fn events(&self) -> Vec<MonitorEvent> {
        self.events.lock().clone()
    }

    pub fn exit_all_reasons(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                MonitorEvent::ExitAll { reason, .. } => Some(reason.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn exited_legs(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                MonitorEvent::ExitLeg { symbol, .. } => Some(symbol.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn replacement_requests(&self) -> Vec<LegReplacementRequest> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                MonitorEvent::LegReplacementRequested { request, .. } => Some(request.clone()),
                _ => None,
            })
            .collect()
    }
}

impl ExitHandler for RecordingHandler {
    fn on_exit_all(&self, owner: &OwnerContext, execution_id: &str, reason: &str) {
        self.events.lock().push(MonitorEvent::ExitAll {
            owner: owner.clone(),
            execution_id: execution_id.to_string(),
            reason: reason.to_string(),
        });
    }

    fn on_exit_leg(&self, owner: &OwnerContext, execution_id: &str, symbol: &str, reason: &str) {
        self.events.lock().push(MonitorEvent::ExitLeg {
            owner: owner.clone(),
            execution_id: execution_id.to_string(),
            symbol: symbol.to_string(),
            reason: reason.to_string(),
        });
    }

    fn on_leg_replacement_requested(&self, owner: &OwnerContext, request: &LegReplacementRequest) {
        self.events.lock().push(MonitorEvent::LegReplacementRequested {
            owner: owner.clone(),
            request: request.clone(),
        });
    }
}

/// Sample replay inputs
pub mod replay_files {
    /// Premium straddle with a replacement universe, forced exit at 15:10
    pub const CONFIG: &str = r#"
[replay]
clock_start = "2024-05-02T09:15:00"

[replacement]
near_match_tolerance = 0.05

[[universe]]
instrument_id = 201
symbol = "NIFTY24MAY22300CE"
option_type = "CE"

[[universe]]
instrument_id = 202
symbol = "NIFTY24MAY22350CE"
option_type = "CE"

[[universe]]
instrument_id = 203
symbol = "NIFTY24MAY22700PE"
option_type = "PE"

[[monitors]]
execution_id = "exec-premium"
direction = "SHORT"
owner = { user_id = "trader-1" }
exit_policy = { mode = "premium", target_decay_pct = 5, stop_loss_expansion_pct = 10 }
forced_exit = { cutoff = "15:10" }

[[monitors.legs]]
order_id = "ord-ce"
symbol = "NIFTY24MAY22500CE"
instrument_id = 101
entry_price = 100
quantity = 50
option_type = "CE"

[[monitors.legs]]
order_id = "ord-pe"
symbol = "NIFTY24MAY22500PE"
instrument_id = 102
entry_price = 80
quantity = 50
option_type = "PE"

[[monitors]]
execution_id = "exec-points"
direction = "SHORT"
owner = { user_id = "trader-2" }
exit_policy = { mode = "points", target_points = 2, stop_loss_points = 2 }
forced_exit = { cutoff = "15:10" }

[[monitors.legs]]
order_id = "ord-ce-2"
symbol = "BANKNIFTY24MAY48000CE"
instrument_id = 301
entry_price = 100
quantity = 15
option_type = "CE"

[[monitors.legs]]
order_id = "ord-pe-2"
symbol = "BANKNIFTY24MAY48000PE"
instrument_id = 302
entry_price = 80
quantity = 15
option_type = "PE"
"#;

    /// CE adjusted at 10:00 and replaced by 22350CE @ 129 (entry premium 209),
    /// decay exit at 11:00; the points straddle idles until the 15:10 cutoff
    pub const TICKS: &str = r#"
{"timestamp":"2024-05-02T09:20:00","ticks":[{"instrument_id":101,"ltp":99.0},{"instrument_id":102,"ltp":80.5},{"instrument_id":301,"ltp":100.5},{"instrument_id":201,"ltp":150.0},{"instrument_id":202,"ltp":110.0}]}
{"timestamp":"2024-05-02T10:00:00","ticks":[{"instrument_id":101,"ltp":60.0},{"instrument_id":102,"ltp":130.0},{"instrument_id":201,"ltp":145.0},{"instrument_id":202,"ltp":129.0}]}
{"timestamp":"2024-05-02T10:30:00","ticks":[{"instrument_id":102,"ltp":95.0},{"instrument_id":202,"ltp":120.0}]}
{"timestamp":"2024-05-02T11:00:00","ticks":[{"instrument_id":102,"ltp":75.0}]}
{"timestamp":"2024-05-02T15:11:00","ticks":[{"instrument_id":999,"ltp":1.0}]}
"#;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_keeps_arrival_order() {
        let handler = RecordingHandler::default();
        let owner = OwnerContext::new("trader-1");
        handler.on_exit_leg(&owner, "exec-1", CE_SYMBOL, "INDIVIDUAL_LEG_STOPLOSS_HIT");
        handler.on_exit_all(&owner, "exec-1", "CUMULATIVE_TARGET_HIT");

        assert_eq!(handler.events().len(), 2);
        assert_eq!(handler.exited_legs(), vec![CE_SYMBOL.to_string()]);
        assert_eq!(handler.exit_all_reasons(), vec!["CUMULATIVE_TARGET_HIT".to_string()]);
        assert!(handler.replacement_requests().is_empty());
    }

    #[test]
    fn test_sample_config_parses() {
        let config = straddle_monitor::config::load_from_str(replay_files::CONFIG).unwrap();
        assert_eq!(config.monitors.len(), 2);
        assert_eq!(config.universe.len(), 3);
    }
}
