//! Replay session end to end: ticks in, exits and replacements out

mod common;

use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use std::io::Cursor;

use common::*;
use straddle_monitor::config::load_from_str;
use straddle_monitor::{AppConfig, ExitCode, ReplayFeed, ReplaySession, Tick, TickBatch};

// ============================================================================
// Helper Functions
// ============================================================================

fn sample_feed() -> ReplayFeed {
    ReplayFeed::from_reader(Cursor::new(replay_files::TICKS)).unwrap()
}

// ============================================================================
// Full replay
// ============================================================================

#[test_log::test(tokio::test)]
async fn test_replay_adjusts_replaces_and_exits() {
    let config = load_from_str(replay_files::CONFIG).unwrap();
    let session = ReplaySession::from_config(&config).unwrap();
    assert_eq!(session.router().len(), 2);

    let feed = sample_feed();
    assert_eq!(feed.len(), 5);
    let summary = session.run(feed.into_stream()).await.unwrap();

    assert_eq!(summary.batches, 5);
    assert_eq!(summary.ticks, 13);
    assert_eq!(summary.leg_exits, 1);
    assert_eq!(summary.replacements_filled, 1);
    assert_eq!(summary.replacements_abandoned, 0);
    assert!(summary.orphaned_fills.is_empty());
    assert_eq!(summary.exits.len(), 2);

    let premium = summary.exit_for("exec-premium").unwrap();
    assert_eq!(
        premium.reason,
        "PREMIUM_DECAY_TARGET_HIT (Combined LTP: 195.00, Entry: 209.00, TargetLevel: 198.55)"
    );
    assert_eq!(premium.at, at(11, 0, 0));

    let points = summary.exit_for("exec-points").unwrap();
    assert_eq!(points.code, Some(ExitCode::TimeBasedForcedExit));
    assert_eq!(points.at, at(15, 11, 0));

    let ids: Vec<&str> = summary.monitors.iter().map(|m| m.execution_id.as_str()).collect();
    assert_eq!(ids, vec!["exec-points", "exec-premium"]);

    let replaced = &summary.monitors[1];
    assert!(!replaced.active);
    let symbols: Vec<&str> = replaced.legs.iter().map(|l| l.symbol.as_str()).collect();
    assert_eq!(symbols, vec![PE_SYMBOL, "NIFTY24MAY22350CE"]);
    assert_eq!(replaced.legs[1].entry_price, dec!(129));
    assert_eq!(replaced.premium.unwrap().entry_premium, dec!(209));
}

#[tokio::test]
async fn test_replacement_without_candidates_is_abandoned() {
    let config = AppConfig {
        monitors: vec![short_straddle("exec-lonely", premium_policy(dec!(5), dec!(10)))],
        ..AppConfig::default()
    };
    let session = ReplaySession::from_config(&config).unwrap();
    let monitor = session.monitor("exec-lonely").unwrap().clone();

    let feed = ReplayFeed::from_batches(vec![
        TickBatch::at(at(10, 0, 0), vec![Tick::new(CE_ID, 60.0), Tick::new(PE_ID, 130.0)]),
        TickBatch::at(at(10, 5, 0), vec![Tick::new(PE_ID, 131.0)]),
    ]);
    let summary = session.run(feed.into_stream()).await.unwrap();

    assert_eq!(summary.leg_exits, 1);
    assert_eq!(summary.replacements_abandoned, 1);
    assert_eq!(summary.replacements_filled, 0);

    // reduced to the PE leg: entry 80, stop 88
    let exit = summary.exit_for("exec-lonely").unwrap();
    assert_eq!(exit.code, Some(ExitCode::PremiumExpansionSlHit));
    assert_eq!(exit.at, at(10, 5, 0));
    assert!(!monitor.is_active());
    assert_eq!(monitor.legs().len(), 1);
}

#[tokio::test]
async fn test_quiet_feed_still_reaches_cutoff() {
    let config = load_from_str(replay_files::CONFIG).unwrap();
    let session = ReplaySession::from_config(&config).unwrap();

    let feed = ReplayFeed::from_batches(vec![
        TickBatch::at(at(9, 30, 0), vec![Tick::new(999, 1.0)]),
        TickBatch::at(at(15, 10, 0), vec![Tick::new(999, 1.0)]),
    ]);
    let summary = session.run(feed.into_stream()).await.unwrap();

    assert_eq!(summary.exits.len(), 2);
    assert!(summary
        .exits
        .iter()
        .all(|e| e.code == Some(ExitCode::TimeBasedForcedExit) && e.at == at(15, 10, 0)));
    assert!(summary.monitors.iter().all(|m| !m.active));
}

#[test]
fn test_sample_ticks_parse() {
    let feed = sample_feed();
    assert!(!feed.is_empty());
    assert!(matches!(
        ReplayFeed::from_reader(Cursor::new("{\"ticks\":[}\n")),
        Err(straddle_monitor::MonitorError::ReplayFormat { line: 1, .. })
    ));
}
