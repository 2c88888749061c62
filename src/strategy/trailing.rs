use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

use crate::common::cells::DecimalCell;
use crate::strategy::context::ExitContext;
use crate::strategy::traits::ExitStrategy;
use crate::strategy::types::{ExitCode, ExitReason, ExitResult};

/// Trailing stop on cumulative P&L points
///
/// Dormant until P&L reaches `activation`; from then on the stop trails the
/// best P&L seen by `distance`.
#[derive(Debug)]
pub struct TrailingStop {
    activation: Decimal,
    distance: Decimal,
    activated: AtomicBool,
    high_water_mark: DecimalCell,
}

/// Point-in-time view of the trailing stop
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrailingState {
    pub activation_points: Decimal,
    pub distance_points: Decimal,
    pub activated: bool,
    pub high_water_mark: Option<Decimal>,
    pub current_level: Option<Decimal>,
}

impl TrailingStop {
    pub const PRIORITY: u32 = 300;

    pub fn new(activation: Decimal, distance: Decimal) -> Self {
        Self {
            activation,
            distance,
            activated: AtomicBool::new(false),
            high_water_mark: DecimalCell::new(Decimal::MIN),
        }
    }

    pub fn state(&self) -> TrailingState {
        let activated = self.activated.load(Ordering::Acquire);
        let high_water_mark = activated.then(|| self.high_water_mark.load());
        TrailingState {
            activation_points: self.activation,
            distance_points: self.distance,
            activated,
            high_water_mark,
            current_level: high_water_mark.map(|hwm| hwm - self.distance),
        }
    }
}

impl ExitStrategy for TrailingStop {
    fn name(&self) -> &'static str {
        "trailing_stop"
    }

    fn priority(&self) -> u32 {
        Self::PRIORITY
    }

    fn evaluate(&self, ctx: &ExitContext<'_>) -> ExitResult {
        let pnl = ctx.cumulative_pnl;
        if !self.activated.load(Ordering::Acquire) {
            if pnl < self.activation {
                return ExitResult::NoExit;
            }
            if !self.activated.swap(true, Ordering::AcqRel) {
                info!(pnl = %pnl, activation = %self.activation, "Trailing stop activated");
            }
        }

        let high_water_mark = self.high_water_mark.fetch_max(pnl);
        let level = high_water_mark - self.distance;
        if pnl > level {
            return ExitResult::NoExit;
        }
        ExitResult::exit_all(
            ExitReason::new(ExitCode::TrailingStopHit)
                .amount("Cumulative P&L", pnl)
                .amount("HighWaterMark", high_water_mark)
                .amount("TrailLevel", level)
                .build(),
        )
    }
}
