use chrono::NaiveTime;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

use crate::strategy::context::ExitContext;
use crate::strategy::traits::ExitStrategy;
use crate::strategy::types::{ExitCode, ExitResult};

/// Square off everything once the clock passes a cutoff time of day
///
/// One-shot: only the first evaluation at or after the cutoff fires.
#[derive(Debug)]
pub struct ForcedTimeExit {
    cutoff: NaiveTime,
    triggered: AtomicBool,
}

impl ForcedTimeExit {
    pub const PRIORITY: u32 = 0;

    pub fn new(cutoff: NaiveTime) -> Self {
        Self {
            cutoff,
            triggered: AtomicBool::new(false),
        }
    }

    pub fn cutoff(&self) -> NaiveTime {
        self.cutoff
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }
}

impl ExitStrategy for ForcedTimeExit {
    fn name(&self) -> &'static str {
        "forced_time_exit"
    }

    fn priority(&self) -> u32 {
        Self::PRIORITY
    }

    fn evaluate(&self, ctx: &ExitContext<'_>) -> ExitResult {
        if ctx.now.time() < self.cutoff {
            return ExitResult::NoExit;
        }
        if self
            .triggered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return ExitResult::NoExit;
        }

        info!(cutoff = %self.cutoff, now = %ctx.now, "Forced exit cutoff reached");
        ExitResult::exit_all(format!(
            "{} @ {}",
            ExitCode::TimeBasedForcedExit,
            self.cutoff.format("%H:%M")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::{at, short_straddle};
    use crate::common::types::Direction;

    #[test]
    fn test_fires_once_after_cutoff() {
        let strategy = ForcedTimeExit::new(NaiveTime::from_hms_opt(15, 10, 0).unwrap());
        let registry = short_straddle();
        let legs = registry.load();

        let before = ExitContext::build(&legs, Direction::Short, None, None, at(15, 9, 59), false);
        assert_eq!(strategy.evaluate(&before), ExitResult::NoExit);
        assert!(!strategy.is_triggered());

        let after = ExitContext::build(&legs, Direction::Short, None, None, at(15, 10, 1), false);
        assert_eq!(
            strategy.evaluate(&after),
            ExitResult::exit_all("TIME_BASED_FORCED_EXIT @ 15:10")
        );
        assert_eq!(strategy.evaluate(&after), ExitResult::NoExit);
        assert!(strategy.is_triggered());
    }

    #[test]
    fn test_exact_cutoff_counts() {
        let strategy = ForcedTimeExit::new(NaiveTime::from_hms_opt(15, 10, 0).unwrap());
        let registry = short_straddle();
        let legs = registry.load();
        let ctx = ExitContext::build(&legs, Direction::Short, None, None, at(15, 10, 0), false);
        assert!(strategy.evaluate(&ctx).is_full_exit());
    }
}
