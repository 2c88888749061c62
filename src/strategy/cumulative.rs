use crate::strategy::context::ExitContext;
use crate::strategy::traits::ExitStrategy;
use crate::strategy::types::{ExitCode, ExitReason, ExitResult};

/// What the cumulative target/stop is measured in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PnlBasis {
    /// Raw price points summed across legs
    Points,
    /// Points weighted by leg quantity
    Mtm,
}

/// Fixed target / stop on the position's cumulative P&L
#[derive(Debug)]
pub struct CumulativeExit {
    basis: PnlBasis,
}

impl CumulativeExit {
    pub const PRIORITY: u32 = 100;

    pub fn new(basis: PnlBasis) -> Self {
        Self { basis }
    }
}

impl ExitStrategy for CumulativeExit {
    fn name(&self) -> &'static str {
        match self.basis {
            PnlBasis::Points => "points_exit",
            PnlBasis::Mtm => "mtm_exit",
        }
    }

    fn priority(&self) -> u32 {
        Self::PRIORITY
    }

    fn evaluate(&self, ctx: &ExitContext<'_>) -> ExitResult {
        let Some(risk) = ctx.risk else {
            return ExitResult::NoExit;
        };
        let (pnl, label, target_code, stop_code) = match self.basis {
            PnlBasis::Points => (
                ctx.cumulative_pnl,
                "Cumulative P&L",
                ExitCode::CumulativeTargetHit,
                ExitCode::CumulativeStoplossHit,
            ),
            PnlBasis::Mtm => (
                ctx.cumulative_mtm,
                "MTM",
                ExitCode::MtmTargetHit,
                ExitCode::MtmStoplossHit,
            ),
        };

        if pnl >= risk.target {
            return ExitResult::exit_all(
                ExitReason::new(target_code)
                    .amount(label, pnl)
                    .amount("Target", risk.target)
                    .build(),
            );
        }
        if pnl <= -risk.stop_loss {
            return ExitResult::exit_all(
                ExitReason::new(stop_code)
                    .amount(label, pnl)
                    .amount("StopLoss", risk.stop_loss)
                    .build(),
            );
        }
        ExitResult::NoExit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Direction;
    use crate::strategy::test_support::{at, set_prices, short_straddle};
    use crate::strategy::thresholds::RiskBudget;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn evaluate(basis: PnlBasis, risk: RiskBudget, ce: f64, pe: f64) -> ExitResult {
        let registry = short_straddle();
        set_prices(&registry, &[(101, ce), (102, pe)]);
        let legs = registry.load();
        let ctx = ExitContext::build(&legs, Direction::Short, Some(&risk), None, at(10, 0, 0), false);
        CumulativeExit::new(basis).evaluate(&ctx)
    }

    #[test]
    fn test_points_target_hit_on_exact_boundary() {
        let risk = RiskBudget::new(dec!(2), dec!(2)).unwrap();
        assert_eq!(
            evaluate(PnlBasis::Points, risk, 99.0, 79.0).reason(),
            Some("CUMULATIVE_TARGET_HIT (Cumulative P&L: 2.00, Target: 2.00)")
        );
    }

    #[test]
    fn test_points_stoploss_hit() {
        let risk = RiskBudget::new(dec!(2), dec!(2)).unwrap();
        assert_eq!(
            evaluate(PnlBasis::Points, risk, 101.0, 81.0).reason(),
            Some("CUMULATIVE_STOPLOSS_HIT (Cumulative P&L: -2.00, StopLoss: 2.00)")
        );
    }

    #[test]
    fn test_points_inside_band() {
        let risk = RiskBudget::new(dec!(2), dec!(2)).unwrap();
        assert_eq!(evaluate(PnlBasis::Points, risk, 99.5, 80.0), ExitResult::NoExit);
    }

    #[test]
    fn test_mtm_weights_by_quantity() {
        // 50 lots per leg: 1 point on each leg is 100 in MTM terms
        let risk = RiskBudget::new(dec!(100), dec!(500)).unwrap();
        assert_eq!(
            evaluate(PnlBasis::Mtm, risk, 99.0, 79.0).code(),
            Some(ExitCode::MtmTargetHit)
        );
        assert_eq!(evaluate(PnlBasis::Mtm, risk, 99.5, 80.0), ExitResult::NoExit);
        assert_eq!(
            evaluate(PnlBasis::Mtm, risk, 105.0, 85.0).code(),
            Some(ExitCode::MtmStoplossHit)
        );
    }
}
