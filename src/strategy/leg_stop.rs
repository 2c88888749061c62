use crate::strategy::context::ExitContext;
use crate::strategy::traits::ExitStrategy;
use crate::strategy::types::{ExitCode, ExitReason, ExitResult};

/// Stop out a single short leg whose own loss reaches the stop-loss points
///
/// With `transfer_risk_budget`, the dispatcher adds the stop-loss points to
/// the cumulative target once the leg is gone.
#[derive(Debug)]
pub struct IndividualLegStop {
    transfer_risk_budget: bool,
}

impl IndividualLegStop {
    pub const PRIORITY: u32 = 200;

    pub fn new(transfer_risk_budget: bool) -> Self {
        Self {
            transfer_risk_budget,
        }
    }
}

impl ExitStrategy for IndividualLegStop {
    fn name(&self) -> &'static str {
        "individual_leg_stop"
    }

    fn priority(&self) -> u32 {
        Self::PRIORITY
    }

    fn evaluate(&self, ctx: &ExitContext<'_>) -> ExitResult {
        let Some(risk) = ctx.risk else {
            return ExitResult::NoExit;
        };
        let limit = -risk.stop_loss;

        for i in 0..ctx.leg_count() {
            let pnl = ctx.leg_pnl(i);
            if pnl > limit {
                continue;
            }
            let leg = ctx.leg(i);
            return ExitResult::ExitLeg {
                reason: ExitReason::new(ExitCode::IndividualLegStoplossHit)
                    .field("Leg", &leg.symbol)
                    .amount("Leg P&L", pnl)
                    .amount("StopLoss", risk.stop_loss)
                    .build(),
                symbol: leg.symbol.clone(),
                target_bump: self.transfer_risk_budget.then_some(risk.stop_loss),
            };
        }
        ExitResult::NoExit
    }
}
