use rust_decimal::Decimal;

use crate::strategy::context::ExitContext;
use crate::strategy::traits::ExitStrategy;
use crate::strategy::types::{ExitCode, ExitReason, ExitResult};

/// Combined-premium decay target, expansion stop and leg adjustment
///
/// With exactly two legs and replacement enabled, crossing the midpoint
/// between entry premium and the expansion stop swaps out the profitable leg
/// for a same-type leg priced near the losing leg. Structures with hedges
/// never adjust.
#[derive(Debug)]
pub struct PremiumExit {
    leg_replacement: bool,
}

impl PremiumExit {
    pub const PRIORITY: u32 = 50;

    /// Legs required for the midpoint adjustment
    pub const ADJUSTABLE_LEGS: usize = 2;

    pub fn new(leg_replacement: bool) -> Self {
        Self { leg_replacement }
    }

    fn adjustment(&self, ctx: &ExitContext<'_>, midpoint: Decimal) -> ExitResult {
        let mut best = 0;
        let mut worst = 0;
        for i in 1..ctx.leg_count() {
            let pnl = ctx.leg_pnl(i);
            if pnl > ctx.leg_pnl(best) {
                best = i;
            }
            if pnl < ctx.leg_pnl(worst) {
                worst = i;
            }
        }
        if best == worst {
            return ExitResult::NoExit;
        }

        let profitable = ctx.leg(best);
        let adverse = ctx.leg(worst);
        let target_premium = ctx.leg_price(worst);
        ExitResult::AdjustLeg {
            reason: ExitReason::new(ExitCode::PremiumLegAdjustment)
                .amount("Combined LTP", ctx.combined_ltp)
                .amount("Midpoint", midpoint)
                .field("Exited", &profitable.symbol)
                .amount("Exited LTP", ctx.leg_price(best))
                .field("Reference", &adverse.symbol)
                .amount("Target Premium", target_premium)
                .build(),
            symbol: profitable.symbol.clone(),
            new_leg_type: profitable.option_type,
            target_premium,
            reference_symbol: adverse.symbol.clone(),
        }
    }
}

impl ExitStrategy for PremiumExit {
    fn name(&self) -> &'static str {
        "premium_exit"
    }

    fn priority(&self) -> u32 {
        Self::PRIORITY
    }

    fn evaluate(&self, ctx: &ExitContext<'_>) -> ExitResult {
        let Some(levels) = ctx.premium else {
            return ExitResult::NoExit;
        };
        // Reduced leg set is not comparable with the stored entry premium
        if ctx.replacement_pending {
            return ExitResult::NoExit;
        }

        let combined = ctx.combined_ltp;
        if combined <= levels.target_level {
            return ExitResult::exit_all(
                ExitReason::new(ExitCode::PremiumDecayTargetHit)
                    .amount("Combined LTP", combined)
                    .amount("Entry", levels.entry_premium)
                    .amount("TargetLevel", levels.target_level)
                    .build(),
            );
        }
        if combined >= levels.stop_loss_level {
            return ExitResult::exit_all(
                ExitReason::new(ExitCode::PremiumExpansionSlHit)
                    .amount("Combined LTP", combined)
                    .amount("Entry", levels.entry_premium)
                    .amount("StopLossLevel", levels.stop_loss_level)
                    .build(),
            );
        }

        let midpoint = levels.midpoint();
        if self.leg_replacement && ctx.leg_count() == Self::ADJUSTABLE_LEGS && combined >= midpoint {
            return self.adjustment(ctx, midpoint);
        }
        ExitResult::NoExit
    }
}
