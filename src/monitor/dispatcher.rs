//! Applies exit decisions to a monitor
//!
//! Each branch claims its side effect before invoking any callback: full exits
//! through the `active` CAS, per-leg exits through leg removal. Losing racers
//! return false and do nothing.

use rust_decimal::Decimal;
use std::sync::atomic::Ordering;
use tracing::{info, warn};

use crate::common::traits::LegReplacementRequest;
use crate::common::types::OptionType;
use crate::monitor::position::PositionMonitor;
use crate::strategy::{ExitCode, ExitReason, ExitResult};

impl PositionMonitor {
    /// Apply `result`; true when this call performed the action
    pub(crate) fn dispatch(&self, result: ExitResult) -> bool {
        match result {
            ExitResult::NoExit => false,
            ExitResult::ExitAll { reason } => self.exit_all(reason),
            ExitResult::ExitLeg {
                reason,
                symbol,
                target_bump,
            } => self.exit_leg(&reason, &symbol, target_bump),
            ExitResult::AdjustLeg {
                reason,
                symbol,
                new_leg_type,
                target_premium,
                reference_symbol,
            } => self.adjust_leg(&reason, &symbol, new_leg_type, target_premium, reference_symbol),
        }
    }

    fn exit_all(&self, reason: String) -> bool {
        if !self.terminate(reason) {
            return false;
        }
        let reason = self.exit_reason().unwrap_or_default();
        self.handler.on_exit_all(&self.owner, &self.execution_id, reason);
        true
    }

    fn exit_leg(&self, reason: &str, symbol: &str, target_bump: Option<Decimal>) -> bool {
        if !self.is_active() {
            return false;
        }
        let Some(leg) = self.legs.remove(symbol) else {
            return false;
        };
        info!(
            execution_id = %self.execution_id,
            symbol = %leg.symbol,
            last_price = %leg.current_price(),
            reason,
            "Exiting leg"
        );
        self.handler
            .on_exit_leg(&self.owner, &self.execution_id, &leg.symbol, reason);

        if let (Some(bump), Some(risk)) = (target_bump, &self.risk) {
            let budget = risk.update(|current| {
                let next = current.with_target_bump(bump);
                (next, next)
            });
            info!(
                execution_id = %self.execution_id,
                bump = %bump,
                target = %budget.target,
                "Risk budget transferred to target"
            );
        }

        if self.legs.load().is_empty() {
            self.exit_all(
                ExitReason::new(ExitCode::AllLegsExited)
                    .field("Last Leg", &leg.symbol)
                    .build(),
            );
        }
        true
    }

    fn adjust_leg(
        &self,
        reason: &str,
        symbol: &str,
        new_leg_type: OptionType,
        target_premium: Decimal,
        reference_symbol: String,
    ) -> bool {
        if !self.is_active() {
            return false;
        }
        if self.replacement_pending.swap(true, Ordering::AcqRel) {
            return false;
        }
        let Some(leg) = self.legs.remove(symbol) else {
            self.replacement_pending.store(false, Ordering::Release);
            warn!(execution_id = %self.execution_id, symbol, "Adjustment skipped, leg already gone");
            return false;
        };

        let request = LegReplacementRequest {
            execution_id: self.execution_id.clone(),
            exited_symbol: leg.symbol.clone(),
            new_leg_type,
            target_premium,
            reference_symbol,
            exited_leg_last_price: leg.current_price(),
            quantity: leg.quantity,
        };
        info!(
            execution_id = %self.execution_id,
            exited = %request.exited_symbol,
            new_leg_type = %request.new_leg_type,
            target_premium = %request.target_premium,
            reason,
            "Adjusting leg"
        );
        self.handler
            .on_exit_leg(&self.owner, &self.execution_id, &leg.symbol, reason);
        self.handler
            .on_leg_replacement_requested(&self.owner, &request);
        true
    }
}
