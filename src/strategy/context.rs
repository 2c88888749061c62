use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::common::types::Direction;
use crate::monitor::legs::{Leg, LegSnapshot, MAX_LEGS};
use crate::strategy::thresholds::{PremiumLevels, RiskBudget};

/// Per-tick view shared by every strategy in the chain
///
/// Leg prices are read once into a stack array so every strategy sees the
/// same numbers even while the feed keeps writing. Building it allocates
/// nothing.
#[derive(Debug)]
pub struct ExitContext<'a> {
    legs: &'a LegSnapshot,
    prices: [Decimal; MAX_LEGS],
    pub direction: Direction,
    /// Σ (price - entry) * direction * role
    pub cumulative_pnl: Decimal,
    /// Σ (price - entry) * direction * role * quantity
    pub cumulative_mtm: Decimal,
    /// Σ price
    pub combined_ltp: Decimal,
    pub risk: Option<&'a RiskBudget>,
    pub premium: Option<&'a PremiumLevels>,
    pub now: NaiveDateTime,
    pub replacement_pending: bool,
}

impl<'a> ExitContext<'a> {
    pub fn build(
        legs: &'a LegSnapshot,
        direction: Direction,
        risk: Option<&'a RiskBudget>,
        premium: Option<&'a PremiumLevels>,
        now: NaiveDateTime,
        replacement_pending: bool,
    ) -> Self {
        let mut prices = [Decimal::ZERO; MAX_LEGS];
        let mut cumulative_pnl = Decimal::ZERO;
        let mut cumulative_mtm = Decimal::ZERO;
        let mut combined_ltp = Decimal::ZERO;

        for (slot, leg) in prices.iter_mut().zip(legs.legs()) {
            let price = leg.current_price();
            let pnl = leg.pnl_at(price, direction);
            *slot = price;
            cumulative_pnl += pnl;
            cumulative_mtm += pnl * Decimal::from(leg.quantity);
            combined_ltp += price;
        }

        Self {
            legs,
            prices,
            direction,
            cumulative_pnl,
            cumulative_mtm,
            combined_ltp,
            risk,
            premium,
            now,
            replacement_pending,
        }
    }

    pub fn leg_count(&self) -> usize {
        self.legs.len().min(MAX_LEGS)
    }

    pub fn leg(&self, index: usize) -> &Arc<Leg> {
        &self.legs.legs()[index]
    }

    /// Price captured for this tick
    pub fn leg_price(&self, index: usize) -> Decimal {
        self.prices[index]
    }

    /// P&L in points of one leg at the captured price
    pub fn leg_pnl(&self, index: usize) -> Decimal {
        self.leg(index).pnl_at(self.prices[index], self.direction)
    }
}
