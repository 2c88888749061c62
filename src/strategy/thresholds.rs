use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::common::errors::{MonitorError, Result};

/// Fallback premium decay target (5%)
pub const DEFAULT_TARGET_DECAY: Decimal = dec!(0.05);

/// Fallback premium expansion stop (10%)
pub const DEFAULT_STOP_LOSS_EXPANSION: Decimal = dec!(0.10);

/// Normalise an operator-supplied percentage into a fraction
///
/// - `> 1`: a whole percentage, divided by 100 (`5` -> `0.05`)
/// - `(0, 1]`: already a fraction
/// - `<= 0`: `default`
pub fn normalize_pct(value: Decimal, default: Decimal) -> Decimal {
    if value > Decimal::ONE {
        value / dec!(100)
    } else if value > Decimal::ZERO {
        value
    } else {
        default
    }
}

/// Target and stop for cumulative exits (points or MTM amount)
///
/// Both values stay positive for the life of the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskBudget {
    pub target: Decimal,
    pub stop_loss: Decimal,
}

impl RiskBudget {
    pub fn new(target: Decimal, stop_loss: Decimal) -> Result<Self> {
        if target <= Decimal::ZERO {
            return Err(MonitorError::InvalidThreshold {
                name: "target",
                value: target,
            });
        }
        if stop_loss <= Decimal::ZERO {
            return Err(MonitorError::InvalidThreshold {
                name: "stop_loss",
                value: stop_loss,
            });
        }
        Ok(Self { target, stop_loss })
    }

    /// Budget after an individual leg was stopped out: the freed stop is added
    /// to the target.
    pub fn with_target_bump(&self, bump: Decimal) -> Self {
        Self {
            target: self.target + bump,
            stop_loss: self.stop_loss,
        }
    }
}

/// Premium-mode thresholds, always published as one unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PremiumLevels {
    pub entry_premium: Decimal,
    /// Normalised fraction
    pub target_decay_pct: Decimal,
    /// Normalised fraction
    pub stop_loss_expansion_pct: Decimal,
    pub target_level: Decimal,
    pub stop_loss_level: Decimal,
}

impl PremiumLevels {
    /// Build levels from raw operator inputs
    pub fn new(entry_premium: Decimal, target_decay: Decimal, stop_loss_expansion: Decimal) -> Result<Self> {
        let decay = normalize_pct(target_decay, DEFAULT_TARGET_DECAY);
        let expansion = normalize_pct(stop_loss_expansion, DEFAULT_STOP_LOSS_EXPANSION);
        Self::from_fractions(entry_premium, decay, expansion)
            .ok_or(MonitorError::NonPositivePremium(entry_premium))
    }

    fn from_fractions(entry_premium: Decimal, decay: Decimal, expansion: Decimal) -> Option<Self> {
        if entry_premium <= Decimal::ZERO {
            return None;
        }
        Some(Self {
            entry_premium,
            target_decay_pct: decay,
            stop_loss_expansion_pct: expansion,
            target_level: entry_premium * (Decimal::ONE - decay),
            stop_loss_level: entry_premium * (Decimal::ONE + expansion),
        })
    }

    /// Same percentages applied to a new entry premium
    ///
    /// `None` when the new premium is not positive.
    pub fn rebased(&self, entry_premium: Decimal) -> Option<Self> {
        Self::from_fractions(entry_premium, self.target_decay_pct, self.stop_loss_expansion_pct)
    }

    /// Halfway between entry and the expansion stop
    pub fn midpoint(&self) -> Decimal {
        self.entry_premium + (self.stop_loss_level - self.entry_premium) / dec!(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_pct_ranges() {
        assert_eq!(normalize_pct(dec!(5), DEFAULT_TARGET_DECAY), dec!(0.05));
        assert_eq!(normalize_pct(dec!(0.05), DEFAULT_TARGET_DECAY), dec!(0.05));
        assert_eq!(normalize_pct(dec!(1), DEFAULT_TARGET_DECAY), dec!(1));
        assert_eq!(normalize_pct(dec!(0), DEFAULT_TARGET_DECAY), DEFAULT_TARGET_DECAY);
        assert_eq!(normalize_pct(dec!(-3), DEFAULT_STOP_LOSS_EXPANSION), DEFAULT_STOP_LOSS_EXPANSION);
    }

    #[test]
    fn test_whole_and_fractional_inputs_agree() {
        let whole = PremiumLevels::new(dec!(180), dec!(5), dec!(10)).unwrap();
        let fraction = PremiumLevels::new(dec!(180), dec!(0.05), dec!(0.10)).unwrap();
        assert_eq!(whole, fraction);
        assert_eq!(whole.target_level, dec!(171));
        assert_eq!(whole.stop_loss_level, dec!(198));
        assert_eq!(whole.midpoint(), dec!(189));
    }

    #[test]
    fn test_defaults_apply_for_non_positive_inputs() {
        let levels = PremiumLevels::new(dec!(200), dec!(0), dec!(-1)).unwrap();
        assert_eq!(levels.target_level, dec!(190));
        assert_eq!(levels.stop_loss_level, dec!(220));
    }

    #[test]
    fn test_rebased_keeps_percentages() {
        let levels = PremiumLevels::new(dec!(180), dec!(5), dec!(10)).unwrap();
        let rebased = levels.rebased(dec!(211)).unwrap();
        assert_eq!(rebased.entry_premium, dec!(211));
        assert_eq!(rebased.target_level, dec!(200.45));
        assert_eq!(rebased.stop_loss_level, dec!(232.1));
        assert!(levels.rebased(Decimal::ZERO).is_none());
    }

    #[test]
    fn test_non_positive_premium_rejected() {
        assert!(matches!(
            PremiumLevels::new(Decimal::ZERO, dec!(5), dec!(10)),
            Err(MonitorError::NonPositivePremium(_))
        ));
    }

    #[test]
    fn test_risk_budget_validation_and_bump() {
        assert!(RiskBudget::new(dec!(0), dec!(2)).is_err());
        assert!(RiskBudget::new(dec!(2), dec!(-1)).is_err());

        let budget = RiskBudget::new(dec!(30), dec!(20)).unwrap();
        let bumped = budget.with_target_bump(budget.stop_loss);
        assert_eq!(bumped.target, dec!(50));
        assert_eq!(bumped.stop_loss, dec!(20));
    }
}
