use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Write};

use crate::common::types::OptionType;

/// Exit policy, fixed when the monitor is built
///
/// Exactly one cumulative evaluator exists per monitor, so point-based and
/// premium-based exits can never run side by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ExitPolicy {
    /// Fixed point target/stop on cumulative P&L
    Points {
        target_points: Decimal,
        stop_loss_points: Decimal,
    },
    /// Combined-premium decay target / expansion stop
    Premium {
        /// Whole percentage (`5`) or fraction (`0.05`); `<= 0` means default
        #[serde(default)]
        target_decay_pct: Decimal,
        /// Whole percentage (`10`) or fraction (`0.10`); `<= 0` means default
        #[serde(default)]
        stop_loss_expansion_pct: Decimal,
        /// Swap the profitable leg when the premium crosses the stop midpoint
        #[serde(default = "default_leg_replacement")]
        leg_replacement: bool,
    },
    /// Quantity-weighted cumulative P&L target/stop
    Mtm {
        target_amount: Decimal,
        stop_loss_amount: Decimal,
    },
}

fn default_leg_replacement() -> bool {
    true
}

impl ExitPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            ExitPolicy::Points { .. } => "POINTS",
            ExitPolicy::Premium { .. } => "PREMIUM",
            ExitPolicy::Mtm { .. } => "MTM",
        }
    }

    pub fn is_premium(&self) -> bool {
        matches!(self, ExitPolicy::Premium { .. })
    }
}

/// Stable exit reason codes
///
/// Downstream classification keys on these strings; never rename a variant's
/// text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitCode {
    TimeBasedForcedExit,
    PremiumDecayTargetHit,
    PremiumExpansionSlHit,
    PremiumLegAdjustment,
    CumulativeTargetHit,
    CumulativeStoplossHit,
    MtmTargetHit,
    MtmStoplossHit,
    IndividualLegStoplossHit,
    TrailingStopHit,
    AllLegsExited,
    MonitorStopped,
}

impl ExitCode {
    const ALL: [ExitCode; 12] = [
        ExitCode::TimeBasedForcedExit,
        ExitCode::PremiumDecayTargetHit,
        ExitCode::PremiumExpansionSlHit,
        ExitCode::PremiumLegAdjustment,
        ExitCode::CumulativeTargetHit,
        ExitCode::CumulativeStoplossHit,
        ExitCode::MtmTargetHit,
        ExitCode::MtmStoplossHit,
        ExitCode::IndividualLegStoplossHit,
        ExitCode::TrailingStopHit,
        ExitCode::AllLegsExited,
        ExitCode::MonitorStopped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExitCode::TimeBasedForcedExit => "TIME_BASED_FORCED_EXIT",
            ExitCode::PremiumDecayTargetHit => "PREMIUM_DECAY_TARGET_HIT",
            ExitCode::PremiumExpansionSlHit => "PREMIUM_EXPANSION_SL_HIT",
            ExitCode::PremiumLegAdjustment => "PREMIUM_LEG_ADJUSTMENT",
            ExitCode::CumulativeTargetHit => "CUMULATIVE_TARGET_HIT",
            ExitCode::CumulativeStoplossHit => "CUMULATIVE_STOPLOSS_HIT",
            ExitCode::MtmTargetHit => "MTM_TARGET_HIT",
            ExitCode::MtmStoplossHit => "MTM_STOPLOSS_HIT",
            ExitCode::IndividualLegStoplossHit => "INDIVIDUAL_LEG_STOPLOSS_HIT",
            ExitCode::TrailingStopHit => "TRAILING_STOP_HIT",
            ExitCode::AllLegsExited => "ALL_LEGS_EXITED",
            ExitCode::MonitorStopped => "MONITOR_STOPPED",
        }
    }

    /// Classify a reason string by its leading code
    pub fn from_reason(reason: &str) -> Option<Self> {
        let code = reason.split_whitespace().next()?;
        Self::ALL.into_iter().find(|c| c.as_str() == code)
    }
}

impl Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builder for `"<CODE> (<key>: <value>, ...)"` reason strings
///
/// Only constructed once an exit fires.
#[derive(Debug)]
pub struct ExitReason {
    text: String,
    has_fields: bool,
}

impl ExitReason {
    pub fn new(code: ExitCode) -> Self {
        Self {
            text: code.as_str().to_string(),
            has_fields: false,
        }
    }

    /// Append a value rendered to two decimal places
    pub fn amount(self, key: &str, value: Decimal) -> Self {
        self.field(key, format_args!("{:.2}", value))
    }

    /// Append any displayable value
    pub fn field(mut self, key: &str, value: impl Display) -> Self {
        self.text.push_str(if self.has_fields { ", " } else { " (" });
        let _ = write!(self.text, "{}: {}", key, value);
        self.has_fields = true;
        self
    }

    pub fn build(mut self) -> String {
        if self.has_fields {
            self.text.push(')');
        }
        self.text
    }
}

/// Outcome of evaluating one strategy against one tick
#[derive(Debug, Clone, PartialEq)]
pub enum ExitResult {
    /// Keep monitoring
    NoExit,
    /// Unwind the whole position and terminate the monitor
    ExitAll { reason: String },
    /// Unwind a single leg
    ExitLeg {
        reason: String,
        symbol: String,
        /// Points added to the target once the leg is gone
        target_bump: Option<Decimal>,
    },
    /// Unwind a leg and request a replacement of `new_leg_type`
    AdjustLeg {
        reason: String,
        symbol: String,
        new_leg_type: OptionType,
        target_premium: Decimal,
        reference_symbol: String,
    },
}

impl ExitResult {
    pub fn exit_all(reason: impl Into<String>) -> Self {
        Self::ExitAll {
            reason: reason.into(),
        }
    }

    /// Anything other than `NoExit`
    pub fn is_exit(&self) -> bool {
        !matches!(self, Self::NoExit)
    }

    /// Terminates the monitor
    pub fn is_full_exit(&self) -> bool {
        matches!(self, Self::ExitAll { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::NoExit => None,
            Self::ExitAll { reason }
            | Self::ExitLeg { reason, .. }
            | Self::AdjustLeg { reason, .. } => Some(reason),
        }
    }

    pub fn code(&self) -> Option<ExitCode> {
        self.reason().and_then(ExitCode::from_reason)
    }
}
