use chrono::NaiveDateTime;
use once_cell::sync::OnceCell;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::common::cells::Published;
use crate::common::clock::{Clock, SystemClock};
use crate::common::errors::{MonitorError, Result};
use crate::common::traits::ExitHandler;
use crate::common::types::{Direction, LegRole, OptionType, OwnerContext, Tick};
use crate::config::types::MonitorConfig;
use crate::monitor::legs::{LegRegistry, LegSnapshot, LegSpec};
use crate::strategy::{
    CumulativeExit, ExitChain, ExitCode, ExitContext, ExitPolicy, ExitReason, ForcedTimeExit,
    IndividualLegStop, PnlBasis, PremiumExit, PremiumLevels, RiskBudget, SharedExitStrategy,
    TrailingState, TrailingStop,
};

/// Live monitor for one multi-leg position
///
/// Ticks may arrive on several threads at once. Every decision that has a side
/// effect is claimed through an atomic first (the `active` flag for full exits,
/// leg removal for per-leg exits), so each callback fires at most once.
pub struct PositionMonitor {
    pub(super) execution_id: String,
    pub(super) owner: OwnerContext,
    pub(super) direction: Direction,
    pub(super) policy: ExitPolicy,
    pub(super) legs: LegRegistry,
    pub(super) risk: Option<Published<RiskBudget>>,
    pub(super) premium: Option<Published<PremiumLevels>>,
    pub(super) chain: ExitChain,
    pub(super) trailing: Option<Arc<TrailingStop>>,
    pub(super) forced_exit: Option<Arc<ForcedTimeExit>>,
    pub(super) active: AtomicBool,
    pub(super) replacement_pending: AtomicBool,
    pub(super) exit_reason: OnceCell<String>,
    pub(super) handler: Arc<dyn ExitHandler>,
    pub(super) clock: Arc<dyn Clock>,
}

/// Builds a [`PositionMonitor`] from its configuration
pub struct MonitorBuilder {
    config: MonitorConfig,
    handler: Option<Arc<dyn ExitHandler>>,
    clock: Option<Arc<dyn Clock>>,
}

impl MonitorBuilder {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            handler: None,
            clock: None,
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn ExitHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Defaults to the host's local wall clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validate the configuration and assemble the strategy chain
    pub fn build(self) -> Result<Arc<PositionMonitor>> {
        let MonitorConfig {
            execution_id,
            direction,
            exit_policy,
            trailing_stop,
            forced_exit,
            leg_stop,
            owner,
            legs,
        } = self.config;

        let handler = self
            .handler
            .ok_or_else(|| MonitorError::Configuration("exit handler is required".to_string()))?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::local()) as Arc<dyn Clock>);

        let legs = LegRegistry::new(legs)?;
        let mut strategies: Vec<SharedExitStrategy> = Vec::new();
        let mut risk = None;
        let mut premium = None;

        match &exit_policy {
            ExitPolicy::Points {
                target_points,
                stop_loss_points,
            } => {
                risk = Some(RiskBudget::new(*target_points, *stop_loss_points)?);
                strategies.push(Arc::new(CumulativeExit::new(PnlBasis::Points)));
            }
            ExitPolicy::Mtm {
                target_amount,
                stop_loss_amount,
            } => {
                risk = Some(RiskBudget::new(*target_amount, *stop_loss_amount)?);
                strategies.push(Arc::new(CumulativeExit::new(PnlBasis::Mtm)));
            }
            ExitPolicy::Premium {
                target_decay_pct,
                stop_loss_expansion_pct,
                leg_replacement,
            } => {
                premium = Some(PremiumLevels::new(
                    legs.load().entry_premium(),
                    *target_decay_pct,
                    *stop_loss_expansion_pct,
                )?);
                strategies.push(Arc::new(PremiumExit::new(*leg_replacement)));
            }
        }

        if let Some(leg_stop) = leg_stop {
            if direction != Direction::Short || !matches!(exit_policy, ExitPolicy::Points { .. }) {
                return Err(MonitorError::UnsupportedStrategy(format!(
                    "individual leg stop requires a SHORT position under POINTS (got {} / {})",
                    direction,
                    exit_policy.name()
                )));
            }
            strategies.push(Arc::new(IndividualLegStop::new(leg_stop.transfer_risk_budget)));
        }

        let trailing = match trailing_stop {
            Some(cfg) => {
                for (name, value) in [
                    ("activation_points", cfg.activation_points),
                    ("distance_points", cfg.distance_points),
                ] {
                    if value <= Decimal::ZERO {
                        return Err(MonitorError::InvalidThreshold { name, value });
                    }
                }
                let trailing = Arc::new(TrailingStop::new(cfg.activation_points, cfg.distance_points));
                strategies.push(trailing.clone());
                Some(trailing)
            }
            None => None,
        };

        let forced_exit = forced_exit.map(|cfg| {
            let forced = Arc::new(ForcedTimeExit::new(cfg.cutoff));
            strategies.push(forced.clone());
            forced
        });

        let chain = ExitChain::new(strategies);
        info!(
            execution_id = %execution_id,
            owner = %owner,
            direction = %direction,
            policy = exit_policy.name(),
            legs = legs.load().len(),
            strategies = ?chain.names(),
            "Position monitor created"
        );

        Ok(Arc::new(PositionMonitor {
            execution_id,
            owner,
            direction,
            policy: exit_policy,
            legs,
            risk: risk.map(Published::new),
            premium: premium.map(Published::new),
            chain,
            trailing,
            forced_exit,
            active: AtomicBool::new(true),
            replacement_pending: AtomicBool::new(false),
            exit_reason: OnceCell::new(),
            handler,
            clock,
        }))
    }
}

impl PositionMonitor {
    pub fn builder(config: MonitorConfig) -> MonitorBuilder {
        MonitorBuilder::new(config)
    }

    // =========================================================================
    // Tick path
    // =========================================================================

    /// Apply one price update and evaluate
    ///
    /// Returns false when the instrument is not one of this monitor's legs,
    /// the price was rejected, or the monitor has terminated.
    pub fn on_tick(&self, instrument_id: u64, ltp: f64) -> bool {
        if !self.is_active() {
            return false;
        }
        if !self.apply_price(&self.legs.load(), instrument_id, ltp) {
            return false;
        }
        self.evaluate();
        true
    }

    /// Apply every matching tick of a batch, then evaluate once
    pub fn on_ticks(&self, ticks: &[Tick]) -> bool {
        if !self.is_active() {
            return false;
        }
        let legs = self.legs.load();
        let mut touched = false;
        for tick in ticks {
            touched |= self.apply_price(&legs, tick.instrument_id, tick.ltp);
        }
        if touched {
            self.evaluate();
        }
        touched
    }

    /// Evaluate without a price change (lets time-based exits fire on a quiet feed)
    pub fn on_clock(&self) -> bool {
        self.evaluate()
    }

    fn apply_price(&self, legs: &LegSnapshot, instrument_id: u64, ltp: f64) -> bool {
        let Some(leg) = legs.by_instrument(instrument_id) else {
            return false;
        };
        if !leg.update_price(ltp) {
            debug!(execution_id = %self.execution_id, instrument_id, ltp, "Dropped invalid tick");
            return false;
        }
        true
    }

    /// Run the strategy chain against the current prices
    ///
    /// Returns true when a decision was applied.
    pub fn evaluate(&self) -> bool {
        if !self.is_active() {
            return false;
        }
        let legs = self.legs.load();
        if legs.is_empty() {
            return false;
        }
        let risk = self.risk.as_ref().map(Published::load);
        let premium = self.premium.as_ref().map(Published::load);

        let result = {
            let ctx = ExitContext::build(
                &legs,
                self.direction,
                risk.as_deref(),
                premium.as_deref(),
                self.clock.now(),
                self.replacement_pending.load(Ordering::Acquire),
            );
            self.chain.evaluate(&ctx)
        };
        self.dispatch(result)
    }

    // =========================================================================
    // Leg management
    // =========================================================================

    /// Add a leg to a live monitor
    ///
    /// Under the premium policy the entry premium and both levels are rebased
    /// onto the new leg set.
    pub fn add_leg(&self, spec: LegSpec) -> Result<()> {
        self.ensure_active()?;
        let leg = self.legs.add(spec)?;
        info!(
            execution_id = %self.execution_id,
            symbol = %leg.symbol,
            instrument_id = leg.instrument_id,
            entry_price = %leg.entry_price,
            "Leg added"
        );
        self.rebase_after_leg_change();
        Ok(())
    }

    /// Drop a leg the caller has already unwound
    ///
    /// No callback fires. Removing the last leg terminates the monitor silently
    /// with `ALL_LEGS_EXITED`; otherwise premium levels follow the remaining legs.
    pub fn remove_leg(&self, symbol: &str) -> Result<()> {
        let leg = self
            .legs
            .remove(symbol)
            .ok_or_else(|| MonitorError::LegNotFound(symbol.to_string()))?;
        info!(execution_id = %self.execution_id, symbol = %leg.symbol, "Leg removed");

        if self.legs.load().is_empty() {
            self.terminate(
                ExitReason::new(ExitCode::AllLegsExited)
                    .field("Last Leg", &leg.symbol)
                    .build(),
            );
        } else {
            self.rebase_after_leg_change();
        }
        Ok(())
    }

    // =========================================================================
    // Thresholds
    // =========================================================================

    /// Override the entry premium and recompute both premium levels
    ///
    /// Ignored with a warning under non-premium policies or for a
    /// non-positive premium.
    pub fn set_entry_premium(&self, entry_premium: Decimal) {
        let Some(levels) = &self.premium else {
            warn!(
                execution_id = %self.execution_id,
                policy = self.policy.name(),
                "set_entry_premium ignored: not a premium policy"
            );
            return;
        };
        let applied = levels.try_update(|current| {
            current
                .rebased(entry_premium)
                .map(|next| (next, next))
                .ok_or(())
        });
        match applied {
            Ok(next) => info!(
                execution_id = %self.execution_id,
                entry_premium = %next.entry_premium,
                target_level = %next.target_level,
                stop_loss_level = %next.stop_loss_level,
                "Entry premium updated"
            ),
            Err(()) => warn!(
                execution_id = %self.execution_id,
                entry_premium = %entry_premium,
                "set_entry_premium ignored: premium must be positive"
            ),
        }
    }

    /// Replace the cumulative target and stop
    ///
    /// Ignored with a warning under the premium policy.
    pub fn update_risk_budget(&self, target: Decimal, stop_loss: Decimal) -> Result<()> {
        let Some(risk) = &self.risk else {
            warn!(
                execution_id = %self.execution_id,
                policy = self.policy.name(),
                "update_risk_budget ignored: premium policy"
            );
            return Ok(());
        };
        let budget = RiskBudget::new(target, stop_loss)?;
        risk.store(budget);
        info!(
            execution_id = %self.execution_id,
            target = %budget.target,
            stop_loss = %budget.stop_loss,
            "Risk budget updated"
        );
        Ok(())
    }

    // =========================================================================
    // Leg replacement
    // =========================================================================

    /// Install the leg sold in place of an adjusted one
    ///
    /// Entry premium becomes the sum of all entry prices and both levels are
    /// recomputed from the stored percentages before the pending flag clears.
    pub fn add_replacement_leg(&self, spec: LegSpec) -> Result<()> {
        let Some(levels) = &self.premium else {
            warn!(
                execution_id = %self.execution_id,
                policy = self.policy.name(),
                "add_replacement_leg ignored: not a premium policy"
            );
            return Ok(());
        };
        self.ensure_active()?;
        let leg = self.legs.add(spec)?;
        let next = self.rebase_premium(levels)?;
        self.replacement_pending.store(false, Ordering::Release);
        info!(
            execution_id = %self.execution_id,
            symbol = %leg.symbol,
            entry_price = %leg.entry_price,
            entry_premium = %next.entry_premium,
            target_level = %next.target_level,
            stop_loss_level = %next.stop_loss_level,
            "Replacement leg added"
        );
        Ok(())
    }

    /// Give up on a pending replacement and continue on the surviving legs
    pub fn abandon_replacement(&self) {
        if !self.replacement_pending.load(Ordering::Acquire) {
            return;
        }
        if let Some(levels) = &self.premium {
            match self.rebase_premium(levels) {
                Ok(next) => warn!(
                    execution_id = %self.execution_id,
                    legs = self.legs.load().len(),
                    entry_premium = %next.entry_premium,
                    target_level = %next.target_level,
                    stop_loss_level = %next.stop_loss_level,
                    "Replacement abandoned, monitoring reduced leg set"
                ),
                Err(e) => warn!(
                    execution_id = %self.execution_id,
                    error = %e,
                    "Replacement abandoned, premium levels unchanged"
                ),
            }
        }
        self.replacement_pending.store(false, Ordering::Release);
    }

    /// Recompute premium levels from the legs currently held
    ///
    /// The leg table is read under the levels writer, so the last rebase to
    /// run always sees every leg change that preceded it.
    fn rebase_premium(&self, levels: &Published<PremiumLevels>) -> Result<PremiumLevels> {
        levels.try_update(|current| {
            let entry_premium = self.legs.load().entry_premium();
            current
                .rebased(entry_premium)
                .map(|next| (next, next))
                .ok_or(MonitorError::NonPositivePremium(entry_premium))
        })
    }

    fn rebase_after_leg_change(&self) {
        let Some(levels) = &self.premium else {
            return;
        };
        match self.rebase_premium(levels) {
            Ok(next) => info!(
                execution_id = %self.execution_id,
                entry_premium = %next.entry_premium,
                target_level = %next.target_level,
                stop_loss_level = %next.stop_loss_level,
                "Premium levels rebased"
            ),
            Err(e) => warn!(
                execution_id = %self.execution_id,
                error = %e,
                "Premium levels unchanged after leg change"
            ),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Terminate without any exit callback
    ///
    /// Returns true for the call that actually stopped the monitor.
    pub fn stop(&self) -> bool {
        self.terminate(ExitCode::MonitorStopped.as_str().to_string())
    }

    /// Flip `active` and record the reason; only the winning caller gets true
    pub(super) fn terminate(&self, reason: String) -> bool {
        if self
            .active
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        let reason = self.exit_reason.get_or_init(|| reason);
        info!(execution_id = %self.execution_id, owner = %self.owner, reason = %reason, "Monitor terminated");
        true
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(MonitorError::MonitorInactive(self.execution_id.clone()))
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn owner(&self) -> &OwnerContext {
        &self.owner
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn policy(&self) -> &ExitPolicy {
        &self.policy
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn exit_reason(&self) -> Option<&str> {
        self.exit_reason.get().map(String::as_str)
    }

    pub fn is_replacement_pending(&self) -> bool {
        self.replacement_pending.load(Ordering::Acquire)
    }

    pub fn legs(&self) -> Arc<LegSnapshot> {
        self.legs.load()
    }

    pub fn risk_budget(&self) -> Option<RiskBudget> {
        self.risk.as_ref().map(|r| *r.load())
    }

    pub fn premium_levels(&self) -> Option<PremiumLevels> {
        self.premium.as_ref().map(|p| *p.load())
    }

    pub fn trailing_state(&self) -> Option<TrailingState> {
        self.trailing.as_ref().map(|t| t.state())
    }

    pub fn forced_exit_triggered(&self) -> bool {
        self.forced_exit.as_ref().is_some_and(|f| f.is_triggered())
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.chain.names()
    }

    /// Serializable view of the monitor at this instant
    pub fn snapshot(&self) -> MonitorSnapshot {
        let legs = self.legs.load();
        let risk = self.risk_budget();
        let premium = self.premium_levels();
        let now = self.clock.now();
        let ctx = ExitContext::build(
            &legs,
            self.direction,
            risk.as_ref(),
            premium.as_ref(),
            now,
            self.is_replacement_pending(),
        );

        MonitorSnapshot {
            execution_id: self.execution_id.clone(),
            owner: self.owner.clone(),
            direction: self.direction,
            policy: self.policy.name(),
            active: self.is_active(),
            exit_reason: self.exit_reason().map(str::to_string),
            replacement_pending: ctx.replacement_pending,
            legs: (0..ctx.leg_count())
                .map(|i| {
                    let leg = ctx.leg(i);
                    LegView {
                        symbol: leg.symbol.clone(),
                        instrument_id: leg.instrument_id,
                        option_type: leg.option_type,
                        role: leg.role,
                        quantity: leg.quantity,
                        entry_price: leg.entry_price,
                        current_price: ctx.leg_price(i),
                        pnl: ctx.leg_pnl(i),
                    }
                })
                .collect(),
            cumulative_pnl: ctx.cumulative_pnl,
            cumulative_mtm: ctx.cumulative_mtm,
            combined_ltp: ctx.combined_ltp,
            risk,
            premium,
            trailing: self.trailing_state(),
            captured_at: now,
        }
    }
}

impl fmt::Debug for PositionMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PositionMonitor")
            .field("execution_id", &self.execution_id)
            .field("owner", &self.owner)
            .field("direction", &self.direction)
            .field("policy", &self.policy.name())
            .field("active", &self.is_active())
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}

/// Read-only monitor state for logs and replay summaries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorSnapshot {
    pub execution_id: String,
    pub owner: OwnerContext,
    pub direction: Direction,
    pub policy: &'static str,
    pub active: bool,
    pub exit_reason: Option<String>,
    pub replacement_pending: bool,
    pub legs: Vec<LegView>,
    pub cumulative_pnl: Decimal,
    pub cumulative_mtm: Decimal,
    pub combined_ltp: Decimal,
    pub risk: Option<RiskBudget>,
    pub premium: Option<PremiumLevels>,
    pub trailing: Option<TrailingState>,
    pub captured_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegView {
    pub symbol: String,
    pub instrument_id: u64,
    pub option_type: OptionType,
    pub role: LegRole,
    pub quantity: u32,
    pub entry_price: Decimal,
    pub current_price: Decimal,
    pub pnl: Decimal,
}
