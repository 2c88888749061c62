use std::sync::Arc;
use tracing::debug;

use crate::strategy::context::ExitContext;
use crate::strategy::types::ExitResult;

/// Core exit strategy trait
///
/// Strategies read the shared [`ExitContext`] and return an [`ExitResult`].
/// Evaluation may run on several feed threads at once, so any running state
/// (high-water marks, one-shot flags) lives in atomics behind `&self`.
///
/// # Implementation Notes
///
/// - `evaluate` is on the hot path: no blocking I/O, no locks, and no
///   allocation unless an exit actually fires
/// - Never mutate monitor state directly; the dispatcher applies results
pub trait ExitStrategy: Send + Sync {
    /// Unique identifier for this strategy
    fn name(&self) -> &'static str;

    /// Lower runs first
    fn priority(&self) -> u32;

    /// Inspect the tick snapshot
    ///
    /// # Returns
    /// * `ExitResult::NoExit` - Keep monitoring
    /// * anything else - Stop the chain for this tick and apply the result
    fn evaluate(&self, ctx: &ExitContext<'_>) -> ExitResult;
}

/// Shared strategy for dynamic dispatch
pub type SharedExitStrategy = Arc<dyn ExitStrategy>;

/// Strategies ordered by ascending priority
pub struct ExitChain {
    strategies: Vec<SharedExitStrategy>,
}

impl ExitChain {
    pub fn new(mut strategies: Vec<SharedExitStrategy>) -> Self {
        strategies.sort_by_key(|s| s.priority());
        Self { strategies }
    }

    /// Run strategies in order until one asks for an exit
    pub fn evaluate(&self, ctx: &ExitContext<'_>) -> ExitResult {
        for strategy in &self.strategies {
            let result = strategy.evaluate(ctx);
            if result.is_exit() {
                debug!(strategy = strategy.name(), priority = strategy.priority(), "Exit strategy fired");
                return result;
            }
        }
        ExitResult::NoExit
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl std::fmt::Debug for ExitChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::{Direction, OptionType};
    use crate::monitor::legs::{LegRegistry, LegSpec};
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        name: &'static str,
        priority: u32,
        result: ExitResult,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(name: &'static str, priority: u32, result: ExitResult) -> Arc<Self> {
            Arc::new(Self {
                name,
                priority,
                result,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl ExitStrategy for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        fn priority(&self) -> u32 {
            self.priority
        }

        fn evaluate(&self, _ctx: &ExitContext<'_>) -> ExitResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    #[test]
    fn test_chain_orders_by_priority_and_short_circuits() {
        let late = Fixed::new("late", 300, ExitResult::exit_all("LATE"));
        let early = Fixed::new("early", 0, ExitResult::NoExit);
        let mid = Fixed::new("mid", 100, ExitResult::exit_all("MID"));
        let chain = ExitChain::new(vec![
            late.clone() as SharedExitStrategy,
            early.clone() as SharedExitStrategy,
            mid.clone() as SharedExitStrategy,
        ]);
        assert_eq!(chain.names(), vec!["early", "mid", "late"]);

        let registry =
            LegRegistry::new(vec![LegSpec::new("o", "CE", 1, dec!(100), 1, OptionType::Ce)]).unwrap();
        let legs = registry.load();
        let now = chrono::NaiveDate::from_ymd_opt(2024, 5, 2)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let ctx = ExitContext::build(&legs, Direction::Short, None, None, now, false);

        assert_eq!(chain.evaluate(&ctx), ExitResult::exit_all("MID"));
        assert_eq!(early.calls.load(Ordering::SeqCst), 1);
        assert_eq!(late.calls.load(Ordering::SeqCst), 0);
    }
}
