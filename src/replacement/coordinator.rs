use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::common::traits::LegReplacementRequest;
use crate::common::types::OwnerContext;
use crate::monitor::PositionMonitor;
use crate::replacement::selection::select_replacement;
use crate::replacement::traits::{FilledOrder, OrderPlacement};

/// How a replacement request ended
#[derive(Debug, Clone, PartialEq)]
pub enum ReplacementOutcome {
    /// New leg sold and installed
    Filled(FilledOrder),
    /// Monitor continues on the reduced leg set
    Abandoned { reason: String },
    /// Sold but not installed (the monitor terminated mid-flight); the
    /// caller owns the fill and must square it off
    Orphaned { fill: FilledOrder, reason: String },
    /// Monitor had already terminated; nothing was placed
    Skipped,
}

/// Drives a leg replacement from request to `add_replacement_leg`
pub struct ReplacementCoordinator {
    placement: Arc<dyn OrderPlacement>,
    near_match_tolerance: Decimal,
}

impl ReplacementCoordinator {
    pub fn new(placement: Arc<dyn OrderPlacement>, near_match_tolerance: Decimal) -> Self {
        Self {
            placement,
            near_match_tolerance,
        }
    }

    /// Search, sell and install a replacement
    ///
    /// Any failure along the way abandons the replacement on the monitor. A
    /// fill that cannot be installed comes back as [`ReplacementOutcome::Orphaned`].
    #[instrument(
        skip(self, monitor, owner, request),
        fields(execution_id = %request.execution_id, exited = %request.exited_symbol)
    )]
    pub async fn replace(
        &self,
        monitor: &PositionMonitor,
        owner: &OwnerContext,
        request: &LegReplacementRequest,
    ) -> ReplacementOutcome {
        if !monitor.is_active() {
            info!("Monitor already terminated, replacement skipped");
            return ReplacementOutcome::Skipped;
        }

        let quotes = match self.placement.quotes(request.new_leg_type).await {
            Ok(quotes) => quotes,
            Err(e) => return self.abandon(monitor, format!("quote lookup failed: {}", e)),
        };
        let held = monitor.legs();
        let Some(quote) = select_replacement(&quotes, request, &held, self.near_match_tolerance) else {
            return self.abandon(
                monitor,
                format!(
                    "no {} candidate above {} among {} quotes",
                    request.new_leg_type,
                    request.exited_leg_last_price,
                    quotes.len()
                ),
            );
        };
        info!(
            symbol = %quote.symbol,
            last_price = %quote.last_price,
            target_premium = %request.target_premium,
            "Replacement candidate selected"
        );

        let fill = match self.placement.sell(quote, request.quantity, owner).await {
            Ok(fill) => fill,
            Err(e) => return self.abandon(monitor, format!("sell {} failed: {}", quote.symbol, e)),
        };

        match monitor.add_replacement_leg(fill.to_leg_spec()) {
            Ok(()) => {
                info!(order_id = %fill.order_id, symbol = %fill.symbol, price = %fill.price, "Replacement leg filled");
                ReplacementOutcome::Filled(fill)
            }
            Err(e) => {
                error!(
                    order_id = %fill.order_id,
                    symbol = %fill.symbol,
                    error = %e,
                    "Replacement filled but could not be installed"
                );
                monitor.abandon_replacement();
                ReplacementOutcome::Orphaned {
                    reason: format!("install {} failed: {}", fill.symbol, e),
                    fill,
                }
            }
        }
    }

    fn abandon(&self, monitor: &PositionMonitor, reason: String) -> ReplacementOutcome {
        warn!(reason = %reason, "Leg replacement abandoned");
        monitor.abandon_replacement();
        ReplacementOutcome::Abandoned { reason }
    }
}
