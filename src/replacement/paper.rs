//! Paper order placement over a tick-fed quote board

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

use crate::common::errors::{MonitorError, Result};
use crate::common::types::{OptionType, OwnerContext, Tick};
use crate::config::types::InstrumentConfig;
use crate::replacement::traits::{FilledOrder, OrderPlacement, Quote};

/// Fills sells at the last traded price of a configured instrument universe
#[derive(Debug)]
pub struct PaperPlacement {
    universe: HashMap<u64, InstrumentConfig>,
    last_prices: RwLock<HashMap<u64, Decimal>>,
    next_order: AtomicU64,
}

impl PaperPlacement {
    pub fn new(universe: Vec<InstrumentConfig>) -> Self {
        Self {
            universe: universe
                .into_iter()
                .map(|instrument| (instrument.instrument_id, instrument))
                .collect(),
            last_prices: RwLock::new(HashMap::new()),
            next_order: AtomicU64::new(1),
        }
    }

    /// Record prices for instruments in the universe; others are ignored
    pub fn on_batch(&self, ticks: &[Tick]) {
        let mut prices = self.last_prices.write();
        for tick in ticks {
            if !self.universe.contains_key(&tick.instrument_id) {
                continue;
            }
            match Decimal::try_from(tick.ltp) {
                Ok(price) if price > Decimal::ZERO => {
                    prices.insert(tick.instrument_id, price.round_dp(4));
                }
                _ => debug!(instrument_id = tick.instrument_id, ltp = tick.ltp, "Ignored invalid quote"),
            }
        }
    }

    pub fn last_price(&self, instrument_id: u64) -> Option<Decimal> {
        self.last_prices.read().get(&instrument_id).copied()
    }

    pub fn universe_len(&self) -> usize {
        self.universe.len()
    }
}

#[async_trait]
impl OrderPlacement for PaperPlacement {
    async fn quotes(&self, option_type: OptionType) -> Result<Vec<Quote>> {
        let prices = self.last_prices.read();
        let mut quotes: Vec<Quote> = self
            .universe
            .values()
            .filter(|instrument| instrument.option_type == option_type)
            .filter_map(|instrument| {
                prices.get(&instrument.instrument_id).map(|&last_price| Quote {
                    instrument_id: instrument.instrument_id,
                    symbol: instrument.symbol.clone(),
                    option_type,
                    last_price,
                })
            })
            .collect();
        quotes.sort_by_key(|quote| quote.instrument_id);
        Ok(quotes)
    }

    async fn sell(&self, quote: &Quote, quantity: u32, owner: &OwnerContext) -> Result<FilledOrder> {
        let instrument = self.universe.get(&quote.instrument_id).ok_or_else(|| {
            MonitorError::Placement(format!("{} is not in the paper universe", quote.symbol))
        })?;
        let price = self
            .last_price(quote.instrument_id)
            .ok_or_else(|| MonitorError::Placement(format!("no price for {}", quote.symbol)))?;

        let order_id = format!("PAPER-{:06}", self.next_order.fetch_add(1, Ordering::Relaxed));
        info!(
            order_id = %order_id,
            symbol = %instrument.symbol,
            price = %price,
            quantity,
            owner = %owner,
            "Paper sell filled"
        );
        Ok(FilledOrder {
            order_id,
            symbol: instrument.symbol.clone(),
            instrument_id: instrument.instrument_id,
            option_type: instrument.option_type,
            price,
            quantity,
        })
    }
}
