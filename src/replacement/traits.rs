//! Order-placement seam used by the replacement coordinator

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::errors::Result;
use crate::common::types::{OptionType, OwnerContext};
use crate::monitor::LegSpec;

/// Live quote for a candidate instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub instrument_id: u64,
    pub symbol: String,
    pub option_type: OptionType,
    pub last_price: Decimal,
}

/// Fill reported back by the placement collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilledOrder {
    pub order_id: String,
    pub symbol: String,
    pub instrument_id: u64,
    pub option_type: OptionType,
    pub price: Decimal,
    pub quantity: u32,
}

impl FilledOrder {
    /// Leg to install in the monitor for this fill
    pub fn to_leg_spec(&self) -> LegSpec {
        LegSpec::new(
            self.order_id.clone(),
            self.symbol.clone(),
            self.instrument_id,
            self.price,
            self.quantity,
            self.option_type,
        )
    }
}

/// Order placement collaborator
///
/// Runs on the worker path, never on the tick path.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderPlacement: Send + Sync {
    /// Live quotes for every tradable instrument of `option_type`
    async fn quotes(&self, option_type: OptionType) -> Result<Vec<Quote>>;

    /// Sell `quantity` of the quoted instrument (short convention)
    async fn sell(&self, quote: &Quote, quantity: u32, owner: &OwnerContext) -> Result<FilledOrder>;
}
