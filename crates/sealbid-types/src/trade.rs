//! Trade records produced by the matching sweep.
//!
//! A [`Trade`] is the immutable record of one fill between a revealed bid
//! and an offer. Settlement always happens at the offer's price.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, AssetId, BidNumber, EpochId, OfferNumber, TradeId};

/// A trade produced by the matching sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Deterministic from (bid, offer).
    pub id: TradeId,
    /// The auction cycle that produced this trade.
    pub epoch_id: EpochId,
    pub asset: AssetId,
    pub offer_number: OfferNumber,
    pub bid_number: BidNumber,
    /// Settlement price: the offer's quoted price.
    pub price: Decimal,
    /// The bid's own price (never lower than `price`).
    pub bid_price: Decimal,
    /// Executed quantity of `asset`.
    pub quantity: Decimal,
    /// Settlement amount paid by the buyer = price × quantity.
    pub cost: Decimal,
    /// Reserved funds returned to the buyer = quantity × (bid_price − price),
    /// zero when nothing was reserved up front.
    pub refund: Decimal,
    pub seller: AccountId,
    pub buyer: AccountId,
    pub executed_at: DateTime<Utc>,
}

impl Trade {
    /// Price improvement per unit the buyer received over its own bid.
    #[must_use]
    pub fn price_improvement(&self) -> Decimal {
        self.bid_price - self.price
    }
}

impl std::fmt::Display for Trade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Trade[{}] {} x {} {} {} @ {} = {}",
            self.id,
            self.bid_number,
            self.offer_number,
            self.quantity,
            self.asset,
            self.price,
            self.cost,
        )
    }
}
