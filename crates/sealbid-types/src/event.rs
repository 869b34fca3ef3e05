//! Event records for the Sealbid audit trail.
//!
//! Every state-changing entry point emits exactly one [`MarketEvent`]
//! (the sweep emits one per trade). Records are ordered by a 1-based
//! sequence number and never change once emitted; together they carry
//! enough detail to rebuild every ledger delta off-system.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, AssetId, BidNumber, EpochId, Holding, OfferNumber, Phase, Trade};

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketEvent {
    /// Funds entered escrow.
    Deposit {
        account: AccountId,
        holding: Holding,
        amount: Decimal,
    },
    /// Funds left escrow.
    Withdraw {
        account: AccountId,
        holding: Holding,
        amount: Decimal,
    },
    OfferAdded {
        offer_number: OfferNumber,
        seller: AccountId,
        asset: AssetId,
        price: Decimal,
        quantity: Decimal,
        /// Token quantity moved into escrow at creation (zero when escrow
        /// is taken at settlement time).
        reserved: Decimal,
    },
    OfferChanged {
        offer_number: OfferNumber,
        old_price: Decimal,
        new_price: Decimal,
    },
    OfferRemoved {
        offer_number: OfferNumber,
        seller: AccountId,
        /// Quantity that traded before the offer was withdrawn.
        filled: Decimal,
        /// Escrow returned to the seller's available token balance.
        released: Decimal,
    },
    BidAdded {
        bid_number: BidNumber,
        committer: AccountId,
        sealed: bool,
        /// Settlement funds reserved at submission (plain bids only).
        reserved: Decimal,
    },
    BidRevealed {
        bid_number: BidNumber,
        revealer: AccountId,
        asset: AssetId,
        price: Decimal,
        quantity: Decimal,
        reserved: Decimal,
    },
    BidRemoved {
        bid_number: BidNumber,
        committer: AccountId,
        released: Decimal,
    },
    Trade(Trade),
    PhaseAdvanced {
        from: Phase,
        to: Phase,
        /// Set when the administrator override moved the phase.
        forced: bool,
    },
    /// A token became depositable.
    AssetRegistered { asset: AssetId },
}

impl MarketEvent {
    /// Short uppercase tag, e.g. for log lines.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Deposit { .. } => "DEPOSIT",
            Self::Withdraw { .. } => "WITHDRAW",
            Self::OfferAdded { .. } => "OFFER_ADDED",
            Self::OfferChanged { .. } => "OFFER_CHANGED",
            Self::OfferRemoved { .. } => "OFFER_REMOVED",
            Self::BidAdded { .. } => "BID_ADDED",
            Self::BidRevealed { .. } => "BID_REVEALED",
            Self::BidRemoved { .. } => "BID_REMOVED",
            Self::Trade(_) => "TRADE",
            Self::PhaseAdvanced { .. } => "PHASE_ADVANCED",
            Self::AssetRegistered { .. } => "ASSET_REGISTERED",
        }
    }
}

/// One entry of the append-only event journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// 1-based, strictly increasing.
    pub sequence: u64,
    pub epoch_id: EpochId,
    pub recorded_at: DateTime<Utc>,
    pub event: MarketEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind() {
        let ev = MarketEvent::PhaseAdvanced {
            from: Phase::Offer,
            to: Phase::BidOpening,
            forced: false,
        };
        assert_eq!(ev.kind(), "PHASE_ADVANCED");

        let ev = MarketEvent::Deposit {
            account: AccountId([0; 32]),
            holding: Holding::Settlement,
            amount: Decimal::ONE,
        };
        assert_eq!(ev.kind(), "DEPOSIT");
    }

    #[test]
    fn record_serde_roundtrip() {
        let record = EventRecord {
            sequence: 1,
            epoch_id: EpochId(0),
            recorded_at: Utc::now(),
            event: MarketEvent::OfferChanged {
                offer_number: OfferNumber(1),
                old_price: Decimal::new(11, 0),
                new_price: Decimal::new(10, 0),
            },
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: EventRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
