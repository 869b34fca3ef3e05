//! Offer and bid types for the Sealbid auction.
//!
//! Offers are plain sell orders. Bids exist in two sub-states: *hidden*
//! (only a [`Commitment`] and its signature are known) and *revealed*
//! (the [`BidTerms`] have been verified against the commitment). The
//! matching engine never looks at a bid whose terms are unknown.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{AccountId, AssetId, BidNumber, EpochId, OfferNumber, constants};

// ---------------------------------------------------------------------------
// OrderRef
// ---------------------------------------------------------------------------

/// Reference to either side of the book (used to key escrow reservations).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderRef {
    Offer(OfferNumber),
    Bid(BidNumber),
}

impl fmt::Display for OrderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offer(n) => write!(f, "{n}"),
            Self::Bid(n) => write!(f, "{n}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Offer
// ---------------------------------------------------------------------------

/// A standing sell order.
///
/// `matched == true` iff `remaining_quantity == 0`. Price only ever moves
/// down; quantity only ever moves down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub number: OfferNumber,
    pub seller: AccountId,
    pub asset: AssetId,
    pub price: Decimal,
    /// Quantity at creation.
    pub quantity: Decimal,
    pub remaining_quantity: Decimal,
    pub matched: bool,
    pub epoch_id: EpochId,
    pub created_at: DateTime<Utc>,
}

impl Offer {
    #[must_use]
    pub fn filled_quantity(&self) -> Decimal {
        self.quantity - self.remaining_quantity
    }

    /// Whether the matching engine may still consider this offer.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.matched && self.remaining_quantity > Decimal::ZERO
    }
}

// ---------------------------------------------------------------------------
// Commitment / BidTerms
// ---------------------------------------------------------------------------

/// SHA-256 digest binding a bid's terms and its designated revealer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commitment(pub [u8; 32]);

impl Commitment {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

/// The plaintext terms of a bid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidTerms {
    pub asset: AssetId,
    /// Maximum unit price the buyer will pay.
    pub price: Decimal,
    pub quantity: Decimal,
}

impl BidTerms {
    #[must_use]
    pub fn new(asset: AssetId, price: Decimal, quantity: Decimal) -> Self {
        Self {
            asset,
            price,
            quantity,
        }
    }

    /// Compute the commitment over these terms for the given revealer.
    ///
    /// Format: `"sealbid:bid:v1:" || len(asset) || asset || price || quantity || revealer`,
    /// with price and quantity in normalized decimal form so `12` and
    /// `12.00` commit identically.
    #[must_use]
    pub fn commitment(&self, revealer: &AccountId) -> Commitment {
        let mut hasher = Sha256::new();
        hasher.update(constants::COMMITMENT_DOMAIN);
        hasher.update((self.asset.0.len() as u64).to_le_bytes());
        hasher.update(self.asset.0.as_bytes());
        hasher.update(self.price.normalize().to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(self.quantity.normalize().to_string().as_bytes());
        hasher.update(revealer.as_bytes());
        let hash = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&hash);
        Commitment(out)
    }

    /// `price × quantity`, `None` on overflow.
    #[must_use]
    pub fn notional(&self) -> Option<Decimal> {
        self.price.checked_mul(self.quantity)
    }
}

// ---------------------------------------------------------------------------
// Bid
// ---------------------------------------------------------------------------

/// A standing buy order.
///
/// Sealed bids start with `terms == None` and only gain terms through a
/// verified reveal. Plain bids are created with their terms already set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    pub number: BidNumber,
    /// The account that placed (and signed) the bid. Funds come from here.
    pub committer: AccountId,
    /// Blinded commitment, present for sealed bids only.
    pub commitment: Option<Commitment>,
    /// Signature envelope over the commitment, empty for plain bids.
    pub signature: Vec<u8>,
    /// Known once revealed (immediately for plain bids).
    pub terms: Option<BidTerms>,
    /// The account that performed the reveal.
    pub revealer: Option<AccountId>,
    pub remaining_quantity: Decimal,
    pub matched: bool,
    pub epoch_id: EpochId,
    pub created_at: DateTime<Utc>,
}

impl Bid {
    #[must_use]
    pub fn is_revealed(&self) -> bool {
        self.terms.is_some()
    }

    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.commitment.is_some()
    }

    /// Whether the matching engine may consider this bid.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.is_revealed() && !self.matched && self.remaining_quantity > Decimal::ZERO
    }

    /// The asset this bid buys, once known.
    #[must_use]
    pub fn asset(&self) -> Option<&AssetId> {
        self.terms.as_ref().map(|t| &t.asset)
    }

    /// The bid's own price, once known.
    #[must_use]
    pub fn price(&self) -> Option<Decimal> {
        self.terms.as_ref().map(|t| t.price)
    }
}
