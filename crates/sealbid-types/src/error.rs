//! Error types for the Sealbid auction.
//!
//! All errors use the `SB_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Order errors
//! - 2xx: Balance errors
//! - 3xx: Commitment / authorization errors
//! - 4xx: Phase errors
//! - 6xx: Settlement / transfer errors
//! - 8xx: Safety invariants
//! - 9xx: General / configuration errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{AssetId, BidNumber, Holding, OfferNumber, Phase};

/// Central error enum for all Sealbid operations.
///
/// Every variant aborts the triggering operation in full; no partial
/// ledger or order book mutation survives an `Err`.
#[derive(Debug, Error)]
pub enum AuctionError {
    // =================================================================
    // Order Errors (1xx)
    // =================================================================
    /// The offer number was never allocated or the offer has been removed.
    #[error("SB_ERR_100: Offer not found: {0}")]
    OfferNotFound(OfferNumber),

    /// The bid number was never allocated or the bid has been removed.
    #[error("SB_ERR_101: Bid not found: {0}")]
    BidNotFound(BidNumber),

    /// Zero or negative amount, unknown asset, bad precision, non-decreasing
    /// price amendment, wrong bid shape for the market, and similar.
    #[error("SB_ERR_102: Invalid input: {reason}")]
    InvalidInput { reason: String },

    // =================================================================
    // Balance Errors (2xx)
    // =================================================================
    /// Not enough available balance to perform the operation.
    #[error("SB_ERR_200: Insufficient {holding} balance: need {needed}, have {available}")]
    InsufficientBalance {
        holding: Holding,
        needed: Decimal,
        available: Decimal,
    },

    /// Not enough reserved balance to consume or release.
    #[error("SB_ERR_201: Insufficient reserved {holding} balance: need {needed}, have {reserved}")]
    InsufficientReserved {
        holding: Holding,
        needed: Decimal,
        reserved: Decimal,
    },

    // =================================================================
    // Commitment / Authorization Errors (3xx)
    // =================================================================
    /// The caller does not own the order, or is not the administrator.
    #[error("SB_ERR_300: Unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// The revealed terms do not hash to the stored commitment, or the
    /// commitment signature does not recover to the committer.
    #[error("SB_ERR_301: Invalid commitment for {bid}: {reason}")]
    InvalidCommitment { bid: BidNumber, reason: String },

    // =================================================================
    // Phase Errors (4xx)
    // =================================================================
    /// An operation was attempted outside its required phase.
    #[error("SB_ERR_400: Wrong phase: expected {expected}, got {actual}")]
    WrongPhase { expected: Phase, actual: Phase },

    // =================================================================
    // Settlement / Transfer Errors (6xx)
    // =================================================================
    /// The external asset movement capability declined the transfer.
    #[error("SB_ERR_600: External transfer of {asset} failed: {reason}")]
    ExternalTransferFailed { asset: AssetId, reason: String },

    /// This bid/offer pair has already been settled (idempotency guard).
    #[error("SB_ERR_601: Pair already settled: {bid} x {offer}")]
    PairAlreadySettled { bid: BidNumber, offer: OfferNumber },

    // =================================================================
    // Safety Invariants (8xx)
    // =================================================================
    /// Supply conservation invariant violated. Critical safety alert.
    #[error("SB_ERR_800: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // General / Configuration (9xx)
    // =================================================================
    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("SB_ERR_900: Configuration error: {0}")]
    Configuration(String),

    /// Serialization / deserialization error.
    #[error("SB_ERR_901: Serialization error: {0}")]
    Serialization(String),
}

impl AuctionError {
    /// Shorthand for [`AuctionError::InvalidInput`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`AuctionError::Unauthorized`].
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, AuctionError>;

impl From<serde_json::Error> for AuctionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Returned by an external transfer capability that refuses to move funds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transfer declined: {reason}")]
pub struct TransferDeclined {
    pub reason: String,
}

impl TransferDeclined {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
