//! Configuration types for a Sealbid market.

use serde::{Deserialize, Serialize};

use crate::{AccountId, AssetId, AuctionError, PhaseConfig, Result, constants};

/// Whether bids are blinded behind a commitment until the reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BidVisibility {
    /// Bids are submitted as signed commitments and revealed during MATCHING.
    Sealed,
    /// Bids are submitted with plaintext terms.
    Plain,
}

/// When escrow is taken from the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowTiming {
    /// Offers reserve their tokens and bids their `price × quantity` as soon
    /// as the terms are known (submission for plain bids, reveal for sealed).
    AtOrderTime,
    /// Nothing is reserved; each fill checks available balances.
    AtSettlementTime,
}

/// Behavioural switches for one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketPolicy {
    pub bid_visibility: BidVisibility,
    pub escrow_timing: EscrowTiming,
    /// Allow a seller's offer to fill the same account's bid.
    pub allow_self_trade: bool,
    /// Allow a sealed bid to be revealed by an account other than its
    /// committer. The revealer is bound into the commitment either way.
    pub delegated_reveal: bool,
}

impl Default for MarketPolicy {
    fn default() -> Self {
        Self {
            bid_visibility: BidVisibility::Sealed,
            escrow_timing: EscrowTiming::AtOrderTime,
            allow_self_trade: false,
            delegated_reveal: true,
        }
    }
}

/// Configuration for a single market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// The only identity allowed to force phases and register assets.
    pub admin: AccountId,
    /// Symbol of the settlement medium; never accepted as a token.
    pub settlement_asset: AssetId,
    pub phase: PhaseConfig,
    pub policy: MarketPolicy,
    /// Maximum decimal places of a price.
    pub price_precision: u32,
    /// Maximum decimal places of a quantity or amount.
    pub quantity_precision: u32,
    /// Default number of bid/offer pairs one matching call examines.
    pub max_pairs_per_sweep: usize,
}

impl MarketConfig {
    /// Defaults: sealed bids, escrow at order time, five-minute dwell.
    #[must_use]
    pub fn new(admin: AccountId) -> Self {
        Self {
            admin,
            settlement_asset: AssetId::new(constants::DEFAULT_SETTLEMENT_ASSET),
            phase: PhaseConfig::default(),
            policy: MarketPolicy::default(),
            price_precision: constants::PRICE_PRECISION,
            quantity_precision: constants::QTY_PRECISION,
            max_pairs_per_sweep: constants::DEFAULT_MAX_PAIRS_PER_SWEEP,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: MarketPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations no market can run with.
    pub fn validate(&self) -> Result<()> {
        if self.settlement_asset.is_empty() {
            return Err(AuctionError::Configuration(
                "settlement_asset must not be empty".into(),
            ));
        }
        if self.max_pairs_per_sweep == 0 {
            return Err(AuctionError::Configuration(
                "max_pairs_per_sweep must be > 0".into(),
            ));
        }
        // Decimal carries at most 28 fractional digits.
        if self.price_precision > 28 || self.quantity_precision > 28 {
            return Err(AuctionError::Configuration(
                "precision must be <= 28".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = MarketConfig::new(AccountId([9; 32]));
        cfg.validate().unwrap();
        assert_eq!(cfg.policy.bid_visibility, BidVisibility::Sealed);
        assert_eq!(cfg.policy.escrow_timing, EscrowTiming::AtOrderTime);
        assert!(!cfg.policy.allow_self_trade);
        assert_eq!(cfg.settlement_asset.as_str(), "NATIVE");
    }

    #[test]
    fn zero_sweep_budget_rejected() {
        let mut cfg = MarketConfig::new(AccountId([9; 32]));
        cfg.max_pairs_per_sweep = 0;
        assert!(matches!(
            cfg.validate(),
            Err(AuctionError::Configuration(_))
        ));
    }

    #[test]
    fn json_roundtrip_and_validation() {
        let cfg = MarketConfig::new(AccountId([9; 32])).with_policy(MarketPolicy {
            bid_visibility: BidVisibility::Plain,
            escrow_timing: EscrowTiming::AtSettlementTime,
            allow_self_trade: true,
            delegated_reveal: false,
        });
        let json = serde_json::to_string(&cfg).unwrap();
        let back = MarketConfig::from_json_str(&json).unwrap();
        assert_eq!(back.policy, cfg.policy);
        assert_eq!(back.phase, cfg.phase);
        assert_eq!(back.admin, cfg.admin);
    }

    #[test]
    fn malformed_json_is_serialization_error() {
        let err = MarketConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, AuctionError::Serialization(_)));
    }
}
