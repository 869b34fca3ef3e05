//! Balance tracking types for the Sealbid escrow model.
//!
//! Every account holds the settlement medium plus any number of registered
//! tokens. Each holding has an `available` balance (usable for new orders and
//! withdrawal) and a `reserved` balance (escrowed for standing orders).

use std::{collections::BTreeMap, fmt};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::AssetId;

/// What a balance is denominated in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Holding {
    /// The settlement medium (paid by buyers, received by sellers).
    Settlement,
    /// A registered fungible token.
    Token(AssetId),
}

impl Holding {
    /// Shorthand for `Holding::Token(asset.clone())`.
    #[must_use]
    pub fn token(asset: &AssetId) -> Self {
        Self::Token(asset.clone())
    }
}

impl fmt::Display for Holding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Settlement => write!(f, "settlement"),
            Self::Token(asset) => write!(f, "token:{asset}"),
        }
    }
}

/// A single balance entry for an (account, holding) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BalanceEntry {
    /// Available for new orders / withdrawal.
    pub available: Decimal,
    /// Escrowed for standing orders awaiting matching.
    pub reserved: Decimal,
}

impl BalanceEntry {
    /// Create a zero balance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            available: Decimal::ZERO,
            reserved: Decimal::ZERO,
        }
    }

    /// Total balance (available + reserved).
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.available + self.reserved
    }

    /// Whether this entry has no balance at all.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.available.is_zero() && self.reserved.is_zero()
    }
}

impl Default for BalanceEntry {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of one participant's account.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub settlement: BalanceEntry,
    pub tokens: BTreeMap<AssetId, BalanceEntry>,
}

impl AccountSnapshot {
    /// Token balance for `asset`, zero if the account never held it.
    #[must_use]
    pub fn token(&self, asset: &AssetId) -> BalanceEntry {
        self.tokens.get(asset).cloned().unwrap_or_default()
    }
}
