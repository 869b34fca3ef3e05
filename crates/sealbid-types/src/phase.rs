//! Auction phase types.
//!
//! Each cycle passes through four non-overlapping phases:
//! **DEPOSIT_WITHDRAW → OFFER → BID_OPENING → MATCHING**
//!
//! During DEPOSIT_WITHDRAW, participants move funds in and out of escrow.
//! During OFFER, sellers post, reprice, and withdraw offers.
//! During BID_OPENING, buyers place (optionally blinded) bids.
//! During MATCHING, sealed bids are revealed and the sweep settles trades.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::constants;

/// The four phases of an auction cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Deposits and withdrawals of the settlement medium and tokens.
    DepositWithdraw,
    /// Sellers post offers.
    Offer,
    /// Buyers post bids.
    BidOpening,
    /// Reveals and the matching sweep.
    Matching,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DepositWithdraw => write!(f, "DEPOSIT_WITHDRAW"),
            Self::Offer => write!(f, "OFFER"),
            Self::BidOpening => write!(f, "BID_OPENING"),
            Self::Matching => write!(f, "MATCHING"),
        }
    }
}

impl Phase {
    /// Return the next phase in the cycle.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::DepositWithdraw => Self::Offer,
            Self::Offer => Self::BidOpening,
            Self::BidOpening => Self::Matching,
            Self::Matching => Self::DepositWithdraw,
        }
    }
}

/// Configuration for phase timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseConfig {
    /// Minimum time a phase stays active before it may advance.
    pub dwell: Duration,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            dwell: Duration::from_secs(constants::DEFAULT_PHASE_DWELL_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_cycle() {
        assert_eq!(Phase::DepositWithdraw.next(), Phase::Offer);
        assert_eq!(Phase::Offer.next(), Phase::BidOpening);
        assert_eq!(Phase::BidOpening.next(), Phase::Matching);
        assert_eq!(Phase::Matching.next(), Phase::DepositWithdraw);
    }

    #[test]
    fn phase_display() {
        assert_eq!(format!("{}", Phase::DepositWithdraw), "DEPOSIT_WITHDRAW");
        assert_eq!(format!("{}", Phase::Offer), "OFFER");
        assert_eq!(format!("{}", Phase::BidOpening), "BID_OPENING");
        assert_eq!(format!("{}", Phase::Matching), "MATCHING");
    }

    #[test]
    fn default_dwell_is_five_minutes() {
        assert_eq!(PhaseConfig::default().dwell.as_secs(), 300);
    }

    #[test]
    fn phase_serde_roundtrip() {
        let phase = Phase::BidOpening;
        let json = serde_json::to_string(&phase).unwrap();
        let back: Phase = serde_json::from_str(&json).unwrap();
        assert_eq!(phase, back);
    }
}
