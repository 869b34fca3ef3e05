//! Supply conservation invariant checker.
//!
//! Enforced after every sweep:
//! ```text
//! ∀ holding: Σ(available + reserved) == Σ(deposits) - Σ(withdrawals)
//! ∀ holding: Σ(open reservations)    == Σ(reserved)
//! ```
//!
//! Settlement only moves balances between accounts, so neither side of the
//! first equation may change during a sweep. A violation means a ledger
//! bug, never a participant mistake.

use std::collections::{BTreeSet, HashMap};

use rust_decimal::Decimal;
use sealbid_ingress::{EscrowBook, Ledger};
use sealbid_types::{AuctionError, Holding, Result};

/// Cumulative deposits and withdrawals per holding.
#[derive(Debug, Default)]
pub struct SupplyConservation {
    deposits: HashMap<Holding, Decimal>,
    withdrawals: HashMap<Holding, Decimal>,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_deposit(&mut self, holding: &Holding, amount: Decimal) {
        *self.deposits.entry(holding.clone()).or_default() += amount;
    }

    pub fn record_withdrawal(&mut self, holding: &Holding, amount: Decimal) {
        *self.withdrawals.entry(holding.clone()).or_default() += amount;
    }

    #[must_use]
    pub fn total_deposits(&self, holding: &Holding) -> Decimal {
        self.deposits.get(holding).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn total_withdrawals(&self, holding: &Holding) -> Decimal {
        self.withdrawals.get(holding).copied().unwrap_or_default()
    }

    /// Expected total supply: deposits - withdrawals.
    #[must_use]
    pub fn expected_supply(&self, holding: &Holding) -> Decimal {
        self.total_deposits(holding) - self.total_withdrawals(holding)
    }

    /// Compare one holding's actual supply with the expected one.
    ///
    /// # Errors
    /// [`AuctionError::SupplyInvariantViolation`] if they differ.
    pub fn verify(&self, holding: &Holding, actual_supply: Decimal) -> Result<()> {
        let expected = self.expected_supply(holding);
        if actual_supply != expected {
            return Err(AuctionError::SupplyInvariantViolation {
                reason: format!(
                    "{holding}: actual supply {actual_supply} != expected {expected} \
                     (deposits={}, withdrawals={})",
                    self.total_deposits(holding),
                    self.total_withdrawals(holding),
                ),
            });
        }
        Ok(())
    }

    /// Check every holding the ledger or this tracker knows about, and that
    /// the escrow book accounts for every reserved unit.
    ///
    /// # Errors
    /// [`AuctionError::SupplyInvariantViolation`] on the first mismatch.
    pub fn verify_all(&self, ledger: &Ledger, escrow: &EscrowBook) -> Result<()> {
        for holding in self.tracked_holdings(ledger) {
            self.verify(&holding, ledger.total_supply(&holding))?;

            let reserved = ledger.total_reserved(&holding);
            let outstanding = escrow.total_outstanding(&holding);
            if reserved != outstanding {
                return Err(AuctionError::SupplyInvariantViolation {
                    reason: format!(
                        "{holding}: reserved {reserved} != open reservations {outstanding}"
                    ),
                });
            }
        }
        Ok(())
    }

    /// Every holding seen by either side, sorted.
    #[must_use]
    pub fn tracked_holdings(&self, ledger: &Ledger) -> Vec<Holding> {
        let mut all: BTreeSet<Holding> = self.deposits.keys().cloned().collect();
        all.extend(self.withdrawals.keys().cloned());
        all.extend(ledger.holdings());
        all.into_iter().collect()
    }
}
