//! Escrow ledger for the security envelope.
//!
//! Tracks per-(account, holding) balances with available/reserved
//! accounting. All mutations are atomic: either the full operation succeeds
//! or the balance is unchanged. Accounts spring into existence zeroed on
//! first reference and are never deleted.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sealbid_types::{AccountId, AccountSnapshot, AuctionError, BalanceEntry, Holding, Result};

/// Manages participant balances with available/reserved accounting.
///
/// The Ledger is the source of truth for all balance state. The
/// [`EscrowBook`](crate::EscrowBook) calls into it to reserve and release
/// funds for standing orders.
#[derive(Debug, Default)]
pub struct Ledger {
    /// Per-(account, holding) balances.
    balances: HashMap<(AccountId, Holding), BalanceEntry>,
}

impl Ledger {
    /// Create a new empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            balances: HashMap::new(),
        }
    }

    /// Credit available balance (deposits, settlement proceeds, rollbacks).
    pub fn credit(&mut self, account: AccountId, holding: &Holding, amount: Decimal) {
        let entry = self.balances.entry((account, holding.clone())).or_default();
        entry.available += amount;
    }

    /// Debit available balance (withdrawals, settlement-time payments).
    ///
    /// # Errors
    /// Returns `InsufficientBalance` if available < amount.
    pub fn debit(&mut self, account: AccountId, holding: &Holding, amount: Decimal) -> Result<()> {
        let entry = self.entry_mut_or_insufficient(account, holding, amount)?;
        if entry.available < amount {
            return Err(AuctionError::InsufficientBalance {
                holding: holding.clone(),
                needed: amount,
                available: entry.available,
            });
        }
        entry.available -= amount;
        Ok(())
    }

    /// Reserve funds (available → reserved). Used when an order escrows.
    ///
    /// # Errors
    /// Returns `InsufficientBalance` if available < amount.
    pub fn reserve(
        &mut self,
        account: AccountId,
        holding: &Holding,
        amount: Decimal,
    ) -> Result<()> {
        let entry = self.entry_mut_or_insufficient(account, holding, amount)?;
        if entry.available < amount {
            return Err(AuctionError::InsufficientBalance {
                holding: holding.clone(),
                needed: amount,
                available: entry.available,
            });
        }
        entry.available -= amount;
        entry.reserved += amount;
        Ok(())
    }

    /// Release reserved funds (reserved → available). Used on cancellation
    /// and for price-improvement refunds.
    ///
    /// # Errors
    /// Returns `InsufficientReserved` if reserved < amount.
    pub fn release(
        &mut self,
        account: AccountId,
        holding: &Holding,
        amount: Decimal,
    ) -> Result<()> {
        let entry = self.reserved_entry_mut(account, holding, amount)?;
        entry.reserved -= amount;
        entry.available += amount;
        Ok(())
    }

    /// Consume reserved funds (for settlement). Reserved balance decreases,
    /// nothing is added back to available.
    ///
    /// # Errors
    /// Returns `InsufficientReserved` if reserved < amount.
    pub fn consume_reserved(
        &mut self,
        account: AccountId,
        holding: &Holding,
        amount: Decimal,
    ) -> Result<()> {
        let entry = self.reserved_entry_mut(account, holding, amount)?;
        entry.reserved -= amount;
        Ok(())
    }

    /// Get the balance for an (account, holding) pair.
    #[must_use]
    pub fn balance(&self, account: AccountId, holding: &Holding) -> BalanceEntry {
        self.balances
            .get(&(account, holding.clone()))
            .cloned()
            .unwrap_or_default()
    }

    /// Available amount only; shorthand used by settlement-time checks.
    #[must_use]
    pub fn available(&self, account: AccountId, holding: &Holding) -> Decimal {
        self.balance(account, holding).available
    }

    /// Every holding of one account.
    #[must_use]
    pub fn snapshot(&self, account: AccountId) -> AccountSnapshot {
        let mut snap = AccountSnapshot::default();
        for ((owner, holding), entry) in &self.balances {
            if *owner != account {
                continue;
            }
            match holding {
                Holding::Settlement => snap.settlement = entry.clone(),
                Holding::Token(asset) => {
                    snap.tokens.insert(asset.clone(), entry.clone());
                }
            }
        }
        snap
    }

    /// Total supply of a holding (sum of all accounts' available + reserved).
    #[must_use]
    pub fn total_supply(&self, holding: &Holding) -> Decimal {
        self.balances
            .iter()
            .filter(|((_, h), _)| h == holding)
            .map(|(_, entry)| entry.total())
            .sum()
    }

    /// Total reserved across all accounts for a holding.
    #[must_use]
    pub fn total_reserved(&self, holding: &Holding) -> Decimal {
        self.balances
            .iter()
            .filter(|((_, h), _)| h == holding)
            .map(|(_, entry)| entry.reserved)
            .sum()
    }

    /// Every holding that has ever been touched.
    #[must_use]
    pub fn holdings(&self) -> Vec<Holding> {
        let mut out: Vec<Holding> = self.balances.keys().map(|(_, h)| h.clone()).collect();
        out.sort();
        out.dedup();
        out
    }

    fn entry_mut_or_insufficient(
        &mut self,
        account: AccountId,
        holding: &Holding,
        amount: Decimal,
    ) -> Result<&mut BalanceEntry> {
        self.balances
            .get_mut(&(account, holding.clone()))
            .ok_or_else(|| AuctionError::InsufficientBalance {
                holding: holding.clone(),
                needed: amount,
                available: Decimal::ZERO,
            })
    }

    fn reserved_entry_mut(
        &mut self,
        account: AccountId,
        holding: &Holding,
        amount: Decimal,
    ) -> Result<&mut BalanceEntry> {
        let entry = self
            .balances
            .get_mut(&(account, holding.clone()))
            .ok_or_else(|| AuctionError::InsufficientReserved {
                holding: holding.clone(),
                needed: amount,
                reserved: Decimal::ZERO,
            })?;
        if entry.reserved < amount {
            return Err(AuctionError::InsufficientReserved {
                holding: holding.clone(),
                needed: amount,
                reserved: entry.reserved,
            });
        }
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use sealbid_types::AssetId;

    use super::*;

    fn gold() -> Holding {
        Holding::Token(AssetId::new("GOLD"))
    }

    #[test]
    fn credit_increases_available() {
        let mut ledger = Ledger::new();
        let acct = AccountId::random();
        ledger.credit(acct, &Holding::Settlement, Decimal::new(1000, 0));
        let bal = ledger.balance(acct, &Holding::Settlement);
        assert_eq!(bal.available, Decimal::new(1000, 0));
        assert_eq!(bal.reserved, Decimal::ZERO);
    }

    #[test]
    fn debit_insufficient_fails_without_mutation() {
        let mut ledger = Ledger::new();
        let acct = AccountId::random();
        ledger.credit(acct, &Holding::Settlement, Decimal::new(100, 0));
        let err = ledger
            .debit(acct, &Holding::Settlement, Decimal::new(101, 0))
            .unwrap_err();
        assert!(matches!(err, AuctionError::InsufficientBalance { .. }));
        assert_eq!(
            ledger.available(acct, &Holding::Settlement),
            Decimal::new(100, 0)
        );
    }

    #[test]
    fn debit_unknown_account_is_insufficient() {
        let mut ledger = Ledger::new();
        let err = ledger
            .debit(AccountId::random(), &gold(), Decimal::ONE)
            .unwrap_err();
        assert!(matches!(err, AuctionError::InsufficientBalance { .. }));
    }

    #[test]
    fn reserve_moves_to_reserved() {
        let mut ledger = Ledger::new();
        let acct = AccountId::random();
        ledger.credit(acct, &gold(), Decimal::new(100, 0));
        ledger.reserve(acct, &gold(), Decimal::new(40, 0)).unwrap();
        let bal = ledger.balance(acct, &gold());
        assert_eq!(bal.available, Decimal::new(60, 0));
        assert_eq!(bal.reserved, Decimal::new(40, 0));
    }

    #[test]
    fn release_restores_available() {
        let mut ledger = Ledger::new();
        let acct = AccountId::random();
        ledger.credit(acct, &gold(), Decimal::new(100, 0));
        ledger.reserve(acct, &gold(), Decimal::new(40, 0)).unwrap();
        ledger.release(acct, &gold(), Decimal::new(40, 0)).unwrap();
        let bal = ledger.balance(acct, &gold());
        assert_eq!(bal.available, Decimal::new(100, 0));
        assert_eq!(bal.reserved, Decimal::ZERO);
    }

    #[test]
    fn over_release_fails() {
        let mut ledger = Ledger::new();
        let acct = AccountId::random();
        ledger.credit(acct, &gold(), Decimal::new(100, 0));
        ledger.reserve(acct, &gold(), Decimal::new(10, 0)).unwrap();
        let err = ledger
            .release(acct, &gold(), Decimal::new(11, 0))
            .unwrap_err();
        assert!(matches!(err, AuctionError::InsufficientReserved { .. }));
        assert_eq!(ledger.balance(acct, &gold()).reserved, Decimal::new(10, 0));
    }

    #[test]
    fn consume_reserved_reduces_total() {
        let mut ledger = Ledger::new();
        let acct = AccountId::random();
        ledger.credit(acct, &gold(), Decimal::new(100, 0));
        ledger.reserve(acct, &gold(), Decimal::new(50, 0)).unwrap();
        ledger
            .consume_reserved(acct, &gold(), Decimal::new(50, 0))
            .unwrap();
        let bal = ledger.balance(acct, &gold());
        assert_eq!(bal.available, Decimal::new(50, 0));
        assert_eq!(bal.reserved, Decimal::ZERO);
        assert_eq!(ledger.total_supply(&gold()), Decimal::new(50, 0));
    }

    #[test]
    fn snapshot_collects_all_holdings() {
        let mut ledger = Ledger::new();
        let acct = AccountId::random();
        ledger.credit(acct, &Holding::Settlement, Decimal::new(7, 0));
        ledger.credit(acct, &gold(), Decimal::new(3, 0));
        ledger.credit(AccountId::random(), &gold(), Decimal::new(99, 0));
        let snap = ledger.snapshot(acct);
        assert_eq!(snap.settlement.available, Decimal::new(7, 0));
        assert_eq!(snap.tokens.len(), 1);
        assert_eq!(
            snap.token(&AssetId::new("GOLD")).available,
            Decimal::new(3, 0)
        );
    }

    #[test]
    fn total_supply_sums_all_accounts() {
        let mut ledger = Ledger::new();
        let a = AccountId::random();
        let b = AccountId::random();
        ledger.credit(a, &Holding::Settlement, Decimal::new(1000, 0));
        ledger.credit(b, &Holding::Settlement, Decimal::new(500, 0));
        ledger
            .reserve(a, &Holding::Settlement, Decimal::new(300, 0))
            .unwrap();
        assert_eq!(
            ledger.total_supply(&Holding::Settlement),
            Decimal::new(1500, 0)
        );
        assert_eq!(
            ledger.total_reserved(&Holding::Settlement),
            Decimal::new(300, 0)
        );
        assert_eq!(ledger.holdings(), vec![Holding::Settlement]);
    }

    #[test]
    fn nonexistent_balance_is_zero() {
        let ledger = Ledger::new();
        assert!(ledger.balance(AccountId::random(), &gold()).is_zero());
    }
}
