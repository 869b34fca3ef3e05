//! Per-order escrow reservations.
//!
//! The EscrowBook atomically reserves ledger funds for a standing order and
//! remembers how much of that reservation is still outstanding. Settlement
//! consumes from it, cancellation and price-improvement refunds release it.
//! Summed over all open reservations it always equals the ledger's reserved
//! balances.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sealbid_types::{AccountId, AuctionError, Holding, OrderRef, Result};

use crate::ledger::Ledger;

/// Funds held for one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub owner: AccountId,
    pub holding: Holding,
    /// Amount reserved at creation.
    pub amount: Decimal,
    /// Amount still held.
    pub remaining: Decimal,
}

/// Tracks outstanding reservations keyed by order.
#[derive(Debug, Default)]
pub struct EscrowBook {
    reservations: HashMap<OrderRef, Reservation>,
}

impl EscrowBook {
    #[must_use]
    pub fn new() -> Self {
        Self {
            reservations: HashMap::new(),
        }
    }

    /// Atomically reserve funds for an order.
    ///
    /// If the ledger reserve fails (insufficient balance), nothing is
    /// recorded.
    ///
    /// # Errors
    /// - `InvalidInput` if the order already holds a reservation
    /// - `InsufficientBalance` if the owner doesn't have enough available
    pub fn reserve(
        &mut self,
        ledger: &mut Ledger,
        order: OrderRef,
        owner: AccountId,
        holding: Holding,
        amount: Decimal,
    ) -> Result<()> {
        if self.reservations.contains_key(&order) {
            return Err(AuctionError::invalid(format!(
                "{order} already holds a reservation"
            )));
        }
        ledger.reserve(owner, &holding, amount)?;
        self.reservations.insert(
            order,
            Reservation {
                owner,
                holding,
                amount,
                remaining: amount,
            },
        );
        Ok(())
    }

    /// Release everything still held for an order back to its owner.
    /// Returns the released amount (zero if the order never reserved).
    ///
    /// # Errors
    /// Returns `InsufficientReserved` if the ledger disagrees.
    pub fn release_all(&mut self, ledger: &mut Ledger, order: OrderRef) -> Result<Decimal> {
        let Some(res) = self.reservations.get(&order) else {
            return Ok(Decimal::ZERO);
        };
        let released = res.remaining;
        if released > Decimal::ZERO {
            ledger.release(res.owner, &res.holding, released)?;
        }
        self.reservations.remove(&order);
        Ok(released)
    }

    /// Release part of a reservation back to available (price improvement).
    ///
    /// # Errors
    /// Returns `InsufficientReserved` if less than `amount` remains.
    pub fn release(&mut self, ledger: &mut Ledger, order: OrderRef, amount: Decimal) -> Result<()> {
        let res = self.held_mut(order, amount)?;
        ledger.release(res.owner, &res.holding, amount)?;
        res.remaining -= amount;
        Ok(())
    }

    /// Consume part of a reservation (settlement). The owner's reserved
    /// balance decreases; the counterparty is credited by the caller.
    ///
    /// # Errors
    /// Returns `InsufficientReserved` if less than `amount` remains.
    pub fn consume(&mut self, ledger: &mut Ledger, order: OrderRef, amount: Decimal) -> Result<()> {
        let res = self.held_mut(order, amount)?;
        ledger.consume_reserved(res.owner, &res.holding, amount)?;
        res.remaining -= amount;
        Ok(())
    }

    /// Drop a reservation whose remaining amount is zero.
    pub fn close_if_exhausted(&mut self, order: OrderRef) {
        if self
            .reservations
            .get(&order)
            .is_some_and(|r| r.remaining.is_zero())
        {
            self.reservations.remove(&order);
        }
    }

    /// Amount still held for an order.
    #[must_use]
    pub fn remaining(&self, order: OrderRef) -> Decimal {
        self.reservations
            .get(&order)
            .map_or(Decimal::ZERO, |r| r.remaining)
    }

    #[must_use]
    pub fn get(&self, order: OrderRef) -> Option<&Reservation> {
        self.reservations.get(&order)
    }

    /// Sum of outstanding reservations for a holding.
    #[must_use]
    pub fn total_outstanding(&self, holding: &Holding) -> Decimal {
        self.reservations
            .values()
            .filter(|r| &r.holding == holding)
            .map(|r| r.remaining)
            .sum()
    }

    /// Sum of outstanding reservations for one account and holding.
    #[must_use]
    pub fn outstanding_for(&self, owner: AccountId, holding: &Holding) -> Decimal {
        self.reservations
            .values()
            .filter(|r| r.owner == owner && &r.holding == holding)
            .map(|r| r.remaining)
            .sum()
    }

    /// Number of orders currently holding escrow.
    #[must_use]
    pub fn count(&self) -> usize {
        self.reservations.len()
    }

    fn held_mut(&mut self, order: OrderRef, amount: Decimal) -> Result<&mut Reservation> {
        let res = self.reservations.get_mut(&order).ok_or_else(|| {
            AuctionError::invalid(format!("{order} holds no reservation"))
        })?;
        if res.remaining < amount {
            return Err(AuctionError::InsufficientReserved {
                holding: res.holding.clone(),
                needed: amount,
                reserved: res.remaining,
            });
        }
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use sealbid_types::{AssetId, BidNumber, OfferNumber};

    use super::*;

    fn setup() -> (EscrowBook, Ledger, AccountId) {
        let mut ledger = Ledger::new();
        let acct = AccountId::random();
        ledger.credit(acct, &Holding::Settlement, Decimal::new(2000, 0));
        (EscrowBook::new(), ledger, acct)
    }

    #[test]
    fn reserve_moves_funds_and_records() {
        let (mut escrow, mut ledger, acct) = setup();
        let order = OrderRef::Bid(BidNumber(1));
        escrow
            .reserve(&mut ledger, order, acct, Holding::Settlement, Decimal::new(600, 0))
            .unwrap();

        let bal = ledger.balance(acct, &Holding::Settlement);
        assert_eq!(bal.available, Decimal::new(1400, 0));
        assert_eq!(bal.reserved, Decimal::new(600, 0));
        assert_eq!(escrow.remaining(order), Decimal::new(600, 0));
        assert_eq!(escrow.count(), 1);
    }

    #[test]
    fn reserve_fails_insufficient_balance() {
        let (mut escrow, mut ledger, acct) = setup();
        let err = escrow
            .reserve(
                &mut ledger,
                OrderRef::Bid(BidNumber(1)),
                acct,
                Holding::Settlement,
                Decimal::new(2001, 0),
            )
            .unwrap_err();
        assert!(matches!(err, AuctionError::InsufficientBalance { .. }));
        assert_eq!(escrow.count(), 0);
        assert_eq!(
            ledger.available(acct, &Holding::Settlement),
            Decimal::new(2000, 0)
        );
    }

    #[test]
    fn double_reserve_rejected() {
        let (mut escrow, mut ledger, acct) = setup();
        let order = OrderRef::Bid(BidNumber(1));
        escrow
            .reserve(&mut ledger, order, acct, Holding::Settlement, Decimal::ONE)
            .unwrap();
        let err = escrow
            .reserve(&mut ledger, order, acct, Holding::Settlement, Decimal::ONE)
            .unwrap_err();
        assert!(matches!(err, AuctionError::InvalidInput { .. }));
        assert_eq!(ledger.balance(acct, &Holding::Settlement).reserved, Decimal::ONE);
    }

    #[test]
    fn consume_then_release_price_improvement() {
        let (mut escrow, mut ledger, acct) = setup();
        let order = OrderRef::Bid(BidNumber(1));
        escrow
            .reserve(&mut ledger, order, acct, Holding::Settlement, Decimal::new(600, 0))
            .unwrap();

        escrow.consume(&mut ledger, order, Decimal::new(500, 0)).unwrap();
        escrow.release(&mut ledger, order, Decimal::new(100, 0)).unwrap();
        escrow.close_if_exhausted(order);

        let bal = ledger.balance(acct, &Holding::Settlement);
        assert_eq!(bal.available, Decimal::new(1500, 0));
        assert_eq!(bal.reserved, Decimal::ZERO);
        assert!(escrow.get(order).is_none());
    }

    #[test]
    fn over_consume_rejected() {
        let (mut escrow, mut ledger, acct) = setup();
        let order = OrderRef::Bid(BidNumber(1));
        escrow
            .reserve(&mut ledger, order, acct, Holding::Settlement, Decimal::new(10, 0))
            .unwrap();
        let err = escrow
            .consume(&mut ledger, order, Decimal::new(11, 0))
            .unwrap_err();
        assert!(matches!(err, AuctionError::InsufficientReserved { .. }));
        assert_eq!(escrow.remaining(order), Decimal::new(10, 0));
    }

    #[test]
    fn release_all_returns_remaining() {
        let mut ledger = Ledger::new();
        let seller = AccountId::random();
        let gold = Holding::Token(AssetId::new("GOLD"));
        ledger.credit(seller, &gold, Decimal::new(100, 0));
        let mut escrow = EscrowBook::new();
        let order = OrderRef::Offer(OfferNumber(1));
        escrow
            .reserve(&mut ledger, order, seller, gold.clone(), Decimal::new(100, 0))
            .unwrap();
        escrow.consume(&mut ledger, order, Decimal::new(30, 0)).unwrap();

        let released = escrow.release_all(&mut ledger, order).unwrap();
        assert_eq!(released, Decimal::new(70, 0));
        assert_eq!(ledger.balance(seller, &gold).available, Decimal::new(70, 0));
        assert_eq!(escrow.count(), 0);
        assert_eq!(escrow.total_outstanding(&gold), Decimal::ZERO);
    }

    #[test]
    fn release_all_without_reservation_is_zero() {
        let (mut escrow, mut ledger, _) = setup();
        let released = escrow
            .release_all(&mut ledger, OrderRef::Offer(OfferNumber(9)))
            .unwrap();
        assert_eq!(released, Decimal::ZERO);
    }

    #[test]
    fn outstanding_matches_ledger_reserved() {
        let (mut escrow, mut ledger, acct) = setup();
        escrow
            .reserve(
                &mut ledger,
                OrderRef::Bid(BidNumber(1)),
                acct,
                Holding::Settlement,
                Decimal::new(300, 0),
            )
            .unwrap();
        escrow
            .reserve(
                &mut ledger,
                OrderRef::Bid(BidNumber(2)),
                acct,
                Holding::Settlement,
                Decimal::new(200, 0),
            )
            .unwrap();
        assert_eq!(
            escrow.outstanding_for(acct, &Holding::Settlement),
            ledger.balance(acct, &Holding::Settlement).reserved
        );
        assert_eq!(
            escrow.total_outstanding(&Holding::Settlement),
            ledger.total_reserved(&Holding::Settlement)
        );
    }
}
