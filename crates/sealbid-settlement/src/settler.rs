//! Atomic settlement of one fill.
//!
//! For every fill the sweep proposes, the settler:
//! 1. Refuses pairs that already settled (idempotency)
//! 2. Checks the seller can deliver `quantity` of the asset, else skips the pair
//! 3. Checks the buyer can pay, else skips the whole bid
//! 4. Moves the asset seller → buyer and `cost` buyer → seller
//! 5. With escrow at order time, returns the price improvement
//!    `quantity × (bid_price − price)` to the buyer
//!
//! All checks run before the first mutation, so a declined fill leaves
//! every balance untouched.

use rust_decimal::Decimal;
use sealbid_ingress::{EscrowBook, Ledger};
use sealbid_matchcore::{Fill, FillDecision, FillSink};
use sealbid_types::{EscrowTiming, Holding, OrderRef, Result};

use crate::idempotency::IdempotencyGuard;

/// Settles fills against the ledger for the duration of one sweep.
pub struct Settler<'a> {
    ledger: &'a mut Ledger,
    escrow: &'a mut EscrowBook,
    guard: &'a mut IdempotencyGuard,
    timing: EscrowTiming,
}

impl<'a> Settler<'a> {
    #[must_use]
    pub fn new(
        ledger: &'a mut Ledger,
        escrow: &'a mut EscrowBook,
        guard: &'a mut IdempotencyGuard,
        timing: EscrowTiming,
    ) -> Self {
        Self {
            ledger,
            escrow,
            guard,
            timing,
        }
    }

    /// Both sides pre-funded through the escrow book.
    fn settle_from_escrow(&mut self, fill: &Fill) -> Result<FillDecision> {
        let offer_ref = OrderRef::Offer(fill.offer_number);
        let bid_ref = OrderRef::Bid(fill.bid_number);
        let token = Holding::token(&fill.asset);

        if self.escrow.remaining(offer_ref) < fill.quantity {
            tracing::warn!(
                offer = %fill.offer_number,
                needed = %fill.quantity,
                reserved = %self.escrow.remaining(offer_ref),
                "Offer escrow short"
            );
            return Ok(FillDecision::SkipPair);
        }
        let Some(held_for_fill) = fill.bid_price.checked_mul(fill.quantity) else {
            return Ok(FillDecision::SkipBid);
        };
        if self.escrow.remaining(bid_ref) < held_for_fill {
            tracing::warn!(
                bid = %fill.bid_number,
                needed = %held_for_fill,
                reserved = %self.escrow.remaining(bid_ref),
                "Bid escrow short"
            );
            return Ok(FillDecision::SkipBid);
        }
        let refund = held_for_fill - fill.cost;

        self.guard.mark_settled(fill.bid_number, fill.offer_number)?;

        self.escrow.consume(self.ledger, offer_ref, fill.quantity)?;
        self.ledger.credit(fill.buyer, &token, fill.quantity);

        self.escrow.consume(self.ledger, bid_ref, fill.cost)?;
        self.ledger.credit(fill.seller, &Holding::Settlement, fill.cost);

        if refund > Decimal::ZERO {
            self.escrow.release(self.ledger, bid_ref, refund)?;
        }
        self.escrow.close_if_exhausted(offer_ref);
        self.escrow.close_if_exhausted(bid_ref);

        Ok(FillDecision::Settled { refund })
    }

    /// Nothing reserved; both sides pay from available balances.
    fn settle_from_available(&mut self, fill: &Fill) -> Result<FillDecision> {
        let token = Holding::token(&fill.asset);

        let seller_has = self.ledger.available(fill.seller, &token);
        if seller_has < fill.quantity {
            tracing::warn!(
                offer = %fill.offer_number,
                needed = %fill.quantity,
                available = %seller_has,
                "Seller inventory short"
            );
            return Ok(FillDecision::SkipPair);
        }
        let buyer_has = self.ledger.available(fill.buyer, &Holding::Settlement);
        if buyer_has < fill.cost {
            tracing::warn!(
                bid = %fill.bid_number,
                needed = %fill.cost,
                available = %buyer_has,
                "Buyer funds short"
            );
            return Ok(FillDecision::SkipBid);
        }

        self.guard.mark_settled(fill.bid_number, fill.offer_number)?;

        self.ledger.debit(fill.seller, &token, fill.quantity)?;
        self.ledger.credit(fill.buyer, &token, fill.quantity);
        self.ledger.debit(fill.buyer, &Holding::Settlement, fill.cost)?;
        self.ledger.credit(fill.seller, &Holding::Settlement, fill.cost);

        Ok(FillDecision::Settled {
            refund: Decimal::ZERO,
        })
    }
}

impl FillSink for Settler<'_> {
    fn settle(&mut self, fill: &Fill) -> Result<FillDecision> {
        if self.guard.is_settled(fill.bid_number, fill.offer_number) {
            tracing::warn!(
                bid = %fill.bid_number,
                offer = %fill.offer_number,
                "Pair already settled"
            );
            return Ok(FillDecision::SkipPair);
        }
        match self.timing {
            EscrowTiming::AtOrderTime => self.settle_from_escrow(fill),
            EscrowTiming::AtSettlementTime => self.settle_from_available(fill),
        }
    }
}
