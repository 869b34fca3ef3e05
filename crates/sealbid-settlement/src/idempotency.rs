//! Settlement idempotency guard: prevents double-settlement.
//!
//! Each (bid, offer) pair settles at most once, since every fill exhausts
//! at least one side. Marking the same [`TradeId`] a second time returns
//! [`AuctionError::PairAlreadySettled`].
//!
//! The guard keeps a bounded cache with oldest-first eviction so memory
//! stays predictable across many cycles.

use std::collections::{HashSet, VecDeque};

use sealbid_types::{AuctionError, BidNumber, OfferNumber, Result, TradeId, constants};

/// Remembers which pairs have already settled.
#[derive(Debug)]
pub struct IdempotencyGuard {
    settled: HashSet<TradeId>,
    /// Insertion order for eviction (front = oldest).
    order: VecDeque<TradeId>,
    max_size: usize,
}

impl IdempotencyGuard {
    /// Create a guard remembering at most `max_size` pairs (minimum 1).
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            settled: HashSet::new(),
            order: VecDeque::new(),
            max_size,
        }
    }

    /// Mark a pair as settled.
    ///
    /// # Errors
    /// Returns [`AuctionError::PairAlreadySettled`] if the pair is already
    /// marked.
    pub fn mark_settled(&mut self, bid: BidNumber, offer: OfferNumber) -> Result<TradeId> {
        let trade_id = TradeId::for_pair(bid, offer);
        if self.settled.contains(&trade_id) {
            return Err(AuctionError::PairAlreadySettled { bid, offer });
        }

        if self.settled.len() >= self.max_size {
            if let Some(oldest) = self.order.pop_front() {
                self.settled.remove(&oldest);
            }
        }

        self.settled.insert(trade_id);
        self.order.push_back(trade_id);
        Ok(trade_id)
    }

    #[must_use]
    pub fn is_settled(&self, bid: BidNumber, offer: OfferNumber) -> bool {
        self.settled.contains(&TradeId::for_pair(bid, offer))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.settled.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.settled.is_empty()
    }
}

impl Default for IdempotencyGuard {
    fn default() -> Self {
        Self::new(constants::SETTLEMENT_IDEMPOTENCY_CACHE_SIZE)
    }
}
