//! Order book: offers, bids, and the per-asset open-offer index.
//!
//! The book owns order identity and lifecycle. It allocates monotonic
//! 1-based numbers, enforces creator-only mutation, and tracks which
//! orders the matching sweep may still consider. It never touches
//! balances; the market pairs every book mutation with the matching
//! escrow movement.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sealbid_types::{
    AccountId, AssetId, AuctionError, Bid, BidNumber, BidTerms, Commitment, EpochId, Offer,
    OfferNumber, Result,
};

/// Which sides a fill exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillEffect {
    pub bid_matched: bool,
    pub offer_matched: bool,
}

/// Standing offers and bids.
#[derive(Debug)]
pub struct OrderBook {
    offers: BTreeMap<OfferNumber, Offer>,
    bids: BTreeMap<BidNumber, Bid>,
    /// Open offers per asset, in creation order.
    open_offers: BTreeMap<AssetId, BTreeSet<OfferNumber>>,
    next_offer: OfferNumber,
    next_bid: BidNumber,
    offers_count: usize,
    bids_count: usize,
}

impl OrderBook {
    #[must_use]
    pub fn new() -> Self {
        Self {
            offers: BTreeMap::new(),
            bids: BTreeMap::new(),
            open_offers: BTreeMap::new(),
            next_offer: OfferNumber::FIRST,
            next_bid: BidNumber::FIRST,
            offers_count: 0,
            bids_count: 0,
        }
    }

    // -----------------------------------------------------------------
    // Offers
    // -----------------------------------------------------------------

    /// Store a new offer and return its number.
    ///
    /// Inputs are expected to be validated already.
    pub fn add_offer(
        &mut self,
        seller: AccountId,
        asset: AssetId,
        price: Decimal,
        quantity: Decimal,
        epoch_id: EpochId,
        now: DateTime<Utc>,
    ) -> OfferNumber {
        let number = self.next_offer;
        self.next_offer = number.next();

        self.open_offers
            .entry(asset.clone())
            .or_default()
            .insert(number);
        self.offers.insert(
            number,
            Offer {
                number,
                seller,
                asset,
                price,
                quantity,
                remaining_quantity: quantity,
                matched: false,
                epoch_id,
                created_at: now,
            },
        );
        self.offers_count += 1;

        tracing::debug!(offer = %number, seller = %seller, %price, %quantity, "Offer added");
        number
    }

    /// Look up an offer.
    ///
    /// # Errors
    /// Returns `OfferNotFound` for unknown or removed offers.
    pub fn offer(&self, number: OfferNumber) -> Result<&Offer> {
        self.offers
            .get(&number)
            .ok_or(AuctionError::OfferNotFound(number))
    }

    /// Look up an offer the caller may still amend.
    ///
    /// # Errors
    /// - `OfferNotFound` for unknown or removed offers
    /// - `Unauthorized` if the caller is not the seller
    /// - `InvalidInput` if the offer is already matched
    pub fn owned_offer(&self, caller: AccountId, number: OfferNumber) -> Result<&Offer> {
        let offer = self.offer(number)?;
        if offer.seller != caller {
            return Err(AuctionError::unauthorized(format!(
                "{caller} does not own {number}"
            )));
        }
        if offer.matched {
            return Err(AuctionError::invalid(format!("{number} is already matched")));
        }
        Ok(offer)
    }

    /// Lower an offer's price. Returns the previous price.
    ///
    /// # Errors
    /// Ownership errors as [`Self::owned_offer`]; `InvalidInput` unless
    /// `new_price` is strictly below the current price.
    pub fn change_offer_price(
        &mut self,
        caller: AccountId,
        number: OfferNumber,
        new_price: Decimal,
    ) -> Result<Decimal> {
        let old_price = self.owned_offer(caller, number)?.price;
        if new_price >= old_price {
            return Err(AuctionError::invalid(format!(
                "new price {new_price} must be below current {old_price}"
            )));
        }
        if let Some(offer) = self.offers.get_mut(&number) {
            offer.price = new_price;
        }
        tracing::debug!(offer = %number, %old_price, %new_price, "Offer repriced");
        Ok(old_price)
    }

    /// Delete an offer. Returns the removed offer so the caller can release
    /// its escrow.
    ///
    /// # Errors
    /// Ownership errors as [`Self::owned_offer`].
    pub fn remove_offer(&mut self, caller: AccountId, number: OfferNumber) -> Result<Offer> {
        self.owned_offer(caller, number)?;
        let offer = self
            .offers
            .remove(&number)
            .ok_or(AuctionError::OfferNotFound(number))?;
        self.unindex_offer(&offer.asset, number);
        self.offers_count -= 1;
        tracing::debug!(offer = %number, "Offer removed");
        Ok(offer)
    }

    // -----------------------------------------------------------------
    // Bids
    // -----------------------------------------------------------------

    /// Store a blinded bid: only the commitment and its signature are known.
    pub fn add_sealed_bid(
        &mut self,
        committer: AccountId,
        commitment: Commitment,
        signature: Vec<u8>,
        epoch_id: EpochId,
        now: DateTime<Utc>,
    ) -> BidNumber {
        let number = self.allocate_bid();
        self.bids.insert(
            number,
            Bid {
                number,
                committer,
                commitment: Some(commitment),
                signature,
                terms: None,
                revealer: None,
                remaining_quantity: Decimal::ZERO,
                matched: false,
                epoch_id,
                created_at: now,
            },
        );
        tracing::debug!(bid = %number, committer = %committer, %commitment, "Sealed bid added");
        number
    }

    /// Store a bid with plaintext terms. It is immediately visible to the
    /// sweep.
    pub fn add_plain_bid(
        &mut self,
        buyer: AccountId,
        terms: BidTerms,
        epoch_id: EpochId,
        now: DateTime<Utc>,
    ) -> BidNumber {
        let number = self.allocate_bid();
        let remaining_quantity = terms.quantity;
        tracing::debug!(
            bid = %number,
            buyer = %buyer,
            asset = %terms.asset,
            price = %terms.price,
            quantity = %terms.quantity,
            "Plain bid added"
        );
        self.bids.insert(
            number,
            Bid {
                number,
                committer: buyer,
                commitment: None,
                signature: Vec::new(),
                terms: Some(terms),
                revealer: Some(buyer),
                remaining_quantity,
                matched: false,
                epoch_id,
                created_at: now,
            },
        );
        number
    }

    /// Look up a bid.
    ///
    /// # Errors
    /// Returns `BidNotFound` for unknown or removed bids.
    pub fn bid(&self, number: BidNumber) -> Result<&Bid> {
        self.bids.get(&number).ok_or(AuctionError::BidNotFound(number))
    }

    /// Attach verified terms to a hidden bid.
    ///
    /// Verification happens before this call; the book only guards the
    /// hidden → revealed transition itself.
    ///
    /// # Errors
    /// - `BidNotFound` for unknown or removed bids
    /// - `InvalidInput` if the bid is not a hidden sealed bid
    pub fn reveal_bid(
        &mut self,
        number: BidNumber,
        terms: BidTerms,
        revealer: AccountId,
    ) -> Result<()> {
        let bid = self
            .bids
            .get_mut(&number)
            .ok_or(AuctionError::BidNotFound(number))?;
        if !bid.is_sealed() || bid.is_revealed() {
            return Err(AuctionError::invalid(format!("{number} is not a hidden bid")));
        }
        bid.remaining_quantity = terms.quantity;
        bid.terms = Some(terms);
        bid.revealer = Some(revealer);
        tracing::debug!(bid = %number, revealer = %revealer, "Bid revealed");
        Ok(())
    }

    /// Delete a bid. Returns the removed bid so the caller can release its
    /// escrow.
    ///
    /// # Errors
    /// - `BidNotFound` for unknown or removed bids
    /// - `Unauthorized` if the caller is not the committer
    /// - `InvalidInput` if the bid is already matched
    pub fn remove_bid(&mut self, caller: AccountId, number: BidNumber) -> Result<Bid> {
        self.owned_bid(caller, number)?;
        let bid = self
            .bids
            .remove(&number)
            .ok_or(AuctionError::BidNotFound(number))?;
        self.bids_count -= 1;
        tracing::debug!(bid = %number, "Bid removed");
        Ok(bid)
    }

    /// A bid the caller committed and that can still change.
    ///
    /// # Errors
    /// - `BidNotFound` for unknown or removed bids
    /// - `Unauthorized` if the caller is not the committer
    /// - `InvalidInput` if the bid is already matched
    pub fn owned_bid(&self, caller: AccountId, number: BidNumber) -> Result<&Bid> {
        let bid = self.bid(number)?;
        if bid.committer != caller {
            return Err(AuctionError::unauthorized(format!(
                "{caller} does not own {number}"
            )));
        }
        if bid.matched {
            return Err(AuctionError::invalid(format!("{number} is already matched")));
        }
        Ok(bid)
    }

    // -----------------------------------------------------------------
    // Matching support
    // -----------------------------------------------------------------

    /// Decrement both sides of a fill and retire whichever is exhausted.
    ///
    /// # Errors
    /// Returns a not-found error if either order is gone, or `InvalidInput`
    /// if `quantity` exceeds either remainder. Nothing changes on error.
    pub fn apply_fill(
        &mut self,
        bid_number: BidNumber,
        offer_number: OfferNumber,
        quantity: Decimal,
    ) -> Result<FillEffect> {
        let bid_left = self.bid(bid_number)?.remaining_quantity;
        let offer_left = self.offer(offer_number)?.remaining_quantity;
        if quantity <= Decimal::ZERO || quantity > bid_left || quantity > offer_left {
            return Err(AuctionError::invalid(format!(
                "fill {quantity} over {bid_number} ({bid_left}) or {offer_number} ({offer_left})"
            )));
        }

        let mut effect = FillEffect {
            bid_matched: false,
            offer_matched: false,
        };

        if let Some(bid) = self.bids.get_mut(&bid_number) {
            bid.remaining_quantity -= quantity;
            if bid.remaining_quantity.is_zero() {
                bid.matched = true;
                effect.bid_matched = true;
            }
        }
        let mut exhausted_asset = None;
        if let Some(offer) = self.offers.get_mut(&offer_number) {
            offer.remaining_quantity -= quantity;
            if offer.remaining_quantity.is_zero() {
                offer.matched = true;
                effect.offer_matched = true;
                exhausted_asset = Some(offer.asset.clone());
            }
        }

        if effect.bid_matched {
            self.bids_count -= 1;
        }
        if let Some(asset) = exhausted_asset {
            self.unindex_offer(&asset, offer_number);
            self.offers_count -= 1;
        }
        Ok(effect)
    }

    /// Open, revealed bids with number `>= from`, oldest first.
    #[must_use]
    pub fn open_bid_numbers(&self, from: BidNumber) -> Vec<BidNumber> {
        self.bids
            .range(from..)
            .filter(|(_, bid)| bid.is_open())
            .map(|(n, _)| *n)
            .collect()
    }

    /// Open offers for an asset with number `>= from`, oldest first.
    #[must_use]
    pub fn open_offer_numbers(&self, asset: &AssetId, from: OfferNumber) -> Vec<OfferNumber> {
        self.open_offers
            .get(asset)
            .map(|set| set.range(from..).copied().collect())
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------
    // Counters
    // -----------------------------------------------------------------

    /// Offers neither removed nor fully matched.
    #[must_use]
    pub fn offers_count(&self) -> usize {
        self.offers_count
    }

    /// Bids (hidden or revealed) neither removed nor fully matched.
    #[must_use]
    pub fn bids_count(&self) -> usize {
        self.bids_count
    }

    /// Highest offer number allocated so far, if any.
    #[must_use]
    pub fn last_offer_number(&self) -> Option<OfferNumber> {
        (self.next_offer > OfferNumber::FIRST).then(|| OfferNumber(self.next_offer.0 - 1))
    }

    /// Highest bid number allocated so far, if any.
    #[must_use]
    pub fn last_bid_number(&self) -> Option<BidNumber> {
        (self.next_bid > BidNumber::FIRST).then(|| BidNumber(self.next_bid.0 - 1))
    }

    /// The number the next `add_offer` will allocate.
    #[must_use]
    pub fn next_offer_number(&self) -> OfferNumber {
        self.next_offer
    }

    /// The number the next bid will receive.
    #[must_use]
    pub fn next_bid_number(&self) -> BidNumber {
        self.next_bid
    }

    fn allocate_bid(&mut self) -> BidNumber {
        let number = self.next_bid;
        self.next_bid = number.next();
        self.bids_count += 1;
        number
    }

    fn unindex_offer(&mut self, asset: &AssetId, number: OfferNumber) {
        if let Some(set) = self.open_offers.get_mut(asset) {
            set.remove(&number);
            if set.is_empty() {
                self.open_offers.remove(asset);
            }
        }
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}
