//! Shared harness: a market with in-memory vaults, a manual clock, and
//! three known participants.

#![allow(dead_code)]

use ed25519_dalek::SigningKey;
use rust_decimal::Decimal;
use sealbid_ingress::{MemoryVault, sign_commitment};
use sealbid_market::{ManualClock, Market};
use sealbid_types::*;

pub fn d(n: i64) -> Decimal {
    Decimal::new(n, 0)
}

pub fn gold() -> AssetId {
    AssetId::new("GOLD")
}

pub fn account(key: &SigningKey) -> AccountId {
    AccountId::from_pubkey(key.verifying_key().to_bytes())
}

pub struct Harness {
    pub market: Market,
    pub clock: ManualClock,
    pub cash: MemoryVault,
    pub bullion: MemoryVault,
    pub admin: AccountId,
    pub seller: AccountId,
    pub buyer_key: SigningKey,
    pub buyer: AccountId,
}

impl Harness {
    pub fn new(policy: MarketPolicy) -> Self {
        let admin = AccountId([0xAD; 32]);
        let seller = account(&SigningKey::from_bytes(&[2; 32]));
        let buyer_key = SigningKey::from_bytes(&[3; 32]);
        let buyer = account(&buyer_key);

        let cash = MemoryVault::new();
        let bullion = MemoryVault::new();
        let clock = ManualClock::default();
        let config = MarketConfig::new(admin).with_policy(policy);
        let mut market = Market::new(config, Box::new(cash.clone()), Box::new(clock.clone()))
            .expect("valid config");
        market
            .register_asset(admin, gold(), Box::new(bullion.clone()))
            .expect("register GOLD");

        Self {
            market,
            clock,
            cash,
            bullion,
            admin,
            seller,
            buyer_key,
            buyer,
        }
    }

    /// Sealed bids, escrow at order time.
    pub fn sealed() -> Self {
        Self::new(MarketPolicy::default())
    }

    /// Plain bids with the given escrow timing.
    pub fn plain(escrow_timing: EscrowTiming) -> Self {
        Self::new(MarketPolicy {
            bid_visibility: BidVisibility::Plain,
            escrow_timing,
            ..MarketPolicy::default()
        })
    }

    pub fn phase(&mut self, phase: Phase) {
        self.market.set_phase(self.admin, phase).expect("admin override");
    }

    /// Fund wallets and deposit: `gold` for the seller, `cash` for the buyer.
    pub fn fund(&mut self, gold_amount: i64, cash_amount: i64) {
        self.phase(Phase::DepositWithdraw);
        self.bullion.fund(self.seller, d(gold_amount));
        self.cash.fund(self.buyer, d(cash_amount));
        self.market
            .deposit_token(self.seller, &gold(), d(gold_amount))
            .expect("seller deposit");
        self.market
            .deposit_settlement(self.buyer, d(cash_amount))
            .expect("buyer deposit");
    }

    pub fn offer(&mut self, price: i64, qty: i64) -> OfferNumber {
        self.phase(Phase::Offer);
        self.market
            .add_offer(self.seller, gold(), d(price), d(qty))
            .expect("offer")
    }

    pub fn terms(price: i64, qty: i64) -> BidTerms {
        BidTerms::new(gold(), d(price), d(qty))
    }

    /// Commit to `terms` with the buyer as revealer.
    pub fn sealed_bid(&mut self, terms: &BidTerms) -> (BidNumber, Commitment) {
        self.phase(Phase::BidOpening);
        let commitment = terms.commitment(&self.buyer);
        let signature = sign_commitment(&self.buyer_key, &commitment);
        let n = self
            .market
            .add_sealed_bid(self.buyer, commitment, signature)
            .expect("sealed bid");
        (n, commitment)
    }

    pub fn plain_bid(&mut self, price: i64, qty: i64) -> BidNumber {
        self.phase(Phase::BidOpening);
        self.market
            .add_bid(self.buyer, Self::terms(price, qty))
            .expect("plain bid")
    }

    pub fn reveal(&mut self, n: BidNumber, terms: BidTerms, commitment: &Commitment) {
        self.phase(Phase::Matching);
        self.market
            .reveal_bid(self.buyer, n, terms, commitment)
            .expect("reveal");
    }

    pub fn balance(&self, who: AccountId) -> AccountSnapshot {
        self.market.balance_of(who)
    }
}
