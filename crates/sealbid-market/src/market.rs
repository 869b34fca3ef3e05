//! The market facade.
//!
//! [`Market`] owns every component of one auction and is the only thing
//! callers talk to. Each entry point:
//!
//! 1. checks the phase
//! 2. validates input through the [`InputGate`]
//! 3. checks ownership and balances
//! 4. mutates the ledger, escrow book, and order book
//! 5. appends one record to the journal
//!
//! Steps 1-3 never mutate, so an `Err` leaves the market exactly as it was.
//! External transfer capabilities are called with the ledger already
//! settled for the inbound case and debited for the outbound case; a
//! declined withdrawal credits the debit back before returning the error.
//! Every entry point takes `&mut self`, so a capability cannot re-enter the
//! market while it runs.

use rust_decimal::Decimal;
use sealbid_ingress::{
    AssetRegistry, AssetTransfer, CommitmentVerifier, Ed25519Recovery, EscrowBook, InputGate,
    Ledger, OrderBook, SignerRecovery,
};
use sealbid_matchcore::{MatchRules, SweepAborted, SweepCursor, SweepReport, sweep};
use sealbid_settlement::{IdempotencyGuard, Settler, SupplyConservation};
use sealbid_types::{
    AccountId, AccountSnapshot, AssetId, AuctionError, Bid, BidNumber, BidTerms, BidVisibility,
    Commitment, EpochId, EscrowTiming, EventRecord, Holding, MarketConfig, MarketEvent, Offer,
    OfferNumber, OrderRef, Phase, Result, Trade,
};

use crate::{clock::Clock, journal::EventLog, phase::PhaseController};

/// One periodic double auction.
pub struct Market {
    config: MarketConfig,
    gate: InputGate,
    clock: Box<dyn Clock>,
    phase: PhaseController,
    ledger: Ledger,
    escrow: EscrowBook,
    book: OrderBook,
    guard: IdempotencyGuard,
    supply: SupplyConservation,
    registry: AssetRegistry,
    recovery: Box<dyn SignerRecovery>,
    cursor: SweepCursor,
    journal: EventLog,
}

impl Market {
    /// Open a market in DEPOSIT_WITHDRAW. `settlement` moves the
    /// settlement medium in and out of custody.
    ///
    /// # Errors
    /// `Configuration` if the config does not validate.
    pub fn new(
        config: MarketConfig,
        settlement: Box<dyn AssetTransfer>,
        clock: Box<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let now = clock.now();
        let phase = PhaseController::new(&config.phase, config.admin, now);
        tracing::info!(
            admin = %config.admin,
            settlement_asset = %config.settlement_asset,
            visibility = ?config.policy.bid_visibility,
            escrow = ?config.policy.escrow_timing,
            "Market opened"
        );
        Ok(Self {
            gate: InputGate::from_config(&config),
            registry: AssetRegistry::new(config.settlement_asset.clone(), settlement),
            clock,
            phase,
            ledger: Ledger::new(),
            escrow: EscrowBook::new(),
            book: OrderBook::new(),
            guard: IdempotencyGuard::default(),
            supply: SupplyConservation::new(),
            recovery: Box::new(Ed25519Recovery),
            cursor: SweepCursor::START,
            journal: EventLog::new(),
            config,
        })
    }

    /// Replace the signature scheme used to authenticate commitments.
    #[must_use]
    pub fn with_signer_recovery(mut self, recovery: Box<dyn SignerRecovery>) -> Self {
        self.recovery = recovery;
        self
    }

    // -----------------------------------------------------------------
    // Phase control
    // -----------------------------------------------------------------

    /// Advance to the next phase if the dwell has elapsed. Anyone may call
    /// this at any time; inside the dwell it does nothing.
    pub fn advance_phase(&mut self) -> Option<Phase> {
        let from = self.phase.current();
        let to = self.phase.advance(self.clock.now())?;
        self.on_phase_change(from, to, false);
        Some(to)
    }

    /// Administrator override, ignores the dwell.
    ///
    /// # Errors
    /// `Unauthorized` unless `caller` is the administrator.
    pub fn set_phase(&mut self, caller: AccountId, phase: Phase) -> Result<()> {
        let from = self.phase.force(caller, phase, self.clock.now())?;
        self.on_phase_change(from, phase, true);
        Ok(())
    }

    fn on_phase_change(&mut self, from: Phase, to: Phase, forced: bool) {
        if to == Phase::Matching {
            self.cursor = SweepCursor::START;
        }
        tracing::info!(%from, %to, forced, epoch = %self.phase.epoch(), "Phase advanced");
        self.emit(MarketEvent::PhaseAdvanced { from, to, forced });
    }

    /// Make a token depositable. Administrator only, any phase.
    ///
    /// # Errors
    /// - `Unauthorized` unless `caller` is the administrator
    /// - `InvalidInput` for an empty, settlement, or duplicate symbol
    pub fn register_asset(
        &mut self,
        caller: AccountId,
        asset: AssetId,
        transfer: Box<dyn AssetTransfer>,
    ) -> Result<()> {
        if !self.phase.is_admin(caller) {
            return Err(AuctionError::unauthorized(format!(
                "{caller} may not register assets"
            )));
        }
        self.registry.register(asset.clone(), transfer)?;
        self.emit(MarketEvent::AssetRegistered { asset });
        Ok(())
    }

    // -----------------------------------------------------------------
    // Deposits and withdrawals (DEPOSIT_WITHDRAW)
    // -----------------------------------------------------------------

    /// Pull settlement funds in and credit them to `caller`.
    ///
    /// # Errors
    /// `WrongPhase`, `InvalidInput`, or `ExternalTransferFailed`.
    pub fn deposit_settlement(&mut self, caller: AccountId, amount: Decimal) -> Result<()> {
        self.deposit(caller, Holding::Settlement, amount)
    }

    /// Debit `caller` and push settlement funds out.
    ///
    /// # Errors
    /// `WrongPhase`, `InvalidInput`, `InsufficientBalance`, or
    /// `ExternalTransferFailed` (with the debit rolled back).
    pub fn withdraw_settlement(&mut self, caller: AccountId, amount: Decimal) -> Result<()> {
        self.withdraw(caller, Holding::Settlement, amount)
    }

    /// Pull a registered token in and credit it to `caller`.
    ///
    /// # Errors
    /// `WrongPhase`, `InvalidInput` (including unregistered or settlement
    /// symbols), or `ExternalTransferFailed`.
    pub fn deposit_token(
        &mut self,
        caller: AccountId,
        asset: &AssetId,
        amount: Decimal,
    ) -> Result<()> {
        self.deposit(caller, Holding::token(asset), amount)
    }

    /// Debit `caller` and push a token out.
    ///
    /// # Errors
    /// As for [`withdraw_settlement`](Self::withdraw_settlement), plus
    /// `InvalidInput` for an unregistered token.
    pub fn withdraw_token(
        &mut self,
        caller: AccountId,
        asset: &AssetId,
        amount: Decimal,
    ) -> Result<()> {
        self.withdraw(caller, Holding::token(asset), amount)
    }

    fn deposit(&mut self, caller: AccountId, holding: Holding, amount: Decimal) -> Result<()> {
        self.phase.require(Phase::DepositWithdraw)?;
        let amount = self.gate.quantity(amount)?;
        if let Holding::Token(asset) = &holding {
            self.gate.asset(asset)?;
        }

        self.registry.transfer_in(&holding, &caller, amount)?;
        self.ledger.credit(caller, &holding, amount);
        self.supply.record_deposit(&holding, amount);

        tracing::info!(account = %caller, %holding, %amount, "Deposit");
        self.emit(MarketEvent::Deposit {
            account: caller,
            holding,
            amount,
        });
        Ok(())
    }

    fn withdraw(&mut self, caller: AccountId, holding: Holding, amount: Decimal) -> Result<()> {
        self.phase.require(Phase::DepositWithdraw)?;
        let amount = self.gate.withdrawal(amount)?;
        if let Holding::Token(asset) = &holding {
            self.gate.asset(asset)?;
            self.require_registered(asset)?;
        }

        self.ledger.debit(caller, &holding, amount)?;
        if let Err(err) = self.registry.transfer_out(&holding, &caller, amount) {
            self.ledger.credit(caller, &holding, amount);
            tracing::warn!(
                account = %caller,
                %holding,
                %amount,
                error = %err,
                "Withdrawal rolled back"
            );
            return Err(err);
        }
        self.supply.record_withdrawal(&holding, amount);

        tracing::info!(account = %caller, %holding, %amount, "Withdraw");
        self.emit(MarketEvent::Withdraw {
            account: caller,
            holding,
            amount,
        });
        Ok(())
    }

    // -----------------------------------------------------------------
    // Offers (OFFER)
    // -----------------------------------------------------------------

    /// Post an offer to sell `quantity` of `asset` at `price` each. With
    /// escrow at order time the quantity is reserved from the seller's
    /// token balance.
    ///
    /// # Errors
    /// `WrongPhase`, `InvalidInput`, or `InsufficientBalance`.
    pub fn add_offer(
        &mut self,
        caller: AccountId,
        asset: AssetId,
        price: Decimal,
        quantity: Decimal,
    ) -> Result<OfferNumber> {
        self.phase.require(Phase::Offer)?;
        self.gate.asset(&asset)?;
        let price = self.gate.price(price)?;
        let quantity = self.gate.quantity(quantity)?;
        self.require_registered(&asset)?;

        let reserved = match self.config.policy.escrow_timing {
            EscrowTiming::AtOrderTime => {
                self.escrow.reserve(
                    &mut self.ledger,
                    OrderRef::Offer(self.book.next_offer_number()),
                    caller,
                    Holding::token(&asset),
                    quantity,
                )?;
                quantity
            }
            EscrowTiming::AtSettlementTime => Decimal::ZERO,
        };

        let now = self.clock.now();
        let number = self
            .book
            .add_offer(caller, asset.clone(), price, quantity, self.phase.epoch(), now);
        self.emit(MarketEvent::OfferAdded {
            offer_number: number,
            seller: caller,
            asset,
            price,
            quantity,
            reserved,
        });
        Ok(number)
    }

    /// Lower an offer's price.
    ///
    /// # Errors
    /// `WrongPhase`, `OfferNotFound`, `Unauthorized`, or `InvalidInput`
    /// when the new price is not strictly lower.
    pub fn change_offer(
        &mut self,
        caller: AccountId,
        number: OfferNumber,
        new_price: Decimal,
    ) -> Result<()> {
        self.phase.require(Phase::Offer)?;
        let new_price = self.gate.price(new_price)?;
        let old_price = self.book.change_offer_price(caller, number, new_price)?;
        self.emit(MarketEvent::OfferChanged {
            offer_number: number,
            old_price,
            new_price,
        });
        Ok(())
    }

    /// Withdraw an offer and return its escrow to the seller.
    ///
    /// # Errors
    /// `WrongPhase`, `OfferNotFound`, `Unauthorized`, or `InvalidInput`
    /// for a fully matched offer.
    pub fn remove_offer(&mut self, caller: AccountId, number: OfferNumber) -> Result<()> {
        self.phase.require(Phase::Offer)?;
        self.book.owned_offer(caller, number)?;

        let released = self.escrow.release_all(&mut self.ledger, OrderRef::Offer(number))?;
        let removed = self.book.remove_offer(caller, number)?;
        self.emit(MarketEvent::OfferRemoved {
            offer_number: number,
            seller: caller,
            filled: removed.filled_quantity(),
            released,
        });
        Ok(())
    }

    // -----------------------------------------------------------------
    // Bids (BID_OPENING)
    // -----------------------------------------------------------------

    /// Place a blinded bid. Only the commitment and its signature are
    /// stored; nothing is reserved until the reveal.
    ///
    /// # Errors
    /// `WrongPhase`, or `InvalidInput` in a plain-bid market or for an
    /// empty signature.
    pub fn add_sealed_bid(
        &mut self,
        caller: AccountId,
        commitment: Commitment,
        signature: Vec<u8>,
    ) -> Result<BidNumber> {
        self.phase.require(Phase::BidOpening)?;
        self.require_visibility(BidVisibility::Sealed)?;
        if signature.is_empty() {
            return Err(AuctionError::invalid("sealed bid needs a signature"));
        }

        let now = self.clock.now();
        let number = self
            .book
            .add_sealed_bid(caller, commitment, signature, self.phase.epoch(), now);
        self.emit(MarketEvent::BidAdded {
            bid_number: number,
            committer: caller,
            sealed: true,
            reserved: Decimal::ZERO,
        });
        Ok(number)
    }

    /// Place a plaintext bid. With escrow at order time `price × quantity`
    /// of settlement funds is reserved.
    ///
    /// # Errors
    /// `WrongPhase`, `InvalidInput` (also in a sealed-bid market), or
    /// `InsufficientBalance`.
    pub fn add_bid(&mut self, caller: AccountId, terms: BidTerms) -> Result<BidNumber> {
        self.phase.require(Phase::BidOpening)?;
        self.require_visibility(BidVisibility::Plain)?;
        let notional = self.gate.terms(&terms)?;
        self.require_registered(&terms.asset)?;

        let next = self.book.next_bid_number();
        let reserved = self.reserve_bid(next, caller, notional)?;

        let now = self.clock.now();
        let number = self.book.add_plain_bid(caller, terms, self.phase.epoch(), now);
        self.emit(MarketEvent::BidAdded {
            bid_number: number,
            committer: caller,
            sealed: false,
            reserved,
        });
        Ok(number)
    }

    /// Withdraw a bid and return any escrow to the committer.
    ///
    /// # Errors
    /// `WrongPhase`, `BidNotFound`, `Unauthorized`, or `InvalidInput` for
    /// a fully matched bid.
    pub fn remove_bid(&mut self, caller: AccountId, number: BidNumber) -> Result<()> {
        self.phase.require(Phase::BidOpening)?;
        self.book.owned_bid(caller, number)?;

        let released = self.escrow.release_all(&mut self.ledger, OrderRef::Bid(number))?;
        self.book.remove_bid(caller, number)?;
        self.emit(MarketEvent::BidRemoved {
            bid_number: number,
            committer: caller,
            released,
        });
        Ok(())
    }

    // -----------------------------------------------------------------
    // Reveal and matching (MATCHING)
    // -----------------------------------------------------------------

    /// Reveal a sealed bid's terms as `caller`.
    ///
    /// The commitment must hash `terms` together with `caller`, and its
    /// signature must recover to the committer. With escrow at order time
    /// the committer's `price × quantity` is reserved here; a committer
    /// who cannot cover it leaves the bid hidden.
    ///
    /// # Errors
    /// `WrongPhase`, `BidNotFound`, `Unauthorized` (delegation disabled),
    /// `InvalidInput`, `InvalidCommitment`, or `InsufficientBalance`.
    pub fn reveal_bid(
        &mut self,
        caller: AccountId,
        number: BidNumber,
        terms: BidTerms,
        commitment: &Commitment,
    ) -> Result<()> {
        self.phase.require(Phase::Matching)?;
        let notional = self.gate.terms(&terms)?;

        let committer = {
            let bid = self.book.bid(number)?;
            if !self.config.policy.delegated_reveal && caller != bid.committer {
                return Err(AuctionError::unauthorized(format!(
                    "{caller} may not reveal {number} for {}",
                    bid.committer
                )));
            }
            CommitmentVerifier::new(self.recovery.as_ref())
            .verify(bid, &terms, &caller, commitment)?;
            bid.committer
        };

        let reserved = self.reserve_bid(number, committer, notional)?;
        if let Err(err) = self.book.reveal_bid(number, terms.clone(), caller) {
            self.escrow.release_all(&mut self.ledger, OrderRef::Bid(number))?;
            return Err(err);
        }

        self.emit(MarketEvent::BidRevealed {
            bid_number: number,
            revealer: caller,
            asset: terms.asset,
            price: terms.price,
            quantity: terms.quantity,
            reserved,
        });
        Ok(())
    }

    /// Run (or resume) the matching sweep for at most `max_pairs`
    /// bid/offer pairs, the configured default when `None`. Anyone may
    /// trigger it.
    ///
    /// # Errors
    /// `WrongPhase`, `InvalidInput` for a zero budget, or
    /// `SupplyInvariantViolation` if the books no longer balance. A sweep
    /// aborted by settlement still journals the trades it settled first.
    pub fn run_matching(&mut self, max_pairs: Option<usize>) -> Result<SweepReport> {
        self.phase.require(Phase::Matching)?;
        let budget = max_pairs.unwrap_or(self.config.max_pairs_per_sweep);
        if budget == 0 {
            return Err(AuctionError::invalid("max_pairs must be positive"));
        }

        let rules = MatchRules {
            allow_self_trade: self.config.policy.allow_self_trade,
        };
        let epoch = self.phase.epoch();
        let now = self.clock.now();
        let outcome = {
            let mut settler = Settler::new(
                &mut self.ledger,
                &mut self.escrow,
                &mut self.guard,
                self.config.policy.escrow_timing,
            );
            sweep(
                &mut self.book,
                &mut settler,
                &mut self.cursor,
                rules,
                budget,
                epoch,
                now,
            )
        };

        match outcome {
            Ok(report) => {
                self.record_trades(&report.trades);
                self.verify_solvency()?;
                Ok(report)
            }
            Err(SweepAborted { settled, error }) => {
                self.record_trades(&settled);
                Err(error)
            }
        }
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    /// The caller's own balances.
    #[must_use]
    pub fn balance_of(&self, caller: AccountId) -> AccountSnapshot {
        self.ledger.snapshot(caller)
    }

    /// # Errors
    /// `OfferNotFound` if never allocated or removed.
    pub fn offer(&self, number: OfferNumber) -> Result<&Offer> {
        self.book.offer(number)
    }

    /// # Errors
    /// `BidNotFound` if never allocated or removed.
    pub fn bid(&self, number: BidNumber) -> Result<&Bid> {
        self.book.bid(number)
    }

    #[must_use]
    pub fn offers_count(&self) -> usize {
        self.book.offers_count()
    }

    #[must_use]
    pub fn bids_count(&self) -> usize {
        self.book.bids_count()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase.current()
    }

    #[must_use]
    pub fn epoch(&self) -> EpochId {
        self.phase.epoch()
    }

    #[must_use]
    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    /// Where the next `run_matching` call resumes.
    #[must_use]
    pub fn sweep_cursor(&self) -> SweepCursor {
        self.cursor
    }

    #[must_use]
    pub fn registered_assets(&self) -> Vec<AssetId> {
        self.registry.assets()
    }

    #[must_use]
    pub fn events(&self) -> &[EventRecord] {
        self.journal.records()
    }

    /// Records newer than `sequence`.
    #[must_use]
    pub fn events_since(&self, sequence: u64) -> &[EventRecord] {
        self.journal.since(sequence)
    }

    #[must_use]
    pub fn journal(&self) -> &EventLog {
        &self.journal
    }

    /// Check supply conservation for every holding.
    ///
    /// # Errors
    /// `SupplyInvariantViolation` on the first mismatch.
    pub fn verify_solvency(&self) -> Result<()> {
        self.supply.verify_all(&self.ledger, &self.escrow).inspect_err(|err| {
            tracing::error!(error = %err, "Supply conservation violated");
        })
    }

    // -----------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------

    fn reserve_bid(
        &mut self,
        number: BidNumber,
        owner: AccountId,
        notional: Decimal,
    ) -> Result<Decimal> {
        match self.config.policy.escrow_timing {
            EscrowTiming::AtOrderTime => {
                self.escrow.reserve(
                    &mut self.ledger,
                    OrderRef::Bid(number),
                    owner,
                    Holding::Settlement,
                    notional,
                )?;
                Ok(notional)
            }
            EscrowTiming::AtSettlementTime => Ok(Decimal::ZERO),
        }
    }

    fn require_visibility(&self, shape: BidVisibility) -> Result<()> {
        let market = self.config.policy.bid_visibility;
        if market == shape {
            Ok(())
        } else {
            Err(AuctionError::invalid(format!(
                "{shape:?} bid placed in a {market:?} market"
            )))
        }
    }

    fn require_registered(&self, asset: &AssetId) -> Result<()> {
        if self.registry.is_registered(asset) {
            Ok(())
        } else {
            Err(AuctionError::invalid(format!("{asset} is not registered")))
        }
    }

    fn record_trades(&mut self, trades: &[Trade]) {
        for trade in trades {
            self.emit(MarketEvent::Trade(trade.clone()));
        }
    }

    fn emit(&mut self, event: MarketEvent) -> u64 {
        let at = self.clock.now();
        self.journal.append(self.phase.epoch(), at, event)
    }
}

impl std::fmt::Debug for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Market")
            .field("phase", &self.phase.current())
            .field("epoch", &self.phase.epoch())
            .field("offers", &self.book.offers_count())
            .field("bids", &self.book.bids_count())
            .field("events", &self.journal.len())
            .finish_non_exhaustive()
    }
}
