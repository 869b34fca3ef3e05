//! Resumable price-time matching sweep.
//!
//! ```text
//! sweep(book, sink, cursor, rules, budget) -> SweepReport | SweepAborted
//! ```
//!
//! Bids are walked oldest-first. Each bid is crossed against the open
//! offers of its asset, also oldest-first, so priority is by creation
//! order rather than by price. A pair is eligible when the offer's price
//! does not exceed the bid's and, unless self-trade is allowed, the seller
//! is not the buyer. The fill quantity is the smaller remainder and the
//! price is always the offer's.
//!
//! The sweep never touches balances. Every candidate fill is handed to a
//! [`FillSink`], which either settles it atomically or tells the sweep to
//! skip the pair or the whole bid. Only settled fills change the book.
//!
//! ## Budget
//!
//! A call examines at most `max_pairs` bid/offer pairs. When the budget
//! runs out the position is saved in the [`SweepCursor`] and the next call
//! resumes exactly there. A pass that reaches the end resets the cursor, so
//! re-running a completed sweep converges to zero new trades.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sealbid_ingress::OrderBook;
use sealbid_types::{
    AccountId, AssetId, AuctionError, BidNumber, EpochId, OfferNumber, Result, Trade, TradeId,
};

use crate::determinism::compute_trade_root;

/// A candidate fill proposed to the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fill {
    pub bid_number: BidNumber,
    pub offer_number: OfferNumber,
    pub asset: AssetId,
    pub buyer: AccountId,
    pub seller: AccountId,
    /// Settlement price (the offer's).
    pub price: Decimal,
    /// The bid's own limit price.
    pub bid_price: Decimal,
    pub quantity: Decimal,
    /// `price × quantity`.
    pub cost: Decimal,
}

/// The sink's answer to a candidate fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillDecision {
    /// Funds moved. `refund` is what went back to the buyer's available
    /// balance on top of the cost.
    Settled { refund: Decimal },
    /// This offer cannot fill this bid; try the next offer.
    SkipPair,
    /// This bid cannot be funded; move on to the next bid.
    SkipBid,
}

/// Applies fills to balances.
pub trait FillSink {
    /// Settle `fill` atomically or decline it.
    ///
    /// # Errors
    /// An `Err` aborts the sweep; the sink must leave balances untouched
    /// when it returns one.
    fn settle(&mut self, fill: &Fill) -> Result<FillDecision>;
}

/// Pair-level rules of the market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchRules {
    pub allow_self_trade: bool,
}

/// Where the next sweep call resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepCursor {
    pub bid: BidNumber,
    pub offer: OfferNumber,
}

impl SweepCursor {
    /// The start of a fresh pass.
    pub const START: Self = Self {
        bid: BidNumber::FIRST,
        offer: OfferNumber::FIRST,
    };

    #[must_use]
    pub fn is_start(&self) -> bool {
        *self == Self::START
    }
}

impl Default for SweepCursor {
    fn default() -> Self {
        Self::START
    }
}

/// Outcome of one sweep call.
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub epoch_id: EpochId,
    /// Trades settled by this call, in settlement order.
    pub trades: Vec<Trade>,
    pub pairs_examined: usize,
    /// `true` when the pass reached the end; `false` when the budget ran
    /// out and the cursor holds the resume point.
    pub complete: bool,
    pub trade_root: [u8; 32],
}

/// A sweep stopped by an error after settling `settled`.
///
/// Settled trades have already moved funds and changed the book, so they
/// travel with the error and must still be recorded by the caller.
#[derive(Debug, thiserror::Error)]
#[error("sweep aborted after {} settled trades: {error}", .settled.len())]
pub struct SweepAborted {
    pub settled: Vec<Trade>,
    #[source]
    pub error: AuctionError,
}

/// Run the sweep from `cursor` for at most `max_pairs` pairs.
///
/// # Errors
/// [`SweepAborted`] with the trades settled so far when the sink or the
/// book fails; the cursor then points at the failing pair.
pub fn sweep(
    book: &mut OrderBook,
    sink: &mut dyn FillSink,
    cursor: &mut SweepCursor,
    rules: MatchRules,
    max_pairs: usize,
    epoch_id: EpochId,
    now: DateTime<Utc>,
) -> std::result::Result<SweepReport, SweepAborted> {
    let mut trades = Vec::new();
    match walk(book, sink, cursor, rules, max_pairs, epoch_id, now, &mut trades) {
        Ok((examined, complete)) => Ok(finish(epoch_id, trades, examined, complete, cursor)),
        Err(error) => {
            tracing::error!(
                epoch = %epoch_id,
                settled = trades.len(),
                resume_bid = %cursor.bid,
                resume_offer = %cursor.offer,
                error = %error,
                "Sweep aborted"
            );
            Err(SweepAborted {
                settled: trades,
                error,
            })
        }
    }
}

/// Walk pairs, pushing settled trades; returns `(pairs examined, complete)`.
#[allow(clippy::too_many_arguments)]
fn walk(
    book: &mut OrderBook,
    sink: &mut dyn FillSink,
    cursor: &mut SweepCursor,
    rules: MatchRules,
    max_pairs: usize,
    epoch_id: EpochId,
    now: DateTime<Utc>,
    trades: &mut Vec<Trade>,
) -> Result<(usize, bool)> {
    let mut examined = 0usize;
    let resume = *cursor;

    for bid_number in book.open_bid_numbers(resume.bid) {
        let (asset, bid_price, buyer) = {
            let bid = book.bid(bid_number)?;
            match (&bid.terms, bid.is_open()) {
                (Some(terms), true) => (terms.asset.clone(), terms.price, bid.committer),
                _ => continue,
            }
        };
        let offer_from = if bid_number == resume.bid {
            resume.offer
        } else {
            OfferNumber::FIRST
        };

        for offer_number in book.open_offer_numbers(&asset, offer_from) {
            if examined >= max_pairs {
                *cursor = SweepCursor {
                    bid: bid_number,
                    offer: offer_number,
                };
                return Ok((examined, false));
            }
            examined += 1;

            let offer = book.offer(offer_number)?;
            if !offer.is_open() || offer.price > bid_price {
                continue;
            }
            if !rules.allow_self_trade && offer.seller == buyer {
                tracing::debug!(bid = %bid_number, offer = %offer_number, "Self-trade skipped");
                continue;
            }

            let quantity = book
                .bid(bid_number)?
                .remaining_quantity
                .min(offer.remaining_quantity);
            let Some(cost) = offer.price.checked_mul(quantity) else {
                tracing::warn!(
                    bid = %bid_number,
                    offer = %offer_number,
                    "Fill cost overflows, pair skipped"
                );
                continue;
            };
            let fill = Fill {
                bid_number,
                offer_number,
                asset: asset.clone(),
                buyer,
                seller: offer.seller,
                price: offer.price,
                bid_price,
                quantity,
                cost,
            };

            *cursor = SweepCursor {
                bid: bid_number,
                offer: offer_number,
            };
            let decision = sink.settle(&fill)?;

            match decision {
                FillDecision::Settled { refund } => {
                    let effect = book.apply_fill(bid_number, offer_number, quantity)?;
                    tracing::debug!(
                        bid = %bid_number,
                        offer = %offer_number,
                        %quantity,
                        price = %fill.price,
                        %cost,
                        %refund,
                        "Fill settled"
                    );
                    trades.push(Trade {
                        id: TradeId::for_pair(bid_number, offer_number),
                        epoch_id,
                        asset: fill.asset,
                        offer_number,
                        bid_number,
                        price: fill.price,
                        bid_price,
                        quantity,
                        cost,
                        refund,
                        seller: fill.seller,
                        buyer,
                        executed_at: now,
                    });
                    if effect.bid_matched {
                        break;
                    }
                }
                FillDecision::SkipPair => {
                    tracing::warn!(
                        bid = %bid_number,
                        offer = %offer_number,
                        "Pair skipped by settlement"
                    );
                }
                FillDecision::SkipBid => {
                    tracing::warn!(
                        bid = %bid_number,
                        offer = %offer_number,
                        "Bid skipped by settlement"
                    );
                    break;
                }
            }
        }
    }

    *cursor = SweepCursor::START;
    Ok((examined, true))
}

fn finish(
    epoch_id: EpochId,
    trades: Vec<Trade>,
    pairs_examined: usize,
    complete: bool,
    cursor: &SweepCursor,
) -> SweepReport {
    let trade_root = compute_trade_root(&trades);
    tracing::info!(
        epoch = %epoch_id,
        trades = trades.len(),
        pairs_examined,
        complete,
        resume_bid = %cursor.bid,
        resume_offer = %cursor.offer,
        trade_root = hex::encode(trade_root),
        "Sweep finished"
    );
    SweepReport {
        epoch_id,
        trades,
        pairs_examined,
        complete,
        trade_root,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use sealbid_types::BidTerms;

    use super::*;

    /// Settles everything, optionally refusing some offers or bids.
    #[derive(Default)]
    struct TestSink {
        short_offers: HashSet<OfferNumber>,
        broke_bids: HashSet<BidNumber>,
        failing_bids: HashSet<BidNumber>,
        fills: Vec<Fill>,
    }

    impl FillSink for TestSink {
        fn settle(&mut self, fill: &Fill) -> Result<FillDecision> {
            if self.failing_bids.contains(&fill.bid_number) {
                return Err(AuctionError::invalid("escrow missing"));
            }
            if self.broke_bids.contains(&fill.bid_number) {
                return Ok(FillDecision::SkipBid);
            }
            if self.short_offers.contains(&fill.offer_number) {
                return Ok(FillDecision::SkipPair);
            }
            self.fills.push(fill.clone());
            Ok(FillDecision::Settled {
                refund: fill.quantity * (fill.bid_price - fill.price),
            })
        }
    }

    fn gold() -> AssetId {
        AssetId::new("GOLD")
    }

    fn offer(book: &mut OrderBook, seller: AccountId, price: i64, qty: i64) -> OfferNumber {
        book.add_offer(
            seller,
            gold(),
            Decimal::new(price, 0),
            Decimal::new(qty, 0),
            EpochId(0),
            Utc::now(),
        )
    }

    fn bid(book: &mut OrderBook, buyer: AccountId, price: i64, qty: i64) -> BidNumber {
        book.add_plain_bid(
            buyer,
            BidTerms::new(gold(), Decimal::new(price, 0), Decimal::new(qty, 0)),
            EpochId(0),
            Utc::now(),
        )
    }

    fn run(
        book: &mut OrderBook,
        sink: &mut TestSink,
        cursor: &mut SweepCursor,
        budget: usize,
    ) -> SweepReport {
        sweep(
            book,
            sink,
            cursor,
            MatchRules {
                allow_self_trade: false,
            },
            budget,
            EpochId(0),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn settles_at_offer_price() {
        let mut book = OrderBook::new();
        let seller = AccountId::random();
        let buyer = AccountId::random();
        let o = offer(&mut book, seller, 10, 100);
        let b = bid(&mut book, buyer, 12, 50);

        let mut sink = TestSink::default();
        let mut cursor = SweepCursor::START;
        let report = run(&mut book, &mut sink, &mut cursor, 100);

        assert!(report.complete);
        assert_eq!(report.trades.len(), 1);
        let t = &report.trades[0];
        assert_eq!((t.bid_number, t.offer_number), (b, o));
        assert_eq!(t.price, Decimal::new(10, 0));
        assert_eq!(t.quantity, Decimal::new(50, 0));
        assert_eq!(t.cost, Decimal::new(500, 0));
        assert_eq!(t.refund, Decimal::new(100, 0));
        assert!(book.bid(b).unwrap().matched);
        assert_eq!(book.offer(o).unwrap().remaining_quantity, Decimal::new(50, 0));
    }

    #[test]
    fn oldest_offer_wins_not_cheapest() {
        let mut book = OrderBook::new();
        let buyer = AccountId::random();
        let first = offer(&mut book, AccountId::random(), 11, 10);
        let _cheaper = offer(&mut book, AccountId::random(), 9, 10);
        bid(&mut book, buyer, 12, 10);

        let mut sink = TestSink::default();
        let report = run(&mut book, &mut sink, &mut SweepCursor::START, 100);
        assert_eq!(report.trades.len(), 1);
        assert_eq!(report.trades[0].offer_number, first);
        assert_eq!(report.trades[0].price, Decimal::new(11, 0));
    }

    #[test]
    fn overpriced_offer_and_self_trade_skipped() {
        let mut book = OrderBook::new();
        let buyer = AccountId::random();
        offer(&mut book, AccountId::random(), 13, 10);
        offer(&mut book, buyer, 10, 10);
        let fair = offer(&mut book, AccountId::random(), 12, 10);
        bid(&mut book, buyer, 12, 10);

        let mut sink = TestSink::default();
        let report = run(&mut book, &mut sink, &mut SweepCursor::START, 100);
        assert_eq!(report.trades.len(), 1);
        assert_eq!(report.trades[0].offer_number, fair);
        assert_eq!(report.pairs_examined, 3);
    }

    #[test]
    fn self_trade_allowed_by_rule() {
        let mut book = OrderBook::new();
        let trader = AccountId::random();
        offer(&mut book, trader, 10, 10);
        bid(&mut book, trader, 10, 10);

        let mut sink = TestSink::default();
        let report = sweep(
            &mut book,
            &mut sink,
            &mut SweepCursor::START,
            MatchRules {
                allow_self_trade: true,
            },
            100,
            EpochId(0),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(report.trades.len(), 1);
    }

    #[test]
    fn one_bid_fills_across_offers() {
        let mut book = OrderBook::new();
        let o1 = offer(&mut book, AccountId::random(), 10, 30);
        let o2 = offer(&mut book, AccountId::random(), 10, 30);
        let b = bid(&mut book, AccountId::random(), 10, 50);

        let mut sink = TestSink::default();
        let report = run(&mut book, &mut sink, &mut SweepCursor::START, 100);
        let qtys: Vec<_> = report.trades.iter().map(|t| t.quantity).collect();
        assert_eq!(qtys, vec![Decimal::new(30, 0), Decimal::new(20, 0)]);
        assert!(book.offer(o1).unwrap().matched);
        assert_eq!(book.offer(o2).unwrap().remaining_quantity, Decimal::new(10, 0));
        assert!(book.bid(b).unwrap().matched);
    }

    #[test]
    fn skip_pair_tries_next_offer() {
        let mut book = OrderBook::new();
        let short = offer(&mut book, AccountId::random(), 10, 10);
        let good = offer(&mut book, AccountId::random(), 10, 10);
        bid(&mut book, AccountId::random(), 10, 10);

        let mut sink = TestSink::default();
        sink.short_offers.insert(short);
        let report = run(&mut book, &mut sink, &mut SweepCursor::START, 100);
        assert_eq!(report.trades.len(), 1);
        assert_eq!(report.trades[0].offer_number, good);
        assert!(book.offer(short).unwrap().is_open());
    }

    #[test]
    fn skip_bid_moves_to_next_bid() {
        let mut book = OrderBook::new();
        offer(&mut book, AccountId::random(), 10, 10);
        offer(&mut book, AccountId::random(), 10, 10);
        let broke = bid(&mut book, AccountId::random(), 10, 20);
        let funded = bid(&mut book, AccountId::random(), 10, 5);

        let mut sink = TestSink::default();
        sink.broke_bids.insert(broke);
        let report = run(&mut book, &mut sink, &mut SweepCursor::START, 100);
        assert_eq!(report.trades.len(), 1);
        assert_eq!(report.trades[0].bid_number, funded);
        // broke bid examined only its first offer before breaking out
        assert_eq!(report.pairs_examined, 2);
        assert!(book.bid(broke).unwrap().is_open());
    }

    #[test]
    fn sink_error_keeps_trades_already_settled() {
        let mut book = OrderBook::new();
        let o = offer(&mut book, AccountId::random(), 10, 10);
        let settled = bid(&mut book, AccountId::random(), 10, 5);
        let failing = bid(&mut book, AccountId::random(), 10, 5);

        let mut sink = TestSink::default();
        sink.failing_bids.insert(failing);
        let mut cursor = SweepCursor::START;
        let aborted = sweep(
            &mut book,
            &mut sink,
            &mut cursor,
            MatchRules {
                allow_self_trade: false,
            },
            100,
            EpochId(0),
            Utc::now(),
        )
        .unwrap_err();

        assert!(matches!(aborted.error, AuctionError::InvalidInput { .. }));
        assert_eq!(aborted.settled.len(), 1);
        assert_eq!(aborted.settled[0].bid_number, settled);
        assert_eq!(
            cursor,
            SweepCursor {
                bid: failing,
                offer: o,
            }
        );
        assert!(book.bid(settled).unwrap().matched);
        assert!(book.bid(failing).unwrap().is_open());
        assert_eq!(book.offer(o).unwrap().remaining_quantity, Decimal::new(5, 0));
    }

    #[test]
    fn hidden_bids_are_invisible() {
        let mut book = OrderBook::new();
        offer(&mut book, AccountId::random(), 10, 10);
        let buyer = AccountId::random();
        let terms = BidTerms::new(gold(), Decimal::new(20, 0), Decimal::new(10, 0));
        book.add_sealed_bid(buyer, terms.commitment(&buyer), vec![], EpochId(0), Utc::now());

        let mut sink = TestSink::default();
        let report = run(&mut book, &mut sink, &mut SweepCursor::START, 100);
        assert!(report.trades.is_empty());
        assert_eq!(report.pairs_examined, 0);
        assert!(sink.fills.is_empty());
    }

    #[test]
    fn budget_exhaustion_resumes_at_cursor() {
        let mut book = OrderBook::new();
        for _ in 0..3 {
            offer(&mut book, AccountId::random(), 10, 1);
        }
        for _ in 0..3 {
            bid(&mut book, AccountId::random(), 10, 1);
        }

        let mut sink = TestSink::default();
        let mut cursor = SweepCursor::START;

        let first = run(&mut book, &mut sink, &mut cursor, 2);
        assert!(!first.complete);
        assert_eq!(first.pairs_examined, 2);
        assert_eq!(first.trades.len(), 2);
        assert!(!cursor.is_start());

        let mut total = first.trades.len();
        let mut calls = 1;
        loop {
            let report = run(&mut book, &mut sink, &mut cursor, 2);
            total += report.trades.len();
            calls += 1;
            if report.complete {
                break;
            }
            assert!(calls < 10, "sweep never completed");
        }
        assert_eq!(total, 3);
        assert!(cursor.is_start());
        assert_eq!(book.bids_count(), 0);
        assert_eq!(book.offers_count(), 0);
    }

    #[test]
    fn rerun_after_completion_adds_nothing() {
        let mut book = OrderBook::new();
        offer(&mut book, AccountId::random(), 10, 100);
        bid(&mut book, AccountId::random(), 12, 50);

        let mut sink = TestSink::default();
        let mut cursor = SweepCursor::START;
        let first = run(&mut book, &mut sink, &mut cursor, 100);
        let second = run(&mut book, &mut sink, &mut cursor, 100);
        assert_eq!(first.trades.len(), 1);
        assert!(second.trades.is_empty());
        assert!(second.complete);
        assert_eq!(sink.fills.len(), 1);
    }

    #[test]
    fn same_book_same_root() {
        let build = || {
            let mut book = OrderBook::new();
            let seller = AccountId([1; 32]);
            let buyer = AccountId([2; 32]);
            offer(&mut book, seller, 10, 100);
            offer(&mut book, seller, 9, 100);
            bid(&mut book, buyer, 12, 150);
            book
        };
        let mut a = build();
        let mut b = build();
        let ra = run(&mut a, &mut TestSink::default(), &mut SweepCursor::START, 100);
        let rb = run(&mut b, &mut TestSink::default(), &mut SweepCursor::START, 100);
        assert_eq!(ra.trade_root, rb.trade_root);
        assert_eq!(ra.trades.len(), 2);
    }
}
