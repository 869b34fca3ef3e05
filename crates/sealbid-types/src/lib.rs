//! # sealbid-types
//!
//! Shared types, errors, and configuration for the **Sealbid** periodic
//! double auction.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`AccountId`], [`AssetId`], [`OfferNumber`], [`BidNumber`], [`TradeId`], [`EpochId`]
//! - **Balances**: [`Holding`], [`BalanceEntry`], [`AccountSnapshot`]
//! - **Order model**: [`Offer`], [`Bid`], [`BidTerms`], [`Commitment`], [`OrderRef`]
//! - **Trade model**: [`Trade`]
//! - **Phase model**: [`Phase`], [`PhaseConfig`]
//! - **Event records**: [`MarketEvent`], [`EventRecord`]
//! - **Configuration**: [`MarketConfig`], [`MarketPolicy`], [`BidVisibility`], [`EscrowTiming`]
//! - **Errors**: [`AuctionError`] with `SB_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod balance;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod order;
pub mod phase;
pub mod trade;

// Re-export all primary types at crate root for ergonomic imports:
//   use sealbid_types::{Offer, Bid, Trade, Phase, ...};

pub use balance::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use order::*;
pub use phase::*;
pub use trade::*;

// Constants are accessed via `sealbid_types::constants::FOO`
// (not re-exported to avoid name collisions).
