//! # sealbid-settlement
//!
//! **Finality plane**: turns the sweep's candidate fills into ledger
//! movements.
//!
//! ## Architecture
//!
//! [`Settler`] implements the matchcore [`FillSink`](sealbid_matchcore::FillSink)
//! and, per fill:
//! 1. Validates idempotency (a pair settles once)
//! 2. Checks both sides can deliver under the market's escrow timing
//! 3. Moves the asset to the buyer and the cost to the seller
//! 4. Refunds the buyer's price improvement when escrow was taken up front
//!
//! [`SupplyConservation`] re-checks after every sweep that no value was
//! created or destroyed.

pub mod idempotency;
pub mod settler;
pub mod supply_conservation;

pub use idempotency::IdempotencyGuard;
pub use settler::Settler;
pub use supply_conservation::SupplyConservation;
