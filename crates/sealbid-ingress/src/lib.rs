//! # sealbid-ingress
//!
//! **Security envelope**: everything that stands between a participant's
//! call and the matching sweep.
//!
//! ## Components
//!
//! 1. **Ledger**: available/reserved balances per (account, holding)
//! 2. **EscrowBook**: per-order reservations backed by the ledger
//! 3. **InputGate**: hard validation of amounts, prices, and symbols
//! 4. **OrderBook**: offers, bids, and the per-asset open-offer index
//! 5. **CommitmentVerifier**: gates a sealed bid's reveal
//! 6. **AssetRegistry**: external transfer capabilities per asset
//!
//! ## Order Flow
//!
//! ```text
//! call → InputGate → EscrowBook.reserve() → OrderBook.add_*()
//! reveal → CommitmentVerifier.verify() → EscrowBook.reserve() → OrderBook.reveal_bid()
//! ```
//!
//! Nothing here knows about phases; the market facade gates every call.

pub mod commitment;
pub mod escrow;
pub mod input_gate;
pub mod ledger;
pub mod order_book;
pub mod transfer;

pub use commitment::{CommitmentVerifier, Ed25519Recovery, SignerRecovery, sign_commitment};
pub use escrow::{EscrowBook, Reservation};
pub use input_gate::InputGate;
pub use ledger::Ledger;
pub use order_book::{FillEffect, OrderBook};
pub use transfer::{AssetRegistry, AssetTransfer, MemoryVault};
