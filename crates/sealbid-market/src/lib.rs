//! # sealbid-market
//!
//! The **Sealbid** periodic double auction behind a single facade.
//!
//! [`Market`] wires the lower crates together:
//!
//! - [`PhaseController`]: the DEPOSIT_WITHDRAW → OFFER → BID_OPENING →
//!   MATCHING cycle with a minimum dwell per phase
//! - the escrow ledger, order book, and commitment verifier from
//!   `sealbid-ingress`
//! - the resumable sweep from `sealbid-matchcore`
//! - the settler, idempotency guard, and supply check from
//!   `sealbid-settlement`
//! - [`EventLog`]: the append-only audit journal
//!
//! ## Lifecycle
//!
//! ```text
//! ┌──────────────────┐   ┌─────────┐   ┌─────────────┐   ┌──────────────────┐
//! │ DEPOSIT_WITHDRAW │──▶│  OFFER  │──▶│ BID_OPENING │──▶│     MATCHING     │
//! │ deposit/withdraw │   │ offers  │   │ (sealed)    │   │ reveal + sweep   │
//! └──────────────────┘   └─────────┘   │ bids        │   └────────┬─────────┘
//!          ▲                           └─────────────┘            │
//!          └──────────────────────── next epoch ──────────────────┘
//! ```
//!
//! Time comes from an injected [`Clock`], so tests drive the dwell with a
//! [`ManualClock`].

pub mod clock;
pub mod journal;
pub mod market;
pub mod phase;
pub mod telemetry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use journal::EventLog;
pub use market::Market;
pub use phase::PhaseController;
pub use telemetry::LogFormat;
