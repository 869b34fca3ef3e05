//! # sealbid-matchcore
//!
//! **Deterministic matching sweep for Sealbid.**
//!
//! The sweep walks revealed bids against open offers in creation order and
//! proposes fills. It has:
//!
//! - **No balance logic**: every fill goes through a [`FillSink`]
//! - **Deterministic output**: same calls in, same trades and trade root out
//! - **Bounded work**: a pair budget per call with a resumable cursor
//! - **Self-trade prevention**: seller == buyer pairs skipped unless allowed

pub mod determinism;
pub mod matcher;

pub use determinism::{compute_trade_root, verify_trade_root};
pub use matcher::{
    Fill, FillDecision, FillSink, MatchRules, SweepAborted, SweepCursor, SweepReport, sweep,
};
