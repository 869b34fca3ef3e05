//! Determinism verification for sweep results.
//!
//! Replaying the same sequence of calls must produce the exact same trades.
//! The `trade_root` is a hash over the ordered trades that lets two runs be
//! compared without diffing full payloads.

use sealbid_types::Trade;
use sha2::{Digest, Sha256};

/// Compute the trade root hash over a set of trades.
///
/// Covers, per trade in order: id, epoch, both order numbers, both
/// parties, asset, settlement price, bid price, quantity, cost, and refund.
/// Execution timestamps are excluded.
#[must_use]
pub fn compute_trade_root(trades: &[Trade]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"sealbid:trade_root:v1:");
    hasher.update((trades.len() as u64).to_le_bytes());

    for trade in trades {
        hasher.update(trade.id.0.as_bytes());
        hasher.update(trade.epoch_id.0.to_le_bytes());
        hasher.update(trade.bid_number.0.to_le_bytes());
        hasher.update(trade.offer_number.0.to_le_bytes());
        hasher.update(trade.buyer.as_bytes());
        hasher.update(trade.seller.as_bytes());
        hasher.update((trade.asset.as_str().len() as u64).to_le_bytes());
        hasher.update(trade.asset.as_str().as_bytes());
        for amount in [
            trade.price,
            trade.bid_price,
            trade.quantity,
            trade.cost,
            trade.refund,
        ] {
            hasher.update(amount.normalize().to_string().as_bytes());
            hasher.update(b"|");
        }
    }

    let result = hasher.finalize();
    let mut root = [0u8; 32];
    root.copy_from_slice(&result);
    root
}

/// Recompute the root from `trades` and compare.
#[must_use]
pub fn verify_trade_root(trades: &[Trade], expected_root: &[u8; 32]) -> bool {
    compute_trade_root(trades) == *expected_root
}
