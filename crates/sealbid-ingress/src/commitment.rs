//! Commitment verifier: gates a bid's hidden → revealed transition.
//!
//! A sealed bid stores only a SHA-256 commitment, a signature over it, and
//! the committer's identity. A reveal is accepted only when all of these
//! hold:
//!
//! 1. the caller-supplied commitment equals the stored one,
//! 2. the commitment recomputed from the caller-supplied terms and the
//!    revealer identity equals the stored one,
//! 3. the signature over the commitment recovers to the committer.
//!
//! The verifier never trusts the supplied terms; it rebuilds the hash from
//! them, so fabricated terms cannot ride on someone else's commitment.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use sealbid_types::{
    AccountId, AuctionError, Bid, BidTerms, Commitment, Result, constants,
};

/// Recovers the identity that signed a message.
///
/// Returns `None` when the signature is malformed or does not verify.
pub trait SignerRecovery {
    fn recover(&self, message: &[u8], signature: &[u8]) -> Option<AccountId>;
}

/// Ed25519 recovery over a self-describing envelope:
/// `public_key (32 bytes) || signature (64 bytes)`.
///
/// Ed25519 has no public-key recovery, so the key travels with the
/// signature and is returned only if the signature verifies strictly.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Recovery;

impl SignerRecovery for Ed25519Recovery {
    fn recover(&self, message: &[u8], signature: &[u8]) -> Option<AccountId> {
        if signature.len() != constants::SIGNATURE_ENVELOPE_LEN {
            return None;
        }
        let (key_bytes, sig_bytes) = signature.split_at(32);
        let key: [u8; 32] = key_bytes.try_into().ok()?;
        let sig: [u8; 64] = sig_bytes.try_into().ok()?;

        let verifying_key = VerifyingKey::from_bytes(&key).ok()?;
        let sig = Signature::from_bytes(&sig);
        verifying_key.verify_strict(message, &sig).ok()?;
        Some(AccountId::from_pubkey(key))
    }
}

/// Sign a commitment and wrap the result in the envelope
/// [`Ed25519Recovery`] understands.
#[must_use]
pub fn sign_commitment(signing_key: &SigningKey, commitment: &Commitment) -> Vec<u8> {
    let sig = signing_key.sign(commitment.as_bytes());
    let mut envelope = Vec::with_capacity(constants::SIGNATURE_ENVELOPE_LEN);
    envelope.extend_from_slice(&signing_key.verifying_key().to_bytes());
    envelope.extend_from_slice(&sig.to_bytes());
    envelope
}

/// Checks reveals against stored commitments.
pub struct CommitmentVerifier<'a> {
    recovery: &'a dyn SignerRecovery,
}

impl<'a> CommitmentVerifier<'a> {
    #[must_use]
    pub fn new(recovery: &'a dyn SignerRecovery) -> Self {
        Self { recovery }
    }

    /// Verify a reveal of `bid` with `terms` by `revealer`.
    ///
    /// # Errors
    /// - `InvalidInput` if the bid is not a hidden sealed bid
    /// - `InvalidCommitment` on any hash or signature mismatch
    pub fn verify(
        &self,
        bid: &Bid,
        terms: &BidTerms,
        revealer: &AccountId,
        claimed: &Commitment,
    ) -> Result<()> {
        let Some(stored) = bid.commitment.as_ref() else {
            return Err(AuctionError::invalid(format!(
                "{} was placed without a commitment",
                bid.number
            )));
        };
        if bid.is_revealed() {
            return Err(AuctionError::invalid(format!(
                "{} is already revealed",
                bid.number
            )));
        }

        let reject = |reason: &str| -> Result<()> {
            tracing::warn!(bid = %bid.number, revealer = %revealer, reason, "Reveal rejected");
            Err(AuctionError::InvalidCommitment {
                bid: bid.number,
                reason: reason.to_string(),
            })
        };

        if claimed != stored {
            return reject("supplied commitment differs from the stored one");
        }
        if terms.commitment(revealer) != *stored {
            return reject("terms and revealer do not hash to the commitment");
        }
        match self.recovery.recover(stored.as_bytes(), &bid.signature) {
            Some(signer) if signer == bid.committer => Ok(()),
            Some(_) => reject("signature recovers to a different identity"),
            None => reject("signature does not verify"),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use sealbid_types::{AssetId, BidNumber, EpochId};

    use super::*;

    fn key(seed: u8) -> SigningKey {
        SigningKey::from_bytes(&[seed; 32])
    }

    fn account(key: &SigningKey) -> AccountId {
        AccountId::from_pubkey(key.verifying_key().to_bytes())
    }

    fn terms() -> BidTerms {
        BidTerms::new(AssetId::new("GOLD"), Decimal::new(12, 0), Decimal::new(50, 0))
    }

    fn sealed_bid(committer: &SigningKey, revealer: &AccountId) -> Bid {
        let commitment = terms().commitment(revealer);
        Bid {
            number: BidNumber(1),
            committer: account(committer),
            commitment: Some(commitment),
            signature: sign_commitment(committer, &commitment),
            terms: None,
            revealer: None,
            remaining_quantity: Decimal::ZERO,
            matched: false,
            epoch_id: EpochId(0),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn envelope_recovers_signer() {
        let k = key(7);
        let commitment = terms().commitment(&account(&k));
        let envelope = sign_commitment(&k, &commitment);
        assert_eq!(envelope.len(), constants::SIGNATURE_ENVELOPE_LEN);
        assert_eq!(
            Ed25519Recovery.recover(commitment.as_bytes(), &envelope),
            Some(account(&k))
        );
    }

    #[test]
    fn recovery_rejects_garbage() {
        let k = key(7);
        let commitment = terms().commitment(&account(&k));
        let mut envelope = sign_commitment(&k, &commitment);
        envelope[40] ^= 0xFF;
        assert_eq!(Ed25519Recovery.recover(commitment.as_bytes(), &envelope), None);
        assert_eq!(Ed25519Recovery.recover(commitment.as_bytes(), &[0u8; 10]), None);
    }

    #[test]
    fn honest_reveal_passes() {
        let k = key(1);
        let buyer = account(&k);
        let bid = sealed_bid(&k, &buyer);
        let verifier = CommitmentVerifier::new(&Ed25519Recovery);
        let stored = bid.commitment.unwrap();
        verifier.verify(&bid, &terms(), &buyer, &stored).unwrap();
    }

    #[test]
    fn delegated_revealer_named_in_commitment_passes() {
        let k = key(1);
        let relayer = account(&key(2));
        let bid = sealed_bid(&k, &relayer);
        let verifier = CommitmentVerifier::new(&Ed25519Recovery);
        let stored = bid.commitment.unwrap();
        verifier.verify(&bid, &terms(), &relayer, &stored).unwrap();
    }

    #[test]
    fn tampered_terms_fail() {
        let k = key(1);
        let buyer = account(&k);
        let bid = sealed_bid(&k, &buyer);
        let verifier = CommitmentVerifier::new(&Ed25519Recovery);
        let stored = bid.commitment.unwrap();

        let mut cheaper = terms();
        cheaper.price = Decimal::new(11, 0);
        let err = verifier.verify(&bid, &cheaper, &buyer, &stored).unwrap_err();
        assert!(matches!(err, AuctionError::InvalidCommitment { .. }));

        let mut more = terms();
        more.quantity = Decimal::new(51, 0);
        assert!(verifier.verify(&bid, &more, &buyer, &stored).is_err());

        let mut other = terms();
        other.asset = AssetId::new("SILVER");
        assert!(verifier.verify(&bid, &other, &buyer, &stored).is_err());
    }

    #[test]
    fn unnamed_revealer_fails() {
        let k = key(1);
        let buyer = account(&k);
        let bid = sealed_bid(&k, &buyer);
        let verifier = CommitmentVerifier::new(&Ed25519Recovery);
        let stored = bid.commitment.unwrap();
        let err = verifier
            .verify(&bid, &terms(), &account(&key(3)), &stored)
            .unwrap_err();
        assert!(matches!(err, AuctionError::InvalidCommitment { .. }));
    }

    #[test]
    fn mismatched_claimed_commitment_fails() {
        let k = key(1);
        let buyer = account(&k);
        let bid = sealed_bid(&k, &buyer);
        let verifier = CommitmentVerifier::new(&Ed25519Recovery);
        let err = verifier
            .verify(&bid, &terms(), &buyer, &Commitment([0; 32]))
            .unwrap_err();
        assert!(matches!(err, AuctionError::InvalidCommitment { .. }));
    }

    #[test]
    fn signature_by_someone_else_fails() {
        let k = key(1);
        let buyer = account(&k);
        let mut bid = sealed_bid(&k, &buyer);
        let commitment = bid.commitment.unwrap();
        bid.signature = sign_commitment(&key(9), &commitment);
        let verifier = CommitmentVerifier::new(&Ed25519Recovery);
        let err = verifier
            .verify(&bid, &terms(), &buyer, &commitment)
            .unwrap_err();
        assert!(matches!(err, AuctionError::InvalidCommitment { .. }));
    }

    #[test]
    fn plain_bid_is_not_revealable() {
        let verifier = CommitmentVerifier::new(&Ed25519Recovery);
        let buyer = AccountId([1; 32]);
        let bid = Bid {
            number: BidNumber(4),
            committer: buyer,
            commitment: None,
            signature: Vec::new(),
            terms: Some(terms()),
            revealer: Some(buyer),
            remaining_quantity: Decimal::new(50, 0),
            matched: false,
            epoch_id: EpochId(0),
            created_at: Utc::now(),
        };
        let err = verifier
            .verify(&bid, &terms(), &buyer, &Commitment([0; 32]))
            .unwrap_err();
        assert!(matches!(err, AuctionError::InvalidInput { .. }));
    }
}
