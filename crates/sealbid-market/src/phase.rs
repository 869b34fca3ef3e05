//! Phase controller.
//!
//! Holds the current [`Phase`], when it was entered, and the epoch
//! counter. Time is passed in by the caller so the market's injected
//! [`Clock`](crate::Clock) drives every transition.
//!
//! ```text
//! DEPOSIT_WITHDRAW ──▶ OFFER ──▶ BID_OPENING ──▶ MATCHING ──┐
//!        ▲                                                  │
//!        └──────────────── epoch + 1 ───────────────────────┘
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use sealbid_types::{AccountId, AuctionError, EpochId, Phase, PhaseConfig, Result};

/// Gate for every phase-bound operation.
#[derive(Debug, Clone)]
pub struct PhaseController {
    current: Phase,
    entered_at: DateTime<Utc>,
    dwell: Duration,
    epoch: EpochId,
    admin: AccountId,
}

impl PhaseController {
    /// Start in DEPOSIT_WITHDRAW of epoch 1.
    #[must_use]
    pub fn new(config: &PhaseConfig, admin: AccountId, now: DateTime<Utc>) -> Self {
        Self {
            current: Phase::DepositWithdraw,
            entered_at: now,
            dwell: config.dwell,
            epoch: EpochId(1),
            admin,
        }
    }

    #[must_use]
    pub fn current(&self) -> Phase {
        self.current
    }

    #[must_use]
    pub fn epoch(&self) -> EpochId {
        self.epoch
    }

    #[must_use]
    pub fn entered_at(&self) -> DateTime<Utc> {
        self.entered_at
    }

    #[must_use]
    pub fn dwell(&self) -> Duration {
        self.dwell
    }

    /// Whether the dwell has run out. A clock that went backwards never
    /// satisfies it.
    #[must_use]
    pub fn dwell_elapsed(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.entered_at)
            .to_std()
            .is_ok_and(|elapsed| elapsed >= self.dwell)
    }

    /// Move to the next phase if the dwell has elapsed. Returns the new
    /// phase, or `None` when nothing changed.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Option<Phase> {
        if !self.dwell_elapsed(now) {
            return None;
        }
        let next = self.current.next();
        self.enter(next, now);
        Some(next)
    }

    /// Administrator override: jump to `phase` regardless of dwell.
    /// Returns the phase that was left.
    ///
    /// # Errors
    /// `Unauthorized` unless `caller` is the administrator.
    pub fn force(&mut self, caller: AccountId, phase: Phase, now: DateTime<Utc>) -> Result<Phase> {
        if caller != self.admin {
            return Err(AuctionError::unauthorized(format!(
                "{caller} may not set the phase"
            )));
        }
        let from = self.current;
        self.enter(phase, now);
        Ok(from)
    }

    /// Guard an operation that needs `expected`.
    ///
    /// # Errors
    /// [`AuctionError::WrongPhase`] in any other phase.
    pub fn require(&self, expected: Phase) -> Result<()> {
        if self.current == expected {
            Ok(())
        } else {
            Err(AuctionError::WrongPhase {
                expected,
                actual: self.current,
            })
        }
    }

    #[must_use]
    pub fn is_admin(&self, caller: AccountId) -> bool {
        caller == self.admin
    }

    fn enter(&mut self, phase: Phase, now: DateTime<Utc>) {
        if phase == Phase::DepositWithdraw && self.current != Phase::DepositWithdraw {
            self.epoch = self.epoch.next();
        }
        self.current = phase;
        self.entered_at = now;
    }
}
