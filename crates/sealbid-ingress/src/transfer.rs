//! External asset movement.
//!
//! Funds enter and leave the market through an [`AssetTransfer`]
//! capability, one per asset plus one for the settlement medium. The
//! capability is untrusted: it may decline, and the market must order its
//! own ledger effects around the call (credit after a successful inbound
//! transfer, debit before an outbound one).

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use rust_decimal::Decimal;
use sealbid_types::{AccountId, AssetId, AuctionError, Holding, Result, TransferDeclined};

/// Moves one asset between a participant and the market's custody.
pub trait AssetTransfer: Send {
    /// Pull `amount` from `from` into custody.
    fn transfer_in(&mut self, from: &AccountId, amount: Decimal)
        -> std::result::Result<(), TransferDeclined>;

    /// Push `amount` out of custody to `to`.
    fn transfer_out(&mut self, to: &AccountId, amount: Decimal)
        -> std::result::Result<(), TransferDeclined>;
}

/// Resolves a [`Holding`] to the capability that moves it.
pub struct AssetRegistry {
    settlement_asset: AssetId,
    settlement: Box<dyn AssetTransfer>,
    tokens: BTreeMap<AssetId, Box<dyn AssetTransfer>>,
}

impl AssetRegistry {
    #[must_use]
    pub fn new(settlement_asset: AssetId, settlement: Box<dyn AssetTransfer>) -> Self {
        Self {
            settlement_asset,
            settlement,
            tokens: BTreeMap::new(),
        }
    }

    /// Register the capability for a token.
    ///
    /// # Errors
    /// `InvalidInput` for an empty symbol, the settlement symbol, or an
    /// already registered token.
    pub fn register(&mut self, asset: AssetId, transfer: Box<dyn AssetTransfer>) -> Result<()> {
        if asset.is_empty() {
            return Err(AuctionError::invalid("asset symbol must not be empty"));
        }
        if asset == self.settlement_asset {
            return Err(AuctionError::invalid(format!(
                "{asset} is the settlement medium"
            )));
        }
        if self.tokens.contains_key(&asset) {
            return Err(AuctionError::invalid(format!("{asset} is already registered")));
        }
        tracing::info!(asset = %asset, "Asset registered");
        self.tokens.insert(asset, transfer);
        Ok(())
    }

    #[must_use]
    pub fn is_registered(&self, asset: &AssetId) -> bool {
        self.tokens.contains_key(asset)
    }

    #[must_use]
    pub fn settlement_asset(&self) -> &AssetId {
        &self.settlement_asset
    }

    /// Registered token symbols, sorted.
    #[must_use]
    pub fn assets(&self) -> Vec<AssetId> {
        self.tokens.keys().cloned().collect()
    }

    /// Pull funds in through the holding's capability.
    ///
    /// # Errors
    /// - `InvalidInput` if the token is not registered
    /// - `ExternalTransferFailed` if the capability declines
    pub fn transfer_in(
        &mut self,
        holding: &Holding,
        from: &AccountId,
        amount: Decimal,
    ) -> Result<()> {
        let (asset, transfer) = self.resolve(holding)?;
        transfer
            .transfer_in(from, amount)
            .map_err(|d| declined(asset, d))
    }

    /// Push funds out through the holding's capability.
    ///
    /// # Errors
    /// - `InvalidInput` if the token is not registered
    /// - `ExternalTransferFailed` if the capability declines
    pub fn transfer_out(
        &mut self,
        holding: &Holding,
        to: &AccountId,
        amount: Decimal,
    ) -> Result<()> {
        let (asset, transfer) = self.resolve(holding)?;
        transfer
            .transfer_out(to, amount)
            .map_err(|d| declined(asset, d))
    }

    fn resolve(&mut self, holding: &Holding) -> Result<(AssetId, &mut Box<dyn AssetTransfer>)> {
        match holding {
            Holding::Settlement => Ok((self.settlement_asset.clone(), &mut self.settlement)),
            Holding::Token(asset) => {
                let transfer = self
                    .tokens
                    .get_mut(asset)
                    .ok_or_else(|| AuctionError::invalid(format!("{asset} is not registered")))?;
                Ok((asset.clone(), transfer))
            }
        }
    }
}

impl std::fmt::Debug for AssetRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetRegistry")
            .field("settlement_asset", &self.settlement_asset)
            .field("tokens", &self.tokens.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn declined(asset: AssetId, d: TransferDeclined) -> AuctionError {
    tracing::warn!(asset = %asset, reason = %d.reason, "External transfer declined");
    AuctionError::ExternalTransferFailed {
        asset,
        reason: d.reason,
    }
}

// ---------------------------------------------------------------------------
// MemoryVault
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct VaultState {
    /// Funds participants hold outside the market.
    wallets: HashMap<AccountId, Decimal>,
    /// Funds in the market's custody.
    custody: Decimal,
    decline_in: bool,
    decline_out: bool,
}

/// In-memory transfer capability for demos and tests.
///
/// Clones share state, so a test can keep a handle after boxing one copy
/// into the registry.
#[derive(Debug, Clone, Default)]
pub struct MemoryVault {
    state: Arc<Mutex<VaultState>>,
}

impl MemoryVault {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Give a participant funds outside the market.
    pub fn fund(&self, account: AccountId, amount: Decimal) {
        *self.lock().wallets.entry(account).or_default() += amount;
    }

    /// A participant's funds outside the market.
    #[must_use]
    pub fn wallet(&self, account: &AccountId) -> Decimal {
        self.lock()
            .wallets
            .get(account)
            .copied()
            .unwrap_or_default()
    }

    /// Total held in the market's custody.
    #[must_use]
    pub fn custody(&self) -> Decimal {
        self.lock().custody
    }

    /// Make every inbound transfer fail until reset.
    pub fn decline_transfers_in(&self, decline: bool) {
        self.lock().decline_in = decline;
    }

    /// Make every outbound transfer fail until reset.
    pub fn decline_transfers_out(&self, decline: bool) {
        self.lock().decline_out = decline;
    }

    fn lock(&self) -> MutexGuard<'_, VaultState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AssetTransfer for MemoryVault {
    fn transfer_in(
        &mut self,
        from: &AccountId,
        amount: Decimal,
    ) -> std::result::Result<(), TransferDeclined> {
        let mut state = self.lock();
        if state.decline_in {
            return Err(TransferDeclined::new("inbound transfers disabled"));
        }
        let wallet = state.wallets.entry(*from).or_default();
        if *wallet < amount {
            return Err(TransferDeclined::new(format!(
                "wallet holds {wallet}, transfer needs {amount}"
            )));
        }
        *wallet -= amount;
        state.custody += amount;
        Ok(())
    }

    fn transfer_out(
        &mut self,
        to: &AccountId,
        amount: Decimal,
    ) -> std::result::Result<(), TransferDeclined> {
        let mut state = self.lock();
        if state.decline_out {
            return Err(TransferDeclined::new("outbound transfers disabled"));
        }
        if state.custody < amount {
            return Err(TransferDeclined::new("custody short"));
        }
        state.custody -= amount;
        *state.wallets.entry(*to).or_default() += amount;
        Ok(())
    }
}
