//! System-wide constants for the Sealbid auction.

/// Maximum decimal precision for prices (8 decimal places).
pub const PRICE_PRECISION: u32 = 8;

/// Maximum decimal precision for quantities and amounts (8 decimal places).
pub const QTY_PRECISION: u32 = 8;

/// Largest single amount, price, or quantity accepted by any entry point.
pub const MAX_AMOUNT: rust_decimal::Decimal = rust_decimal::Decimal::from_parts(
    1_661_992_960,
    1_808_227_885,
    5,
    false,
    0,
); // 10^20

/// Minimum time a phase stays active before `advance` may move it (seconds).
pub const DEFAULT_PHASE_DWELL_SECS: u64 = 300;

/// Default number of bid/offer pairs one matching call may examine.
pub const DEFAULT_MAX_PAIRS_PER_SWEEP: usize = 10_000;

/// Size of the settlement idempotency cache (number of traded pairs remembered).
pub const SETTLEMENT_IDEMPOTENCY_CACHE_SIZE: usize = 500_000;

/// Symbol of the settlement medium when no configuration overrides it.
pub const DEFAULT_SETTLEMENT_ASSET: &str = "NATIVE";

/// Length of the signature envelope accepted by the ed25519 recovery:
/// 32-byte public key followed by a 64-byte signature.
pub const SIGNATURE_ENVELOPE_LEN: usize = 96;

/// Domain separator for bid commitments.
pub const COMMITMENT_DOMAIN: &[u8] = b"sealbid:bid:v1:";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Sealbid";
