//! One full auction cycle against in-memory vaults.
//!
//! ```text
//! sealbid-demo [config.json]
//! ```
//!
//! Prints every journal record as one JSON line on stdout. Logs go to
//! stderr; set `SEALBID_LOG_FORMAT=json` for structured logs.

use std::process::ExitCode;

use ed25519_dalek::SigningKey;
use rust_decimal::Decimal;
use sealbid_ingress::{MemoryVault, sign_commitment};
use sealbid_market::{LogFormat, ManualClock, Market, telemetry};
use sealbid_types::{
    AccountId, AssetId, AuctionError, BidTerms, BidVisibility, MarketConfig, Result,
};

fn main() -> ExitCode {
    let format = std::env::var("SEALBID_LOG_FORMAT")
        .ok()
        .and_then(|s| s.parse::<LogFormat>().ok())
        .unwrap_or_default();
    if let Err(err) = telemetry::init(format) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "Demo failed");
            ExitCode::FAILURE
        }
    }
}

fn account(key: &SigningKey) -> AccountId {
    AccountId::from_pubkey(key.verifying_key().to_bytes())
}

fn load_config(admin: AccountId) -> Result<MarketConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .map_err(|e| AuctionError::Configuration(format!("{path}: {e}")))?;
            MarketConfig::from_json_str(&json)
        }
        None => Ok(MarketConfig::new(admin)),
    }
}

fn run() -> Result<()> {
    let admin_key = SigningKey::from_bytes(&[1; 32]);
    let seller_key = SigningKey::from_bytes(&[2; 32]);
    let buyer_key = SigningKey::from_bytes(&[3; 32]);
    let (admin, seller, buyer) = (account(&admin_key), account(&seller_key), account(&buyer_key));

    let config = load_config(admin)?;
    let dwell = config.phase.dwell;
    let visibility = config.policy.bid_visibility;
    let settlement_asset = config.settlement_asset.clone();
    let gold = AssetId::new("GOLD");

    let cash = MemoryVault::new();
    let bullion = MemoryVault::new();
    cash.fund(buyer, Decimal::new(2000, 0));
    bullion.fund(seller, Decimal::new(100, 0));

    let clock = ManualClock::default();
    let mut market = Market::new(config, Box::new(cash.clone()), Box::new(clock.clone()))?;
    let config_admin = market.config().admin;
    market.register_asset(config_admin, gold.clone(), Box::new(bullion.clone()))?;

    let next_phase = |market: &mut Market| {
        clock.advance(dwell);
        market.advance_phase()
    };

    market.deposit_token(seller, &gold, Decimal::new(100, 0))?;
    market.deposit_settlement(buyer, Decimal::new(2000, 0))?;

    next_phase(&mut market);
    market.add_offer(seller, gold.clone(), Decimal::new(10, 0), Decimal::new(100, 0))?;

    next_phase(&mut market);
    let terms = BidTerms::new(gold.clone(), Decimal::new(12, 0), Decimal::new(50, 0));
    let sealed = match visibility {
        BidVisibility::Sealed => {
            let commitment = terms.commitment(&buyer);
            let signature = sign_commitment(&buyer_key, &commitment);
            Some((market.add_sealed_bid(buyer, commitment, signature)?, commitment))
        }
        BidVisibility::Plain => {
            market.add_bid(buyer, terms.clone())?;
            None
        }
    };

    next_phase(&mut market);
    if let Some((bid, commitment)) = sealed {
        market.reveal_bid(buyer, bid, terms, &commitment)?;
    }
    let report = market.run_matching(None)?;
    tracing::info!(
        trades = report.trades.len(),
        trade_root = hex::encode(report.trade_root),
        "Matching done"
    );

    for record in market.events() {
        println!("{}", serde_json::to_string(record)?);
    }
    for (name, who) in [("seller", seller), ("buyer", buyer)] {
        let snapshot = market.balance_of(who);
        tracing::info!(
            participant = name,
            settlement_asset = %settlement_asset,
            settlement = %snapshot.settlement.available,
            gold = %snapshot.token(&gold).total(),
            "Final balance"
        );
    }
    Ok(())
}
