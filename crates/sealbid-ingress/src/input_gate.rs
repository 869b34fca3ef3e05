//! Input gate: hard validation of every amount, price, and asset before it
//! reaches the ledger or the book.
//!
//! Fail-closed: anything the gate cannot vouch for is rejected with
//! `InvalidInput` and the calling operation aborts before any mutation.

use rust_decimal::Decimal;
use sealbid_types::{AssetId, AuctionError, BidTerms, MarketConfig, Result, constants};

/// Stateless validator parameterised by the market's precisions.
#[derive(Debug, Clone, Copy)]
pub struct InputGate {
    price_precision: u32,
    quantity_precision: u32,
}

impl InputGate {
    #[must_use]
    pub fn new(price_precision: u32, quantity_precision: u32) -> Self {
        Self {
            price_precision,
            quantity_precision,
        }
    }

    #[must_use]
    pub fn from_config(config: &MarketConfig) -> Self {
        Self::new(config.price_precision, config.quantity_precision)
    }

    /// A deposit or order quantity.
    ///
    /// # Errors
    /// `InvalidInput` if not positive, above `MAX_AMOUNT`, or too precise.
    pub fn quantity(&self, amount: Decimal) -> Result<Decimal> {
        check("amount", amount, self.quantity_precision)
    }

    /// A withdrawal amount. Settled balances carry `price × quantity`
    /// precision, so the limit is the sum of both scales.
    ///
    /// # Errors
    /// `InvalidInput` if not positive, above `MAX_AMOUNT`, or finer than any
    /// balance settlement can produce.
    pub fn withdrawal(&self, amount: Decimal) -> Result<Decimal> {
        let scale = (self.price_precision + self.quantity_precision).min(MAX_SCALE);
        check("amount", amount, scale)
    }

    /// A unit price.
    ///
    /// # Errors
    /// `InvalidInput` if not positive, above `MAX_AMOUNT`, or too precise.
    pub fn price(&self, price: Decimal) -> Result<Decimal> {
        check("price", price, self.price_precision)
    }

    /// # Errors
    /// `InvalidInput` for the empty symbol.
    pub fn asset(&self, asset: &AssetId) -> Result<()> {
        if asset.is_empty() {
            return Err(AuctionError::invalid("asset symbol must not be empty"));
        }
        Ok(())
    }

    /// Validate bid terms and return their notional `price × quantity`.
    ///
    /// # Errors
    /// `InvalidInput` for any bad field or a notional that overflows.
    pub fn terms(&self, terms: &BidTerms) -> Result<Decimal> {
        self.asset(&terms.asset)?;
        self.price(terms.price)?;
        self.quantity(terms.quantity)?;
        terms
            .notional()
            .ok_or_else(|| AuctionError::invalid("price × quantity overflows"))
    }
}

const MAX_SCALE: u32 = 28;

fn check(what: &str, value: Decimal, precision: u32) -> Result<Decimal> {
    if value <= Decimal::ZERO {
        return Err(AuctionError::invalid(format!("{what} must be positive, got {value}")));
    }
    if value > constants::MAX_AMOUNT {
        return Err(AuctionError::invalid(format!(
            "{what} {value} exceeds maximum {}",
            constants::MAX_AMOUNT
        )));
    }
    if value.normalize().scale() > precision {
        return Err(AuctionError::invalid(format!(
            "{what} {value} has more than {precision} decimal places"
        )));
    }
    Ok(value)
}
