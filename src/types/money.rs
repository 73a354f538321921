//! Fixed-point currency amounts
//!
//! Amounts are `rust_decimal::Decimal` values with exactly two fractional
//! digits. They are parsed from strings and never pass through binary floating
//! point, so balances do not drift across many transfers.

use std::str::FromStr;

use rust_decimal::Decimal;

use super::error::LedgerError;

/// Number of fractional digits carried by every amount and balance
pub const CURRENCY_SCALE: u32 = 2;

/// Bring an amount to the ledger's fixed scale
///
/// Trailing zeros are ignored (`10.500` is accepted as `10.50`), but an amount
/// with more than two significant fractional digits is rejected rather than
/// rounded.
pub fn normalize_amount(amount: Decimal) -> Result<Decimal, LedgerError> {
    let normalized = amount.normalize();
    if normalized.scale() > CURRENCY_SCALE {
        return Err(LedgerError::invalid_request(format!(
            "amount {} has more than {} fractional digits",
            amount, CURRENCY_SCALE
        )));
    }

    let mut scaled = normalized;
    scaled.rescale(CURRENCY_SCALE);
    Ok(scaled)
}

/// Parse a decimal string into a normalized amount
pub fn parse_amount(raw: &str) -> Result<Decimal, LedgerError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::invalid_request("amount is required"));
    }

    let amount = Decimal::from_str(trimmed)
        .map_err(|_| LedgerError::invalid_request(format!("invalid amount '{}'", trimmed)))?;
    normalize_amount(amount)
}
