//! Decimal normalisation between human-entered amounts and token base units.
//!
//! Everything here is exact integer arithmetic on `U256`. Floating point only
//! appears in [`display_ratio`], which feeds quotes shown to the user and
//! never reaches a transaction.

use ethers::types::U256;
use ethers::utils::format_units;
use thiserror::Error;

/// Largest precision whose scale factor 10^d still fits a U256.
pub const MAX_DECIMALS: u8 = 77;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    #[error("invalid amount {0:?}")]
    InvalidAmount(String),
    #[error("unsupported precision: {0} decimals")]
    UnsupportedDecimals(u8),
    #[error("amount {0:?} does not fit in 256 bits")]
    Overflow(String),
}

/// Convert a human amount such as `"12.5"` into base units for a token with
/// `decimals` places. Fractional digits beyond the token precision are
/// truncated toward zero.
pub fn to_base_units(amount: &str, decimals: u8) -> Result<U256, UnitsError> {
    if decimals > MAX_DECIMALS {
        return Err(UnitsError::UnsupportedDecimals(decimals));
    }

    let (int_part, frac_part) = split_amount(amount, decimals)?;
    let overflow = || UnitsError::Overflow(amount.to_string());

    // from_dec_str fails past U256::MAX; the scaling below is checked too
    let whole = U256::from_dec_str(&int_part).map_err(|_| overflow())?;
    let scale = U256::exp10(decimals as usize);
    let fraction = if frac_part.is_empty() {
        U256::zero()
    } else {
        let padded = format!("{:0<width$}", frac_part, width = decimals as usize);
        U256::from_dec_str(&padded).map_err(|_| overflow())?
    };

    whole
        .checked_mul(scale)
        .and_then(|scaled| scaled.checked_add(fraction))
        .ok_or_else(overflow)
}

/// Render base units as a decimal string with exactly `decimals` fractional
/// digits. Base units are already integral at that precision, so this is the
/// round-down rendering.
pub fn to_decimal(amount: U256, decimals: u8) -> Result<String, UnitsError> {
    if decimals > MAX_DECIMALS {
        return Err(UnitsError::UnsupportedDecimals(decimals));
    }
    if decimals == 0 {
        return Ok(amount.to_string());
    }

    format_units(amount, decimals as u32).map_err(|_| UnitsError::UnsupportedDecimals(decimals))
}

/// Display-only price ratio `(numerator / 10^num_decimals) / (denominator / 10^den_decimals)`.
pub fn display_ratio(numerator: U256, num_decimals: u8, denominator: U256, den_decimals: u8) -> f64 {
    let num = to_f64(numerator, num_decimals);
    let den = to_f64(denominator, den_decimals);
    if den == 0.0 {
        return 0.0;
    }
    num / den
}

/// Lossy conversion for display purposes.
pub fn to_f64(amount: U256, decimals: u8) -> f64 {
    to_decimal(amount, decimals)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Validate the amount and split it into integer digits and a fraction cut
/// down to `decimals` digits.
fn split_amount(amount: &str, decimals: u8) -> Result<(String, String), UnitsError> {
    let trimmed = amount.trim().replace('_', "");
    let invalid = || UnitsError::InvalidAmount(amount.to_string());

    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((i, f)) => (i, f),
        None => (trimmed.as_str(), ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    if !int_part.chars().all(|c| c.is_ascii_digit()) || !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let int_part = if int_part.is_empty() { "0" } else { int_part };
    let keep = frac_part.len().min(decimals as usize);

    Ok((int_part.to_string(), frac_part[..keep].to_string()))
}
