//! Smallest-unit amounts and unit-string conversion
//!
//! All ledger arithmetic is done on integer smallest units (`Amount`).
//! Human-readable strings such as `"1.1"` are converted with rust_decimal so
//! that no floating-point rounding ever reaches a balance.

use rust_decimal::Decimal;

use crate::errors::UnitsError;

/// Quantity of an asset in its smallest unit.
pub type Amount = u128;

/// Decimals of the platform's native currency.
pub const NATIVE_DECIMALS: u32 = 18;

/// Largest scale rust_decimal can represent.
const MAX_DECIMALS: u32 = 28;

/// Parse a decimal string into smallest units.
///
/// `parse_units("1.1", 18)` is `1_100_000_000_000_000_000`. Inputs with more
/// fractional digits than `decimals` are rejected rather than truncated.
pub fn parse_units(input: &str, decimals: u32) -> Result<Amount, UnitsError> {
    if decimals > MAX_DECIMALS {
        return Err(UnitsError::UnsupportedDecimals { decimals });
    }

    let trimmed = input.trim();
    let value = Decimal::from_str_exact(trimmed).map_err(|_| UnitsError::Malformed {
        input: trimmed.to_string(),
    })?;

    if value < Decimal::ZERO {
        return Err(UnitsError::Negative {
            input: trimmed.to_string(),
        });
    }

    let value = value.normalize();
    if value.scale() > decimals {
        return Err(UnitsError::TooPrecise {
            input: trimmed.to_string(),
            decimals,
        });
    }

    let out_of_range = || UnitsError::OutOfRange {
        input: trimmed.to_string(),
    };
    let mantissa = u128::try_from(value.mantissa()).map_err(|_| out_of_range())?;
    let factor = 10u128
        .checked_pow(decimals - value.scale())
        .ok_or_else(out_of_range)?;
    mantissa.checked_mul(factor).ok_or_else(out_of_range)
}

/// Render smallest units as a decimal string, trailing zeros trimmed.
pub fn format_units(amount: Amount, decimals: u32) -> String {
    if decimals == 0 {
        return amount.to_string();
    }

    let (whole, frac) = match 10u128.checked_pow(decimals) {
        Some(factor) => (amount / factor, amount % factor),
        None => (0, amount),
    };

    if frac == 0 {
        return whole.to_string();
    }

    let frac = format!("{:0width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// Parse a native-currency string (18 decimals).
pub fn parse_ether(input: &str) -> Result<Amount, UnitsError> {
    parse_units(input, NATIVE_DECIMALS)
}

/// Format a native-currency amount (18 decimals).
pub fn format_ether(amount: Amount) -> String {
    format_units(amount, NATIVE_DECIMALS)
}
