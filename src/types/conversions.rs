use ethers::types::{Address, U256, U512};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Basis points in one whole (100%).
const BPS_DENOMINATOR: u64 = 10_000;
/// Largest scale a `Decimal` can carry.
const MAX_DECIMAL_SCALE: u32 = 28;

// Raw fixed-point amount -> human decimal
pub fn u256_to_decimal(value: U256, decimals: u8) -> Result<Decimal, ConversionError> {
    if decimals as u32 > MAX_DECIMAL_SCALE {
        return Err(ConversionError::Overflow);
    }
    let value_str = value.to_string();
    let decimal_value = Decimal::from_str(&value_str)
        .map_err(|e| ConversionError::InvalidDecimal(e.to_string()))?;

    let divisor = Decimal::from(10u128.pow(decimals as u32));
    Ok(decimal_value / divisor)
}

// Human decimal -> raw fixed-point amount, truncating digits beyond `decimals`
pub fn decimal_to_u256(value: Decimal, decimals: u8) -> Result<U256, ConversionError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ConversionError::Negative(value.to_string()));
    }
    if decimals as u32 > MAX_DECIMAL_SCALE {
        return Err(ConversionError::Overflow);
    }

    let mut scaled = value.round_dp_with_strategy(decimals as u32, RoundingStrategy::ToZero);
    scaled.rescale(decimals as u32);
    if scaled.scale() != decimals as u32 {
        return Err(ConversionError::Overflow);
    }
    let mantissa = u128::try_from(scaled.mantissa()).map_err(|_| ConversionError::Overflow)?;
    Ok(U256::from(mantissa))
}

pub fn string_to_address(s: &str) -> Result<Address, ConversionError> {
    Address::from_str(s.trim()).map_err(|e| ConversionError::InvalidAddress(e.to_string()))
}

/// Lowers `amount` by `slippage_pct` percent, rounding down.
///
/// Slippage is clamped to `[0, 100]`; it is expressed with two decimal places of precision
/// (0.01% granularity). The product is taken in 512 bits, so any `U256` amount is safe.
pub fn apply_slippage(amount: U256, slippage_pct: f64) -> U256 {
    let pct = if slippage_pct.is_finite() {
        slippage_pct.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let bps = (pct * 100.0).round() as u64;
    let scaled = amount.full_mul(U256::from(BPS_DENOMINATOR - bps)) / U512::from(BPS_DENOMINATOR);
    // never larger than `amount`
    U256::try_from(scaled).unwrap_or(amount)
}

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Invalid decimal: {0}")]
    InvalidDecimal(String),
    #[error("Negative amount: {0}")]
    Negative(String),
    #[error("Overflow in conversion")]
    Overflow,
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}
