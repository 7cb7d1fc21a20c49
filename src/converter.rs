//! USD → crypto conversion.
//!
//! The smallest-unit amount is computed with integer arithmetic on `U256`:
//!
//! ```text
//! usd   = usd_mantissa   / 10^2
//! price = price_mantissa / 10^price_scale
//! wei   = round(usd / price * 10^18)
//!       = round(usd_mantissa * 10^(18 + price_scale) / (price_mantissa * 10^2))
//! ```
//!
//! Rounding is to nearest, ties away from zero. All inputs are non-negative
//! so that is the same as rounding half up. The major-unit amount is derived
//! from the rounded integer, so the two values never disagree.

use crate::error::SplitzyError;
use crate::models::{CryptoAmount, MonetaryAmount, SmallestUnitAmount, UnitPrice, SMALLEST_UNIT_DECIMALS};
use ethers::types::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    pub crypto: CryptoAmount,
    pub smallest_unit: SmallestUnitAmount,
}

pub fn convert(usd: MonetaryAmount, price: UnitPrice) -> Result<Conversion, SplitzyError> {
    let price = price.value();
    if price <= Decimal::ZERO {
        return Err(SplitzyError::InvalidPrice(format!("price must be positive, got {}", price)));
    }

    let usd = usd.value();
    let numerator = to_u256(usd.mantissa())?
        .checked_mul(U256::exp10((SMALLEST_UNIT_DECIMALS + price.scale()) as usize))
        .ok_or_else(|| overflow(price))?;
    let denominator = to_u256(price.mantissa())?
        .checked_mul(U256::exp10(usd.scale() as usize))
        .ok_or_else(|| overflow(price))?;

    let (quotient, remainder) = numerator.div_mod(denominator);
    let smallest = if remainder * 2 >= denominator {
        quotient + 1
    } else {
        quotient
    };

    let crypto = to_major_unit(smallest, usd, price)?;

    Ok(Conversion {
        crypto: CryptoAmount(crypto),
        smallest_unit: SmallestUnitAmount(smallest),
    })
}

/// Scales the wei amount back down by 10^18. Falls back to a direct
/// decimal division when the integer no longer fits a `Decimal` mantissa.
fn to_major_unit(smallest: U256, usd: Decimal, price: Decimal) -> Result<Decimal, SplitzyError> {
    let exact = u128::try_from(smallest)
        .ok()
        .and_then(|wei| i128::try_from(wei).ok())
        .and_then(|wei| Decimal::try_from_i128_with_scale(wei, SMALLEST_UNIT_DECIMALS).ok());

    match exact {
        Some(value) => Ok(value.normalize()),
        None => usd
            .checked_div(price)
            .map(|v| v.round_dp(SMALLEST_UNIT_DECIMALS))
            .ok_or_else(|| overflow(price)),
    }
}

fn to_u256(mantissa: i128) -> Result<U256, SplitzyError> {
    u128::try_from(mantissa)
        .map(U256::from)
        .map_err(|_| SplitzyError::InvalidPrice(format!("negative operand {}", mantissa)))
}

fn overflow(price: Decimal) -> SplitzyError {
    SplitzyError::InvalidPrice(format!("conversion overflow at price {}", price))
}
