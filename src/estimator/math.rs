//! Swap and fee arithmetic
//!
//! Integer-only. Every multiplication is checked; a division never sees a
//! zero denominator because degenerate pools are reported first.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::error::ArbError;

/// Basis-point denominator (100% = 10_000)
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Half of `BPS_DENOMINATOR`, for half-up rounding
const HALF_BPS: u64 = 5_000;

/// Fee expressed as the fraction of input that is kept (997/1000 = 0.3% fee)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeeRatio {
    pub numerator: u32,
    pub denominator: u32,
}

impl FeeRatio {
    /// Uniswap V2 and its forks
    pub const UNISWAP_V2: FeeRatio = FeeRatio {
        numerator: 997,
        denominator: 1000,
    };

    pub fn new(numerator: u32, denominator: u32) -> Result<Self, ArbError> {
        let fee = Self {
            numerator,
            denominator,
        };
        fee.validate()?;
        Ok(fee)
    }

    /// 30 bps -> 9970/10000
    pub fn from_bps(fee_bps: u16) -> Result<Self, ArbError> {
        check_bps(fee_bps, "fee_bps")?;
        Ok(Self {
            numerator: (BPS_DENOMINATOR as u32) - u32::from(fee_bps),
            denominator: BPS_DENOMINATOR as u32,
        })
    }

    pub fn validate(&self) -> Result<(), ArbError> {
        if self.denominator == 0 {
            return Err(ArbError::validation("fee", "fee denominator is zero"));
        }
        if self.numerator > self.denominator {
            return Err(ArbError::validation(
                "fee",
                format!(
                    "fee numerator {} exceeds denominator {}",
                    self.numerator, self.denominator
                ),
            ));
        }
        Ok(())
    }
}

impl Default for FeeRatio {
    fn default() -> Self {
        FeeRatio::UNISWAP_V2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapMathError {
    /// A reserve (or the whole denominator) is zero
    DegeneratePool,
    Overflow,
}

pub fn check_bps(bps: u16, field: &str) -> Result<(), ArbError> {
    if u64::from(bps) > BPS_DENOMINATOR {
        return Err(ArbError::validation(
            field,
            format!("{} bps is more than 100%", bps),
        ));
    }
    Ok(())
}

/// Constant-product output:
/// `floor(amountIn * feeNum * reserveOut / (reserveIn * feeDenom + amountIn * feeNum))`
pub fn constant_product_out(
    amount_in: U256,
    reserve_in: U256,
    reserve_out: U256,
    fee: FeeRatio,
) -> Result<U256, SwapMathError> {
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(SwapMathError::DegeneratePool);
    }

    let fee_num = U256::from(fee.numerator);
    let fee_den = U256::from(fee.denominator);

    let amount_in_with_fee = amount_in
        .checked_mul(fee_num)
        .ok_or(SwapMathError::Overflow)?;
    let numerator = amount_in_with_fee
        .checked_mul(reserve_out)
        .ok_or(SwapMathError::Overflow)?;
    let denominator = reserve_in
        .checked_mul(fee_den)
        .and_then(|d| d.checked_add(amount_in_with_fee))
        .ok_or(SwapMathError::Overflow)?;

    if denominator.is_zero() {
        return Err(SwapMathError::DegeneratePool);
    }

    Ok(numerator / denominator)
}

/// Amount left after a flat basis-point fee; the fee itself rounds down.
pub fn deduct_bps(amount: U256, fee_bps: u16) -> Result<U256, SwapMathError> {
    let fee = amount
        .checked_mul(U256::from(fee_bps))
        .ok_or(SwapMathError::Overflow)?
        / U256::from(BPS_DENOMINATOR);
    // fee <= amount whenever fee_bps <= 10_000
    amount.checked_sub(fee).ok_or(SwapMathError::Overflow)
}

/// Aave-style premium: `percentMul`, rounding half up.
pub fn flash_loan_premium(amount: U256, premium_bps: u16) -> Result<U256, SwapMathError> {
    let scaled = amount
        .checked_mul(U256::from(premium_bps))
        .and_then(|v| v.checked_add(U256::from(HALF_BPS)))
        .ok_or(SwapMathError::Overflow)?;
    Ok(scaled / U256::from(BPS_DENOMINATOR))
}

/// Minimum acceptable output under a slippage tolerance, rounding down.
pub fn apply_slippage(amount: U256, slippage_bps: u16) -> Result<U256, SwapMathError> {
    let keep = BPS_DENOMINATOR.saturating_sub(u64::from(slippage_bps));
    let scaled = amount
        .checked_mul(U256::from(keep))
        .ok_or(SwapMathError::Overflow)?;
    Ok(scaled / U256::from(BPS_DENOMINATOR))
}
