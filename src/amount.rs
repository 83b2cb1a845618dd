//! Fixed-point token amounts
//!
//! An `AssetAmount` is always a base-unit integer tagged with the decimals it
//! was parsed at. Mixing a 6-decimal USDC amount into an 18-decimal leg is
//! caught by `ensure_decimals`, never silently rescaled.

use alloy_primitives::utils::{format_units, parse_units, ParseUnits};
use alloy_primitives::{I256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ArbError;

/// Largest decimals value a `U256` can represent (10^77 < 2^256)
const MAX_DECIMALS: u8 = 77;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetAmount {
    value: U256,
    decimals: u8,
}

impl AssetAmount {
    /// Wrap an amount that is already in base units
    pub fn from_base_units(value: U256, decimals: u8) -> Self {
        Self { value, decimals }
    }

    /// Parse a human decimal string ("1000", "0.25") at `decimals` precision
    pub fn parse(input: &str, decimals: u8) -> Result<Self, ArbError> {
        let trimmed = input.trim();

        if decimals > MAX_DECIMALS {
            return Err(ArbError::validation(
                "decimals",
                format!("{} decimals cannot be represented", decimals),
            ));
        }
        if trimmed.is_empty() {
            return Err(ArbError::validation("amount", "empty amount"));
        }
        if trimmed.starts_with('-') {
            return Err(ArbError::validation(
                "amount",
                format!("negative amount '{}'", trimmed),
            ));
        }

        let (integer, fraction) = match trimmed.split_once('.') {
            Some((integer, fraction)) => (integer, Some(fraction)),
            None => (trimmed, None),
        };

        let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(integer) || fraction.is_some_and(|f| !all_digits(f)) {
            return Err(ArbError::validation(
                "amount",
                format!("'{}' is not a decimal number", trimmed),
            ));
        }
        if let Some(fraction) = fraction {
            if fraction.len() > decimals as usize {
                return Err(ArbError::validation(
                    "amount",
                    format!(
                        "'{}' has {} fractional digits, token has {} decimals",
                        trimmed,
                        fraction.len(),
                        decimals
                    ),
                ));
            }
        }

        let parsed = parse_units(trimmed, decimals)
            .map_err(|e| ArbError::validation("amount", format!("'{}': {}", trimmed, e)))?;

        match parsed {
            ParseUnits::U256(value) => Ok(Self { value, decimals }),
            ParseUnits::I256(_) => Err(ArbError::validation(
                "amount",
                format!("negative amount '{}'", trimmed),
            )),
        }
    }

    pub fn value(&self) -> U256 {
        self.value
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Fails when this amount was parsed at a different precision than the
    /// token it is about to be used with.
    pub fn ensure_decimals(&self, expected: u8, what: &str) -> Result<(), ArbError> {
        if self.decimals != expected {
            return Err(ArbError::validation(
                what,
                format!(
                    "amount has {} decimals but the token has {}",
                    self.decimals, expected
                ),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for AssetAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match format_units(self.value, self.decimals) {
            Ok(formatted) if formatted.contains('.') => {
                let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
                write!(f, "{}", trimmed)
            }
            Ok(formatted) => write!(f, "{}", formatted),
            Err(_) => write!(f, "{} (base units)", self.value),
        }
    }
}

/// Human form of a signed base-unit amount, e.g. a loss of 949.24096 USDC
/// prints as `-949.24096`
pub fn format_signed(value: I256, decimals: u8) -> String {
    let magnitude = AssetAmount::from_base_units(value.unsigned_abs(), decimals);
    if value.is_negative() {
        format!("-{}", magnitude)
    } else {
        magnitude.to_string()
    }
}
