//! Route description: a flash loan wrapped around an ordered list of legs

use alloy_primitives::{Address, U256};
use serde::Serialize;
use std::fmt;

use super::math::{self, FeeRatio};
use crate::amount::AssetAmount;
use crate::error::ArbError;
use crate::registry::NetworkAddressSet;

/// Highest valid Uniswap V3 fee (100% in hundredths of a bip)
const MAX_FEE_TIER: u32 = 1_000_000;

/// How a single hop prices its output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LegKind {
    /// V2-style pool, priced from reserves
    ConstantProduct { pool: Address, fee: FeeRatio },

    /// V3-style pool, priced by the quoter; `fee_tier` is read from the pool
    ConcentratedLiquidity { pool: Address, fee_tier: u32 },

    /// Wrap the underlying into pod shares
    Bond { pod: Address, fee_bps: u16 },

    /// Unwrap pod shares back into the underlying
    Debond { pod: Address, fee_bps: u16 },
}

impl LegKind {
    /// Contract the leg talks to
    pub fn target(&self) -> Address {
        match self {
            LegKind::ConstantProduct { pool, .. } | LegKind::ConcentratedLiquidity { pool, .. } => *pool,
            LegKind::Bond { pod, .. } | LegKind::Debond { pod, .. } => *pod,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LegKind::ConstantProduct { .. } => "v2",
            LegKind::ConcentratedLiquidity { .. } => "v3",
            LegKind::Bond { .. } => "bond",
            LegKind::Debond { .. } => "debond",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapLeg {
    pub token_in: Address,
    pub token_out: Address,
    pub kind: LegKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlashLoan {
    /// Lending pool the loan is drawn from
    pub pool: Address,
    pub asset: Address,
    pub amount: AssetAmount,
    pub premium_bps: u16,
}

impl FlashLoan {
    pub fn premium(&self) -> Result<U256, ArbError> {
        math::flash_loan_premium(self.amount.value(), self.premium_bps)
            .map_err(|_| ArbError::validation("flash_loan.amount", "premium overflows"))
    }

    /// Principal plus premium
    pub fn repayment(&self) -> Result<U256, ArbError> {
        self.amount
            .value()
            .checked_add(self.premium()?)
            .ok_or_else(|| ArbError::validation("flash_loan.amount", "repayment overflows"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArbitrageRoute {
    pub name: String,
    pub flash_loan: FlashLoan,
    pub legs: Vec<SwapLeg>,
    /// Minimum net profit in base units of the loan asset
    pub min_profit: U256,
}

impl ArbitrageRoute {
    pub fn hop_count(&self) -> usize {
        self.legs.len()
    }

    /// Structural checks against the registry the route will run on.
    pub fn validate(&self, registry: &NetworkAddressSet) -> Result<(), ArbError> {
        let loan = &self.flash_loan;

        if self.legs.is_empty() {
            return Err(ArbError::validation("legs", format!("route '{}' has no legs", self.name)));
        }

        math::check_bps(loan.premium_bps, "flash_loan.premium_bps")?;

        let asset_decimals = registry.decimals_of(&loan.asset).ok_or_else(|| {
            ArbError::validation(
                "flash_loan.asset",
                format!("{:?} has no registered decimals on {}", loan.asset, registry.network()),
            )
        })?;
        loan.amount.ensure_decimals(asset_decimals, "flash_loan.amount")?;

        let first = &self.legs[0];
        if first.token_in != loan.asset {
            return Err(ArbError::validation(
                "legs[0].token_in",
                "route must start with the borrowed asset",
            ));
        }
        let last = &self.legs[self.legs.len() - 1];
        if last.token_out != loan.asset {
            return Err(ArbError::validation(
                format!("legs[{}].token_out", self.legs.len() - 1),
                "route must end in the borrowed asset",
            ));
        }

        for (i, leg) in self.legs.iter().enumerate() {
            if leg.token_in == leg.token_out {
                return Err(ArbError::validation(
                    format!("legs[{}]", i),
                    "token_in and token_out are the same",
                ));
            }
            for token in [leg.token_in, leg.token_out] {
                if registry.decimals_of(&token).is_none() {
                    return Err(ArbError::validation(
                        format!("legs[{}]", i),
                        format!("{:?} is not a registered token", token),
                    ));
                }
            }
            if let Some(next) = self.legs.get(i + 1) {
                if leg.token_out != next.token_in {
                    return Err(ArbError::validation(
                        format!("legs[{}].token_in", i + 1),
                        "does not match the previous leg's output token",
                    ));
                }
            }

            match &leg.kind {
                LegKind::ConstantProduct { fee, .. } => fee
                    .validate()
                    .map_err(|e| ArbError::validation(format!("legs[{}].fee", i), e.to_string()))?,
                LegKind::ConcentratedLiquidity { fee_tier, .. } => {
                    if *fee_tier >= MAX_FEE_TIER {
                        return Err(ArbError::validation(
                            format!("legs[{}].fee_tier", i),
                            format!("{} is not a valid fee tier", fee_tier),
                        ));
                    }
                }
                LegKind::Bond { fee_bps, .. } | LegKind::Debond { fee_bps, .. } => {
                    math::check_bps(*fee_bps, &format!("legs[{}].fee_bps", i))?
                }
            }
        }

        Ok(())
    }
}

impl fmt::Display for ArbitrageRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} hops", self.name, self.legs.len())?;
        for leg in &self.legs {
            write!(f, " {}", leg.kind.label())?;
        }
        write!(f, ")")
    }
}
