//! Profitability Estimator
//!
//! Folds a route left to right over a market snapshot:
//! loan amount -> leg 1 -> ... -> leg N -> minus (principal + premium).
//!
//! Pure: no I/O, no clock, no randomness. The same route and snapshot always
//! produce the same `ProfitabilityResult`.

use alloy_primitives::{I256, U256};
use serde::Serialize;
use tracing::trace;

use super::math::{self, SwapMathError};
use super::route::{ArbitrageRoute, LegKind, SwapLeg};
use super::snapshot::{LegMarket, MarketSnapshot};
use crate::error::ArbError;
use crate::registry::NetworkAddressSet;

/// Outcome of pricing a single leg
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegStep {
    Output(U256),
    /// Zero reserve on either side: no price exists
    Degenerate,
}

/// Why a route is or is not worth executing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Profitable,
    /// Ran to completion but the profit is negative or under the threshold
    BelowMinimum,
    DegeneratePool { leg: usize },
    ZeroOutput { leg: usize },
}

impl Verdict {
    pub fn describe(&self) -> String {
        match self {
            Verdict::Profitable => "profitable".to_string(),
            Verdict::BelowMinimum => "below minimum profit".to_string(),
            Verdict::DegeneratePool { leg } => format!("degenerate pool at leg {}", leg),
            Verdict::ZeroOutput { leg } => format!("zero output at leg {}", leg),
        }
    }
}

/// Estimation result.
///
/// `estimated_profit` is signed: a losing route reports exactly how much it
/// would lose (`estimated_output - repayment`). When the fold stops early
/// the output is zero and the profit is `-repayment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfitabilityResult {
    pub estimated_output: U256,
    pub repayment: U256,
    pub estimated_profit: I256,
    pub is_profitable: bool,
    pub verdict: Verdict,
    /// Output of every leg that was priced
    pub leg_outputs: Vec<U256>,
}

/// Price one leg for `amount_in`. Shared by the pure fold and the live
/// snapshot capture so both thread amounts the same way.
pub fn apply_leg(
    index: usize,
    leg: &SwapLeg,
    market: &LegMarket,
    amount_in: U256,
) -> Result<LegStep, ArbError> {
    match (&leg.kind, market) {
        (LegKind::ConstantProduct { fee, .. }, LegMarket::Reserves { reserve_in, reserve_out }) => {
            match math::constant_product_out(amount_in, *reserve_in, *reserve_out, *fee) {
                Ok(out) => Ok(LegStep::Output(out)),
                Err(SwapMathError::DegeneratePool) => Ok(LegStep::Degenerate),
                Err(SwapMathError::Overflow) => Err(ArbError::validation(
                    format!("legs[{}]", index),
                    "constant-product math overflows",
                )),
            }
        }

        (LegKind::ConcentratedLiquidity { .. }, LegMarket::Quote { amount_in: quoted_in, amount_out }) => {
            if *quoted_in != amount_in {
                return Err(ArbError::validation(
                    format!("legs[{}]", index),
                    format!("stale quote: quoted for {} but leg receives {}", quoted_in, amount_in),
                ));
            }
            Ok(LegStep::Output(*amount_out))
        }

        (LegKind::Bond { fee_bps, .. } | LegKind::Debond { fee_bps, .. }, LegMarket::Wrap) => {
            math::deduct_bps(amount_in, *fee_bps)
                .map(LegStep::Output)
                .map_err(|_| ArbError::validation(format!("legs[{}]", index), "wrap fee overflows"))
        }

        (kind, market) => Err(ArbError::validation(
            format!("legs[{}]", index),
            format!("{} leg cannot be priced from {} data", kind.label(), market.label()),
        )),
    }
}

fn signed(value: U256, field: &str) -> Result<I256, ArbError> {
    I256::try_from(value).map_err(|_| ArbError::validation(field, "does not fit a signed 256-bit value"))
}

pub struct ProfitEstimator<'a> {
    registry: &'a NetworkAddressSet,
}

impl<'a> ProfitEstimator<'a> {
    pub fn new(registry: &'a NetworkAddressSet) -> Self {
        Self { registry }
    }

    pub fn estimate(
        &self,
        route: &ArbitrageRoute,
        snapshot: &MarketSnapshot,
    ) -> Result<ProfitabilityResult, ArbError> {
        route.validate(self.registry)?;

        if snapshot.legs.len() > route.legs.len() {
            return Err(ArbError::validation(
                "snapshot",
                format!(
                    "{} market entries for a {}-leg route",
                    snapshot.legs.len(),
                    route.legs.len()
                ),
            ));
        }

        let repayment = route.flash_loan.repayment()?;
        let repayment_signed = signed(repayment, "repayment")?;
        let min_profit = signed(route.min_profit, "min_profit")?;

        let mut amount = route.flash_loan.amount.value();
        let mut leg_outputs = Vec::with_capacity(route.legs.len());

        for (i, leg) in route.legs.iter().enumerate() {
            let market = snapshot.legs.get(i).ok_or_else(|| {
                ArbError::validation("snapshot", format!("no market data for leg {}", i))
            })?;

            match apply_leg(i, leg, market, amount)? {
                LegStep::Degenerate => {
                    return Ok(Self::stopped(repayment, repayment_signed, leg_outputs, Verdict::DegeneratePool { leg: i }));
                }
                LegStep::Output(out) if out.is_zero() => {
                    leg_outputs.push(out);
                    return Ok(Self::stopped(repayment, repayment_signed, leg_outputs, Verdict::ZeroOutput { leg: i }));
                }
                LegStep::Output(out) => {
                    trace!("{} leg {} ({}): {} -> {}", route.name, i, leg.kind.label(), amount, out);
                    leg_outputs.push(out);
                    amount = out;
                }
            }
        }

        let output_signed = signed(amount, "estimated_output")?;
        let profit = output_signed
            .checked_sub(repayment_signed)
            .ok_or_else(|| ArbError::validation("estimated_profit", "overflow"))?;

        let is_profitable = profit > I256::ZERO && profit >= min_profit;

        Ok(ProfitabilityResult {
            estimated_output: amount,
            repayment,
            estimated_profit: profit,
            is_profitable,
            verdict: if is_profitable {
                Verdict::Profitable
            } else {
                Verdict::BelowMinimum
            },
            leg_outputs,
        })
    }

    fn stopped(
        repayment: U256,
        repayment_signed: I256,
        leg_outputs: Vec<U256>,
        verdict: Verdict,
    ) -> ProfitabilityResult {
        ProfitabilityResult {
            estimated_output: U256::ZERO,
            repayment,
            estimated_profit: I256::ZERO - repayment_signed,
            is_profitable: false,
            verdict,
            leg_outputs,
        }
    }
}
