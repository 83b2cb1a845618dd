//! Execution plan: what the deployed executor is asked to do
//!
//! Built from a priced route. Each step carries the estimated output and a
//! minimum output under the configured slippage tolerance; the executor
//! reverts if any step comes in under its minimum or the run as a whole does
//! not clear `min_profit`.

use alloy_primitives::aliases::U24;
use alloy_primitives::{Address, Bytes, I256, U256};
use alloy_sol_types::{SolCall, SolValue};
use serde::Serialize;

use crate::contracts::{IAavePool, IFlashArbExecutor, StepKind};
use crate::error::ArbError;
use crate::estimator::math::{self, BPS_DENOMINATOR};
use crate::estimator::{ArbitrageRoute, LegKind, ProfitabilityResult};
use crate::registry::Network;

/// Fees go on the wire in hundredths of a bip, the unit V3 pools use
const FEE_UNITS: u64 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedStep {
    pub kind: String,
    pub target: Address,
    pub token_in: Address,
    pub token_out: Address,
    /// Hundredths of a bip (3000 = 0.3%)
    pub fee: u32,
    pub expected_out: U256,
    pub min_out: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    pub route: String,
    pub network: Network,
    pub flash_pool: Address,
    pub asset: Address,
    pub amount: U256,
    pub premium: U256,
    pub steps: Vec<PlannedStep>,
    pub min_profit: U256,
    pub estimated_profit: I256,
    pub block: Option<u64>,
    pub slippage_bps: u16,
}

fn step_kind(kind: &LegKind) -> StepKind {
    match kind {
        LegKind::ConstantProduct { .. } => StepKind::UniswapV2,
        LegKind::ConcentratedLiquidity { .. } => StepKind::UniswapV3,
        LegKind::Bond { .. } => StepKind::PodBond,
        LegKind::Debond { .. } => StepKind::PodDebond,
    }
}

fn wire_fee(kind: &LegKind) -> u32 {
    match kind {
        LegKind::ConstantProduct { fee, .. } => {
            let kept = u64::from(fee.numerator) * FEE_UNITS / u64::from(fee.denominator.max(1));
            (FEE_UNITS - kept.min(FEE_UNITS)) as u32
        }
        LegKind::ConcentratedLiquidity { fee_tier, .. } => *fee_tier,
        LegKind::Bond { fee_bps, .. } | LegKind::Debond { fee_bps, .. } => {
            (u64::from(*fee_bps) * FEE_UNITS / BPS_DENOMINATOR) as u32
        }
    }
}

impl ExecutionPlan {
    /// Plan a route that was priced all the way through.
    pub fn build(
        network: Network,
        route: &ArbitrageRoute,
        result: &ProfitabilityResult,
        block: Option<u64>,
        slippage_bps: u16,
    ) -> Result<Self, ArbError> {
        math::check_bps(slippage_bps, "slippage_bps")?;

        if result.leg_outputs.len() != route.legs.len() {
            return Err(ArbError::validation(
                "result",
                format!(
                    "{} of {} legs priced, cannot plan a partial route",
                    result.leg_outputs.len(),
                    route.legs.len()
                ),
            ));
        }

        let steps = route
            .legs
            .iter()
            .zip(&result.leg_outputs)
            .enumerate()
            .map(|(i, (leg, expected_out))| {
                let min_out = math::apply_slippage(*expected_out, slippage_bps)
                    .map_err(|_| ArbError::validation(format!("legs[{}]", i), "min_out overflows"))?;
                Ok(PlannedStep {
                    kind: leg.kind.label().to_string(),
                    target: leg.kind.target(),
                    token_in: leg.token_in,
                    token_out: leg.token_out,
                    fee: wire_fee(&leg.kind),
                    expected_out: *expected_out,
                    min_out,
                })
            })
            .collect::<Result<Vec<_>, ArbError>>()?;

        Ok(Self {
            route: route.name.clone(),
            network,
            flash_pool: route.flash_loan.pool,
            asset: route.flash_loan.asset,
            amount: route.flash_loan.amount.value(),
            premium: route.flash_loan.premium()?,
            steps,
            min_profit: route.min_profit,
            estimated_profit: result.estimated_profit,
            block,
            slippage_bps,
        })
    }

    pub fn expected_output(&self) -> U256 {
        self.steps.last().map(|s| s.expected_out).unwrap_or_default()
    }

    fn executor_steps(&self, route: &ArbitrageRoute) -> Result<Vec<IFlashArbExecutor::Step>, ArbError> {
        route
            .legs
            .iter()
            .zip(&self.steps)
            .map(|(leg, step)| {
                let fee = U24::try_from(step.fee)
                    .map_err(|_| ArbError::validation("fee", format!("{} does not fit uint24", step.fee)))?;
                Ok(IFlashArbExecutor::Step {
                    kind: step_kind(&leg.kind) as u8,
                    target: step.target,
                    tokenIn: step.token_in,
                    tokenOut: step.token_out,
                    fee,
                    minAmountOut: step.min_out,
                })
            })
            .collect()
    }

    /// `params` handed through the flash loan to the executor:
    /// `abi.encode(Step[] steps, uint256 minProfit)`
    pub fn executor_params(&self, route: &ArbitrageRoute) -> Result<Bytes, ArbError> {
        if route.name != self.route || route.legs.len() != self.steps.len() {
            return Err(ArbError::validation(
                "plan",
                format!("plan for '{}' does not match route '{}'", self.route, route.name),
            ));
        }
        let steps = self.executor_steps(route)?;
        Ok(Bytes::from((steps, self.min_profit).abi_encode_params()))
    }

    /// Target and calldata of `flashLoanSimple(receiver, asset, amount, params, 0)`
    pub fn flash_loan_call(
        &self,
        route: &ArbitrageRoute,
        receiver: Address,
    ) -> Result<(Address, Bytes), ArbError> {
        let call = IAavePool::flashLoanSimpleCall {
            receiverAddress: receiver,
            asset: self.asset,
            amount: self.amount,
            params: self.executor_params(route)?,
            referralCode: 0,
        };
        Ok((self.flash_pool, Bytes::from(call.abi_encode())))
    }
}
