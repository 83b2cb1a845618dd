//! Post-hoc verification: what the executor says it made vs. what we estimated

use alloy_primitives::{Address, Log, B256, I256, U256};
use alloy_sol_types::SolEvent;
use serde::Serialize;

use super::plan::ExecutionPlan;
use crate::contracts::IFlashArbExecutor;
use crate::error::{ArbError, RevertReason};

/// Outcome of a submitted transaction, as reported by the chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub success: bool,
    pub tx_hash: Option<B256>,
    pub block: Option<u64>,
    pub logs: Vec<Log>,
    pub revert: Option<RevertReason>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedExecution {
    pub tx_hash: Option<B256>,
    pub premium_paid: U256,
    pub realized_profit: U256,
    pub estimated_profit: I256,
    /// realized - estimated
    pub deviation: I256,
}

/// Read the executor's `ArbitrageExecuted` event out of `report`.
///
/// A reverted transaction, a missing event, or an event for a different
/// asset or amount is an external-call failure.
pub fn verify_execution(
    plan: &ExecutionPlan,
    executor: Address,
    report: &ExecutionReport,
) -> Result<VerifiedExecution, ArbError> {
    let context = format!("{} tx {:?}", plan.route, report.tx_hash.unwrap_or_default());

    if !report.success {
        return Err(ArbError::ExternalCall {
            context,
            message: "transaction reverted".to_string(),
            revert: report.revert.clone(),
        });
    }

    let event = report
        .logs
        .iter()
        .filter(|log| log.address == executor)
        .find_map(|log| IFlashArbExecutor::ArbitrageExecuted::decode_log_data(&log.data).ok())
        .ok_or_else(|| ArbError::external(context.clone(), "no ArbitrageExecuted event from the executor"))?;

    if event.asset != plan.asset || event.amount != plan.amount {
        return Err(ArbError::external(
            context,
            format!(
                "event reports {} of {:?}, plan borrowed {} of {:?}",
                event.amount, event.asset, plan.amount, plan.asset
            ),
        ));
    }

    let realized = I256::try_from(event.profit)
        .map_err(|_| ArbError::external(context.clone(), "realized profit out of range"))?;
    let deviation = realized
        .checked_sub(plan.estimated_profit)
        .ok_or_else(|| ArbError::external(context, "profit deviation overflows"))?;

    Ok(VerifiedExecution {
        tx_hash: report.tx_hash,
        premium_paid: event.premium,
        realized_profit: event.profit,
        estimated_profit: plan.estimated_profit,
        deviation,
    })
}
