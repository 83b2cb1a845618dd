//! Live market capture
//!
//! Walks a route once, reading exactly the data each leg needs. V3 quotes
//! depend on the amount reaching the leg, so the walk threads amounts with
//! the same `apply_leg` the estimator uses.

use alloy_primitives::{Address, U256};
use tracing::debug;

use super::ChainReader;
use crate::error::ArbError;
use crate::estimator::{apply_leg, ArbitrageRoute, LegKind, LegMarket, LegStep, MarketSnapshot};

/// Capture market data for `route` at the current block.
///
/// Stops after a degenerate pool or a zero output; the estimator stops at
/// the same leg, so the shorter snapshot is complete for it.
pub async fn capture_snapshot<R: ChainReader>(
    reader: &R,
    route: &ArbitrageRoute,
    quoter: Address,
) -> Result<MarketSnapshot, ArbError> {
    let block = reader.block_number().await?;
    let mut snapshot = MarketSnapshot::new(Some(block));
    let mut amount = route.flash_loan.amount.value();

    for (i, leg) in route.legs.iter().enumerate() {
        let market = match &leg.kind {
            LegKind::ConstantProduct { pool, .. } => {
                let state = reader.pair_state(*pool).await?;
                let (reserve_in, reserve_out) = state.oriented(leg.token_in, leg.token_out).ok_or_else(|| {
                    ArbError::config(format!(
                        "pair {:?} does not trade {:?} -> {:?}",
                        pool, leg.token_in, leg.token_out
                    ))
                })?;
                LegMarket::Reserves {
                    reserve_in,
                    reserve_out,
                }
            }

            LegKind::ConcentratedLiquidity { fee_tier, .. } => {
                // The quoter reverts on a zero input
                let amount_out = if amount.is_zero() {
                    U256::ZERO
                } else {
                    reader
                        .quote_exact_input_single(quoter, leg.token_in, leg.token_out, *fee_tier, amount)
                        .await?
                };
                LegMarket::Quote {
                    amount_in: amount,
                    amount_out,
                }
            }

            LegKind::Bond { .. } | LegKind::Debond { .. } => LegMarket::Wrap,
        };

        let step = apply_leg(i, leg, &market, amount)?;
        snapshot.push(market);

        match step {
            LegStep::Output(out) if !out.is_zero() => amount = out,
            _ => {
                debug!("{}: capture stopped at leg {}", route.name, i);
                break;
            }
        }
    }

    Ok(snapshot)
}
