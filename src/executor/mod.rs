//! The Executor
//!
//! Takes a priced route and, depending on the execution mode:
//! - SIMULATION: logs the opportunity (and appends it to the opportunity log)
//! - DRY_RUN: builds the flash-loan transaction and `eth_call`s it
//! - PRODUCTION: submits through the single-writer lane and verifies the
//!   realized profit from the receipt logs
//!
//! ⚠️  WARNING: PRODUCTION mode interacts with real funds!

mod plan;
mod submitter;
mod verify;

pub use plan::{ExecutionPlan, PlannedStep};
pub use submitter::{MinedTx, RpcTxBackend, TxBackend, TxSubmitter};
pub use verify::{verify_execution, ExecutionReport, VerifiedExecution};

use alloy_primitives::{Address, B256};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::amount::{format_signed, AssetAmount};
use crate::config::{Config, ExecutionMode, OpportunityLog};
use crate::error::{ArbError, RevertReason};
use crate::estimator::{ArbitrageRoute, MarketSnapshot, ProfitabilityResult};
use crate::registry::NetworkAddressSet;

/// The main execution engine
pub struct ExecutionEngine<'a> {
    config: Config,
    registry: &'a NetworkAddressSet,
    submitter: Option<TxSubmitter>,
}

impl<'a> ExecutionEngine<'a> {
    pub fn new(config: Config, registry: &'a NetworkAddressSet, submitter: Option<TxSubmitter>) -> Self {
        Self {
            config,
            registry,
            submitter,
        }
    }

    /// Signer and executor contract are both in place
    pub fn can_send(&self) -> bool {
        self.submitter.is_some() && self.config.executor_contract_address.is_some()
    }

    fn sender(&self) -> Result<(&TxSubmitter, Address), ArbError> {
        match (&self.submitter, self.config.executor_contract_address) {
            (Some(submitter), Some(executor)) => Ok((submitter, executor)),
            _ => Err(ArbError::config(format!(
                "{} mode requires PRIVATE_KEY and EXECUTOR_CONTRACT_ADDRESS",
                self.config.execution_mode
            ))),
        }
    }

    /// Act on one estimate
    pub async fn execute(
        &self,
        route: &ArbitrageRoute,
        result: &ProfitabilityResult,
        snapshot: &MarketSnapshot,
    ) -> Result<ExecutionResult, ArbError> {
        // Safety checks
        if self.config.emergency_stop {
            return Ok(ExecutionResult::Aborted {
                reason: "Emergency stop is active".to_string(),
            });
        }

        if !result.is_profitable {
            return Ok(ExecutionResult::Skipped {
                reason: result.verdict.describe(),
            });
        }

        let plan = ExecutionPlan::build(
            self.registry.network(),
            route,
            result,
            snapshot.block,
            self.config.slippage_bps,
        )?;

        match self.config.execution_mode {
            ExecutionMode::Simulation => {
                info!("📋 SIMULATION MODE: Would execute {}", route);
                for (i, step) in plan.steps.iter().enumerate() {
                    info!(
                        "   {}. {} {:?}: expect {} (min {})",
                        i + 1,
                        step.kind,
                        step.target,
                        step.expected_out,
                        step.min_out
                    );
                }

                if self.config.simulation_log {
                    self.log_opportunity(route, result, snapshot)?;
                }

                Ok(ExecutionResult::Simulated { plan })
            }

            ExecutionMode::DryRun => {
                let (submitter, executor) = self.sender()?;
                let (to, calldata) = plan.flash_loan_call(route, executor)?;

                info!("🔬 DRY RUN MODE: eth_call {} from {:?}", route.name, submitter.from_address());

                match submitter.dry_run(to, calldata).await {
                    Ok(_) => {
                        info!("✅ Dry run passed for {}", route.name);
                        Ok(ExecutionResult::DryRun {
                            passed: true,
                            revert: None,
                        })
                    }
                    Err(e) => match e.revert_reason() {
                        Some(reason) => {
                            warn!("❌ Dry run reverted for {}: {}", route.name, reason);
                            Ok(ExecutionResult::DryRun {
                                passed: false,
                                revert: Some(reason.clone()),
                            })
                        }
                        None => Err(e),
                    },
                }
            }

            ExecutionMode::Production => {
                let (submitter, executor) = self.sender()?;
                let (to, calldata) = plan.flash_loan_call(route, executor)?;

                info!("🚀 PRODUCTION MODE: Executing {}", route);
                warn!("⚠️  This will use real funds!");

                let report = submitter.submit(to, calldata).await?;

                if !report.success {
                    error!(
                        "Transaction {:?} reverted: {}",
                        report.tx_hash,
                        report
                            .revert
                            .as_ref()
                            .map(|r| r.to_string())
                            .unwrap_or_else(|| "unknown reason".to_string())
                    );
                    return Ok(ExecutionResult::Reverted {
                        tx_hash: report.tx_hash,
                        revert: report.revert,
                    });
                }

                let verified = verify_execution(&plan, executor, &report)?;
                let decimals = route.flash_loan.amount.decimals();
                info!(
                    "💰 {} confirmed: realized {} vs estimated {} (deviation {})",
                    route.name,
                    AssetAmount::from_base_units(verified.realized_profit, decimals),
                    format_signed(verified.estimated_profit, decimals),
                    format_signed(verified.deviation, decimals)
                );

                Ok(ExecutionResult::Confirmed(verified))
            }
        }
    }

    /// Log a profitable opportunity to file
    fn log_opportunity(
        &self,
        route: &ArbitrageRoute,
        result: &ProfitabilityResult,
        snapshot: &MarketSnapshot,
    ) -> Result<(), ArbError> {
        let loan = &route.flash_loan;
        let decimals = loan.amount.decimals();

        let leg_outputs = route
            .legs
            .iter()
            .zip(&result.leg_outputs)
            .map(|(leg, out)| match self.registry.decimals_of(&leg.token_out) {
                Some(d) => AssetAmount::from_base_units(*out, d).to_string(),
                None => out.to_string(),
            })
            .collect();

        let record = OpportunityLog {
            timestamp: Utc::now(),
            network: self.registry.network(),
            route: route.name.clone(),
            block_number: snapshot.block,
            loan_asset: self
                .registry
                .name_of(&loan.asset)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{:?}", loan.asset)),
            loan_amount: loan.amount.to_string(),
            estimated_output: AssetAmount::from_base_units(result.estimated_output, decimals).to_string(),
            estimated_profit: format_signed(result.estimated_profit, decimals),
            leg_outputs,
        };

        record.append_to_file(&self.config.simulation_log_path)?;

        info!("📝 Logged opportunity to {}", self.config.simulation_log_path);

        Ok(())
    }
}

/// Result of an execution attempt
#[derive(Debug)]
pub enum ExecutionResult {
    /// Planned and logged (simulation mode)
    Simulated { plan: ExecutionPlan },

    /// `eth_call` outcome (dry-run mode)
    DryRun {
        passed: bool,
        revert: Option<RevertReason>,
    },

    /// Mined and verified from the receipt logs
    Confirmed(VerifiedExecution),

    /// Mined but reverted
    Reverted {
        tx_hash: Option<B256>,
        revert: Option<RevertReason>,
    },

    /// Skipped (not profitable)
    Skipped { reason: String },

    /// Aborted (safety switch)
    Aborted { reason: String },
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ExecutionResult::Simulated { .. }
                | ExecutionResult::DryRun { passed: true, .. }
                | ExecutionResult::Confirmed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::{FeeRatio, FlashLoan, LegKind, LegMarket, ProfitEstimator, SwapLeg};
    use crate::registry::Network;
    use alloy_primitives::{address, U256};

    const E18: u128 = 1_000_000_000_000_000_000;

    fn u(v: u128) -> U256 {
        U256::from(v)
    }

    /// USDC -> WETH -> USDC across two V2 pairs priced apart
    fn priced(registry: &NetworkAddressSet, back_reserve_usdc: u128) -> (ArbitrageRoute, MarketSnapshot, ProfitabilityResult) {
        let (usdc, decimals) = registry.token("USDC").unwrap();
        let weth = registry.address("WETH").unwrap();

        let route = ArbitrageRoute {
            name: "usdc-weth-cross".to_string(),
            flash_loan: FlashLoan {
                pool: registry.flash_loan_pool().unwrap(),
                asset: usdc,
                amount: AssetAmount::parse("10000", decimals).unwrap(),
                premium_bps: 5,
            },
            legs: vec![
                SwapLeg {
                    token_in: usdc,
                    token_out: weth,
                    kind: LegKind::ConstantProduct {
                        pool: address!("00000000000000000000000000000000000000a1"),
                        fee: FeeRatio::UNISWAP_V2,
                    },
                },
                SwapLeg {
                    token_in: weth,
                    token_out: usdc,
                    kind: LegKind::ConstantProduct {
                        pool: address!("00000000000000000000000000000000000000a2"),
                        fee: FeeRatio::UNISWAP_V2,
                    },
                },
            ],
            min_profit: U256::ZERO,
        };

        let snapshot = MarketSnapshot {
            block: Some(19_000_000),
            legs: vec![
                LegMarket::Reserves {
                    reserve_in: u(5_000_000_000_000),
                    reserve_out: u(2_000 * E18),
                },
                LegMarket::Reserves {
                    reserve_in: u(1_000 * E18),
                    reserve_out: u(back_reserve_usdc),
                },
            ],
        };

        let result = ProfitEstimator::new(registry).estimate(&route, &snapshot).unwrap();
        (route, snapshot, result)
    }

    fn log_path(tag: &str) -> String {
        std::env::temp_dir()
            .join(format!("podarb-engine-{}-{}", tag, std::process::id()))
            .join("opportunities.jsonl")
            .to_string_lossy()
            .into_owned()
    }

    #[tokio::test]
    async fn test_simulation_logs_profitable_route() {
        let registry = NetworkAddressSet::builtin(Network::Mainnet);
        let (route, snapshot, result) = priced(&registry, 3_000_000_000_000);
        assert!(result.is_profitable);

        let path = log_path("sim");
        let config = Config {
            simulation_log_path: path.clone(),
            ..Config::default()
        };
        let engine = ExecutionEngine::new(config, &registry, None);

        let outcome = engine.execute(&route, &result, &snapshot).await.unwrap();
        assert!(outcome.is_success());
        match outcome {
            ExecutionResult::Simulated { plan } => assert_eq!(plan.steps.len(), 2),
            other => panic!("unexpected {:?}", other),
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("usdc-weth-cross"));
        assert!(content.contains("\"loan_asset\":\"USDC\""));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_unprofitable_route_skipped() {
        let registry = NetworkAddressSet::builtin(Network::Mainnet);
        let (route, snapshot, result) = priced(&registry, 2_000_000_000_000);
        assert!(!result.is_profitable);

        let config = Config {
            simulation_log: false,
            ..Config::default()
        };
        let engine = ExecutionEngine::new(config, &registry, None);
        let outcome = engine.execute(&route, &result, &snapshot).await.unwrap();
        assert!(matches!(outcome, ExecutionResult::Skipped { .. }));
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn test_emergency_stop_aborts() {
        let registry = NetworkAddressSet::builtin(Network::Mainnet);
        let (route, snapshot, result) = priced(&registry, 3_000_000_000_000);

        let config = Config {
            emergency_stop: true,
            simulation_log: false,
            ..Config::default()
        };
        let engine = ExecutionEngine::new(config, &registry, None);
        let outcome = engine.execute(&route, &result, &snapshot).await.unwrap();
        assert!(matches!(outcome, ExecutionResult::Aborted { .. }));
    }

    #[tokio::test]
    async fn test_sending_modes_need_signer() {
        let registry = NetworkAddressSet::builtin(Network::Mainnet);
        let (route, snapshot, result) = priced(&registry, 3_000_000_000_000);

        for mode in [ExecutionMode::DryRun, ExecutionMode::Production] {
            let config = Config {
                execution_mode: mode,
                executor_contract_address: Some(Address::repeat_byte(0x11)),
                ..Config::default()
            };
            let engine = ExecutionEngine::new(config, &registry, None);
            assert!(!engine.can_send());
            let err = engine.execute(&route, &result, &snapshot).await.unwrap_err();
            assert!(err.is_configuration());
        }
    }
}
