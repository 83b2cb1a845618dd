//! Monitor loop
//!
//! Sequential check-then-maybe-execute cycles. One cycle walks every route:
//! capture snapshot -> estimate -> hand to the execution engine. Cycles never
//! overlap; Ctrl-C is honoured between cycles, so an in-flight cycle always
//! finishes.

use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::amount::format_signed;
use crate::chain::{capture_snapshot, ChainReader};
use crate::config::Config;
use crate::error::ArbError;
use crate::estimator::{ArbitrageRoute, ProfitEstimator};
use crate::executor::{ExecutionEngine, ExecutionResult};
use crate::registry::NetworkAddressSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub scan_interval: Duration,
    pub max_consecutive_failures: u32,
    pub failure_pause: Duration,
    pub run_once: bool,
}

impl MonitorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            scan_interval: Duration::from_secs(config.scan_interval_secs),
            max_consecutive_failures: config.max_consecutive_failures,
            failure_pause: Duration::from_secs(config.failure_pause_secs),
            run_once: config.run_once,
        }
    }
}

/// Counters for one cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub checked: usize,
    pub profitable: usize,
    /// Planned and logged only (simulation mode)
    pub simulated: usize,
    /// Dry run passed or transaction confirmed
    pub executed: usize,
    pub invalid: usize,
    pub failures: usize,
}

impl CycleSummary {
    /// Something went wrong and nothing was checked
    pub fn failed(&self) -> bool {
        self.failures > 0 && self.checked == 0
    }
}

/// Totals over the whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorStats {
    pub cycles: u64,
    pub checked: u64,
    pub profitable: u64,
    pub simulated: u64,
    pub executed: u64,
    pub failures: u64,
    pub pauses: u64,
}

impl MonitorStats {
    fn absorb(&mut self, summary: &CycleSummary) {
        self.cycles += 1;
        self.checked += summary.checked as u64;
        self.profitable += summary.profitable as u64;
        self.simulated += summary.simulated as u64;
        self.executed += summary.executed as u64;
        self.failures += summary.failures as u64;
    }
}

/// Receiver that flips to `true` on Ctrl-C
pub fn shutdown_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("🛑 Interrupt received, finishing the current cycle");
            let _ = tx.send(true);
        }
    });
    rx
}

pub struct Monitor<'a, R: ChainReader> {
    reader: &'a R,
    registry: &'a NetworkAddressSet,
    routes: Vec<ArbitrageRoute>,
    engine: ExecutionEngine<'a>,
    settings: MonitorSettings,
}

enum RouteOutcome {
    NotProfitable,
    Profitable(ExecutionResult),
}

impl<'a, R: ChainReader> Monitor<'a, R> {
    pub fn new(
        reader: &'a R,
        registry: &'a NetworkAddressSet,
        routes: Vec<ArbitrageRoute>,
        engine: ExecutionEngine<'a>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            reader,
            registry,
            routes,
            engine,
            settings,
        }
    }

    async fn check_route(&self, route: &ArbitrageRoute) -> Result<RouteOutcome, ArbError> {
        let quoter = self.registry.quoter()?;
        let snapshot = capture_snapshot(self.reader, route, quoter).await?;
        let result = ProfitEstimator::new(self.registry).estimate(route, &snapshot)?;
        let decimals = route.flash_loan.amount.decimals();

        if !result.is_profitable {
            info!(
                "{}: not profitable ({}), profit {}",
                route.name,
                result.verdict.describe(),
                format_signed(result.estimated_profit, decimals)
            );
            return Ok(RouteOutcome::NotProfitable);
        }

        info!(
            "🎯 {}: profitable, estimated profit {} at block {:?}",
            route.name,
            format_signed(result.estimated_profit, decimals),
            snapshot.block
        );

        let outcome = self.engine.execute(route, &result, &snapshot).await?;
        debug!("{}: {:?}", route.name, outcome);

        Ok(RouteOutcome::Profitable(outcome))
    }

    /// One pass over every route. Configuration errors end the run; other
    /// errors are counted and the next route is tried.
    pub async fn run_cycle(&self) -> Result<CycleSummary, ArbError> {
        let mut summary = CycleSummary::default();

        for route in &self.routes {
            match self.check_route(route).await {
                Ok(RouteOutcome::NotProfitable) => summary.checked += 1,
                Ok(RouteOutcome::Profitable(outcome)) => {
                    summary.checked += 1;
                    summary.profitable += 1;
                    match outcome {
                        ExecutionResult::Simulated { .. } => summary.simulated += 1,
                        ExecutionResult::DryRun { passed: true, .. } | ExecutionResult::Confirmed(_) => {
                            summary.executed += 1
                        }
                        _ => {}
                    }
                }
                Err(e) if e.is_configuration() => {
                    error!("{}: {}", route.name, e);
                    return Err(e);
                }
                Err(e) if e.is_validation() => {
                    warn!("{}: skipped, {}", route.name, e);
                    summary.invalid += 1;
                }
                Err(e) => {
                    error!("{}: {}", route.name, e);
                    summary.failures += 1;
                }
            }
        }

        Ok(summary)
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<MonitorStats, ArbError> {
        let mut stats = MonitorStats::default();
        let mut consecutive_failures: u32 = 0;

        info!(
            "Monitoring {} route(s) every {:?}",
            self.routes.len(),
            self.settings.scan_interval
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let started = Instant::now();
            let summary = self.run_cycle().await?;
            stats.absorb(&summary);

            info!(
                "Cycle {} done in {:?}: {} checked, {} profitable, {} simulated, {} executed, {} invalid, {} failed",
                stats.cycles,
                started.elapsed(),
                summary.checked,
                summary.profitable,
                summary.simulated,
                summary.executed,
                summary.invalid,
                summary.failures
            );

            if summary.failed() {
                consecutive_failures += 1;
            } else {
                consecutive_failures = 0;
            }

            if self.settings.run_once {
                break;
            }

            let wait = if consecutive_failures > 0
                && consecutive_failures >= self.settings.max_consecutive_failures
            {
                warn!(
                    "{} consecutive failing cycles, pausing for {:?}",
                    consecutive_failures, self.settings.failure_pause
                );
                consecutive_failures = 0;
                stats.pauses += 1;
                self.settings.failure_pause
            } else {
                self.settings.scan_interval
            };

            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }

        info!(
            "Monitor stopped after {} cycle(s): {} profitable, {} simulated, {} executed, {} failures",
            stats.cycles, stats.profitable, stats.simulated, stats.executed, stats.failures
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::AssetAmount;
    use crate::chain::stub::StubChain;
    use crate::chain::PairState;
    use crate::estimator::{FeeRatio, FlashLoan, LegKind, SwapLeg};
    use crate::registry::Network;
    use alloy_primitives::{address, Address, U256};

    const E18: u128 = 1_000_000_000_000_000_000;
    const PAIR_A: Address = address!("00000000000000000000000000000000000000a1");
    const PAIR_B: Address = address!("00000000000000000000000000000000000000a2");

    fn route(registry: &NetworkAddressSet, back_pair: Address) -> ArbitrageRoute {
        let (usdc, decimals) = registry.token("USDC").unwrap();
        let weth = registry.address("WETH").unwrap();
        ArbitrageRoute {
            name: format!("usdc-weth-{:?}", back_pair),
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
                        pool: PAIR_A,
                        fee: FeeRatio::UNISWAP_V2,
                    },
                },
                SwapLeg {
                    token_in: weth,
                    token_out: usdc,
                    kind: LegKind::ConstantProduct {
                        pool: back_pair,
                        fee: FeeRatio::UNISWAP_V2,
                    },
                },
            ],
            min_profit: U256::ZERO,
        }
    }

    fn chain(registry: &NetworkAddressSet) -> StubChain {
        let usdc = registry.address("USDC").unwrap();
        let weth = registry.address("WETH").unwrap();
        StubChain::new(1)
            .with_pair(
                PAIR_A,
                PairState {
                    token0: usdc,
                    token1: weth,
                    reserve0: U256::from(5_000_000_000_000u64),
                    reserve1: U256::from(2_000 * E18),
                },
            )
            // WETH is token0 here, priced at 3000 USDC
            .with_pair(
                PAIR_B,
                PairState {
                    token0: weth,
                    token1: usdc,
                    reserve0: U256::from(1_000 * E18),
                    reserve1: U256::from(3_000_000_000_000u64),
                },
            )
    }

    fn settings() -> MonitorSettings {
        MonitorSettings {
            scan_interval: Duration::from_millis(10),
            max_consecutive_failures: 5,
            failure_pause: Duration::from_millis(10),
            run_once: true,
        }
    }

    fn quiet_config() -> Config {
        Config {
            simulation_log: false,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_cycle_finds_and_simulates_profitable_route() {
        let registry = NetworkAddressSet::builtin(Network::Mainnet);
        let chain = chain(&registry);
        let routes = vec![route(&registry, PAIR_B)];
        let engine = ExecutionEngine::new(quiet_config(), &registry, None);
        let monitor = Monitor::new(&chain, &registry, routes, engine, settings());

        let summary = monitor.run_cycle().await.unwrap();
        assert_eq!(
            summary,
            CycleSummary {
                checked: 1,
                profitable: 1,
                simulated: 1,
                executed: 0,
                invalid: 0,
                failures: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_rpc_failure_counted_and_next_route_tried() {
        let registry = NetworkAddressSet::builtin(Network::Mainnet);
        let chain = chain(&registry);
        let missing = address!("00000000000000000000000000000000000000ff");
        let routes = vec![route(&registry, missing), route(&registry, PAIR_B)];
        let engine = ExecutionEngine::new(quiet_config(), &registry, None);
        let monitor = Monitor::new(&chain, &registry, routes, engine, settings());

        let stats = monitor.run(watch::channel(false).1).await.unwrap();
        assert_eq!(stats.cycles, 1);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.profitable, 1);
    }

    #[tokio::test]
    async fn test_configuration_error_ends_run() {
        let registry = NetworkAddressSet::builtin(Network::Mainnet);
        let chain = chain(&registry);
        let mut bad = route(&registry, PAIR_B);
        // PAIR_A does not trade DAI
        bad.legs[0].token_out = registry.address("DAI").unwrap();
        bad.legs[1].token_in = registry.address("DAI").unwrap();

        let engine = ExecutionEngine::new(quiet_config(), &registry, None);
        let monitor = Monitor::new(&chain, &registry, vec![bad], engine, settings());
        assert!(monitor.run_cycle().await.unwrap_err().is_configuration());
    }

    #[tokio::test]
    async fn test_shutdown_before_first_cycle() {
        let registry = NetworkAddressSet::builtin(Network::Mainnet);
        let chain = chain(&registry);
        let engine = ExecutionEngine::new(quiet_config(), &registry, None);
        let monitor = Monitor::new(
            &chain,
            &registry,
            vec![route(&registry, PAIR_B)],
            engine,
            MonitorSettings {
                run_once: false,
                ..settings()
            },
        );

        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let stats = monitor.run(rx).await.unwrap();
        assert_eq!(stats.cycles, 0);
    }

    #[tokio::test]
    async fn test_failing_cycles_trigger_pause_then_stop() {
        let registry = NetworkAddressSet::builtin(Network::Mainnet);
        let chain = chain(&registry);
        let missing = address!("00000000000000000000000000000000000000ff");
        let engine = ExecutionEngine::new(quiet_config(), &registry, None);
        let monitor = Monitor::new(
            &chain,
            &registry,
            vec![route(&registry, missing)],
            engine,
            MonitorSettings {
                max_consecutive_failures: 2,
                run_once: false,
                ..settings()
            },
        );

        let (tx, rx) = watch::channel(false);
        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let _ = tx.send(true);
        });

        let stats = monitor.run(rx).await.unwrap();
        stopper.await.unwrap();
        assert!(stats.cycles >= 2);
        assert!(stats.pauses >= 1);
        assert_eq!(stats.checked, 0);
    }

    #[tokio::test]
    async fn test_healthy_cycles_never_pause_with_zero_failure_limit() {
        let registry = NetworkAddressSet::builtin(Network::Mainnet);
        let chain = chain(&registry);
        let engine = ExecutionEngine::new(quiet_config(), &registry, None);
        let monitor = Monitor::new(
            &chain,
            &registry,
            vec![route(&registry, PAIR_B)],
            engine,
            MonitorSettings {
                scan_interval: Duration::from_millis(5),
                max_consecutive_failures: 0,
                failure_pause: Duration::from_millis(5),
                run_once: false,
            },
        );

        let (tx, rx) = watch::channel(false);
        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = tx.send(true);
        });

        let stats = monitor.run(rx).await.unwrap();
        stopper.await.unwrap();
        assert!(stats.cycles >= 2);
        assert_eq!(stats.failures, 0);
        assert_eq!(stats.pauses, 0);
        assert_eq!(stats.simulated, stats.cycles);
        assert_eq!(stats.executed, 0);
    }
}
