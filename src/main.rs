//! podarb - flash-loan arbitrage monitor
//!
//! Run with: cargo run
//!
//! Loads `.env` and the routes file, verifies the address registry against
//! the chain, then checks every route on each scan interval. SIMULATION is
//! the default mode; nothing is sent unless EXECUTION_MODE says so.

use color_eyre::eyre::Result;
use console::style;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use podarb::chain::{resolve_route, RpcChainReader};
use podarb::config::{Config, ExecutionMode, RoutesFile};
use podarb::executor::{ExecutionEngine, TxSubmitter};
use podarb::monitor::{shutdown_on_ctrl_c, Monitor, MonitorSettings};
use podarb::registry::{verify_registry, NetworkAddressSet};

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!(
        "{}",
        style(" 🫛 PODARB - Flash-Loan Pod Arbitrage Monitor").cyan().bold()
    );
    println!(
        "{}",
        style("    Aave flash loans | Uniswap V2/V3 | Peapods bond/debond").cyan()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("podarb=info".parse()?),
        )
        .init();

    print_banner();

    // Load configuration
    let config = Config::from_env()?;

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        error!("Please check your .env file");
        return Err(e.into());
    }

    config.print_summary();
    println!();

    // =============================================
    // REGISTRY
    // =============================================
    println!("{}", style("═══ REGISTRY ═══").blue().bold());

    let routes_file = RoutesFile::load(&config.routes_file)?;
    routes_file.ensure_network(config.network)?;

    let registry = NetworkAddressSet::builtin(config.network).extend(&routes_file.registry_entries())?;

    let reader = RpcChainReader::connect(&config.rpc_url).await?;
    let report = verify_registry(&reader, &registry).await?;

    for check in report.failures() {
        error!("{}", check);
    }
    report.ensure()?;
    println!(
        "{} {} registry entries verified at block {}",
        style("✓").green(),
        report.checks.len(),
        report.block
    );

    // =============================================
    // ROUTES
    // =============================================
    println!();
    println!("{}", style("═══ ROUTES ═══").magenta().bold());

    let mut routes = Vec::with_capacity(routes_file.routes.len());
    for route_config in &routes_file.routes {
        match resolve_route(&reader, &registry, route_config).await {
            Ok(route) => {
                println!("{} {}", style("✓").green(), route);
                routes.push(route);
            }
            Err(e) if e.is_validation() => {
                warn!("Skipping route {}: {}", route_config.name, e);
            }
            Err(e) => return Err(e.into()),
        }
    }

    if routes.is_empty() {
        warn!("No usable routes in {}", config.routes_file);
        return Ok(());
    }

    // =============================================
    // EXECUTION
    // =============================================
    let submitter = match (config.execution_mode, config.signer()?) {
        (ExecutionMode::Simulation, _) | (_, None) => None,
        (_, Some(signer)) => Some(
            TxSubmitter::connect(
                &config.rpc_url,
                signer,
                Duration::from_secs(config.tx_confirmation_timeout_secs),
            )
            .await?,
        ),
    };

    if config.emergency_stop {
        warn!("🛑 EMERGENCY_STOP is active: opportunities are reported, nothing is executed");
    }

    let settings = MonitorSettings::from_config(&config);
    let engine = ExecutionEngine::new(config, &registry, submitter);
    let monitor = Monitor::new(&reader, &registry, routes, engine, settings);

    println!();
    println!("{}", style("═══ MONITOR ═══").green().bold());

    let stats = monitor.run(shutdown_on_ctrl_c()).await?;

    info!(
        "Done: {} cycles, {} route checks, {} profitable, {} simulated, {} executed",
        stats.cycles, stats.checked, stats.profitable, stats.simulated, stats.executed
    );

    Ok(())
}
