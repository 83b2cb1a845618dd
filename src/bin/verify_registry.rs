//! Registry check
//!
//! Verifies every registry entry for the configured network: deployed code,
//! and for tokens and pods a working ERC-20 interface with the recorded
//! decimals. Extra entries from the routes file are checked too when it
//! exists.
//!
//! Run with: cargo run --bin verify-registry

use color_eyre::eyre::{eyre, Result};
use console::style;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use podarb::chain::RpcChainReader;
use podarb::config::{Config, RoutesFile};
use podarb::registry::{verify_registry, NetworkAddressSet};

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

    let config = Config::from_env()?;
    if config.rpc_url.trim().is_empty() {
        return Err(eyre!("RPC_URL is not set"));
    }

    let mut registry = NetworkAddressSet::builtin(config.network);
    if Path::new(&config.routes_file).exists() {
        let routes_file = RoutesFile::load(&config.routes_file)?;
        routes_file.ensure_network(config.network)?;
        registry = registry.extend(&routes_file.registry_entries())?;
    }

    println!();
    println!(
        "{}",
        style(format!(
            "═══ REGISTRY CHECK: {} ({} entries) ═══",
            config.network,
            registry.len()
        ))
        .cyan()
        .bold()
    );
    println!();

    let reader = RpcChainReader::connect(&config.rpc_url).await?;
    let report = verify_registry(&reader, &registry).await?;

    for check in &report.checks {
        if check.passed() {
            println!("  {}", style(check).green());
        } else {
            println!("  {}", style(check).red());
        }
    }

    let failed = report.failures().count();
    println!();
    if failed == 0 {
        println!(
            "{} All {} entries verified at block {}",
            style("✓").green().bold(),
            report.checks.len(),
            report.block
        );
        Ok(())
    } else {
        println!(
            "{} {} of {} entries failed at block {}",
            style("✗").red().bold(),
            failed,
            report.checks.len(),
            report.block
        );
        report.ensure()?;
        Ok(())
    }
}
