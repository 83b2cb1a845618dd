//! Runtime configuration
//!
//! Two sources:
//! - process environment (and `.env`) for the run itself: RPC, network,
//!   execution mode, signer, timings, safety switches
//! - a TOML routes file for extra registry entries and the routes to watch

use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use crate::error::ArbError;
use crate::registry::{Network, RegistryEntries, TokenEntry};

// ============================================
// EXECUTION MODE
// ============================================

/// Execution mode determines what happens to a profitable route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Log the opportunity, never send anything
    Simulation,

    /// Build the flash-loan transaction and `eth_call` it from the signer
    DryRun,

    /// Sign, submit and wait for the receipt
    /// CAUTION: This uses real funds!
    Production,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        ExecutionMode::Simulation
    }
}

impl FromStr for ExecutionMode {
    type Err = ArbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simulation" | "sim" => Ok(ExecutionMode::Simulation),
            "dry_run" | "dryrun" | "dry-run" => Ok(ExecutionMode::DryRun),
            "production" | "prod" => Ok(ExecutionMode::Production),
            other => Err(ArbError::config(format!("unknown EXECUTION_MODE '{}'", other))),
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Simulation => write!(f, "SIMULATION"),
            ExecutionMode::DryRun => write!(f, "DRY_RUN"),
            ExecutionMode::Production => write!(f, "PRODUCTION"),
        }
    }
}

// ============================================
// MAIN CONFIGURATION
// ============================================

#[derive(Clone)]
pub struct Config {
    // ========== Network Settings ==========
    pub rpc_url: String,

    /// Network the registry is built for; checked against the RPC's chain id
    pub network: Network,

    // ========== Execution Settings ==========
    pub execution_mode: ExecutionMode,

    /// Signing key for dry runs and production (KEEP SECRET!)
    pub private_key: Option<String>,

    /// Deployed flash-loan receiver that runs the planned steps
    pub executor_contract_address: Option<Address>,

    /// Per-step tolerance below the estimated output, in basis points
    pub slippage_bps: u16,

    pub tx_confirmation_timeout_secs: u64,

    // ========== Routes ==========
    pub routes_file: String,

    // ========== Monitor ==========
    pub scan_interval_secs: u64,

    /// Single cycle, then exit
    pub run_once: bool,

    // ========== Safety Settings ==========
    /// Kill switch - nothing is simulated, dry-run or sent
    pub emergency_stop: bool,

    /// Maximum consecutive failing cycles before pausing
    pub max_consecutive_failures: u32,

    /// Pause duration after max failures (seconds)
    pub failure_pause_secs: u64,

    // ========== Opportunity Log ==========
    pub simulation_log: bool,
    pub simulation_log_path: String,
}

fn var_or<T: FromStr>(name: &str, default: T) -> Result<T, ArbError>
where
    T::Err: fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| ArbError::config(format!("{}='{}': {}", name, raw, e))),
        _ => Ok(default),
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self, ArbError> {
        dotenvy::dotenv().ok();

        let network = match (optional_var("NETWORK"), optional_var("CHAIN_ID")) {
            (Some(name), _) => name.parse()?,
            (None, Some(id)) => {
                let id: u64 = id
                    .trim()
                    .parse()
                    .map_err(|e| ArbError::config(format!("CHAIN_ID='{}': {}", id, e)))?;
                Network::from_chain_id(id)?
            }
            (None, None) => Network::Mainnet,
        };

        let executor_contract_address = optional_var("EXECUTOR_CONTRACT_ADDRESS")
            .map(|raw| {
                Address::from_str(raw.trim()).map_err(|e| {
                    ArbError::config(format!("EXECUTOR_CONTRACT_ADDRESS='{}': {}", raw, e))
                })
            })
            .transpose()?;

        Ok(Self {
            rpc_url: env::var("RPC_URL").unwrap_or_default(),
            network,

            execution_mode: var_or("EXECUTION_MODE", ExecutionMode::Simulation)?,
            private_key: optional_var("PRIVATE_KEY"),
            executor_contract_address,
            slippage_bps: var_or("SLIPPAGE_BPS", 50)?,
            tx_confirmation_timeout_secs: var_or("TX_CONFIRMATION_TIMEOUT_SECS", 120)?,

            routes_file: env::var("ROUTES_FILE").unwrap_or_else(|_| "routes.toml".to_string()),

            scan_interval_secs: var_or("SCAN_INTERVAL_SECS", 15)?,
            run_once: var_or("RUN_ONCE", false)?,

            emergency_stop: var_or("EMERGENCY_STOP", false)?,
            max_consecutive_failures: var_or("MAX_CONSECUTIVE_FAILURES", 5)?,
            failure_pause_secs: var_or("FAILURE_PAUSE_SECS", 60)?,

            simulation_log: var_or("SIMULATION_LOG", true)?,
            simulation_log_path: env::var("SIMULATION_LOG_PATH")
                .unwrap_or_else(|_| "./logs/opportunities.jsonl".to_string()),
        })
    }

    /// Reject combinations the run cannot work with
    pub fn validate(&self) -> Result<(), ArbError> {
        if self.rpc_url.trim().is_empty() || self.rpc_url.contains("YOUR_API_KEY") {
            return Err(ArbError::config("RPC_URL is not set"));
        }

        if u64::from(self.slippage_bps) > crate::estimator::math::BPS_DENOMINATOR {
            return Err(ArbError::config(format!(
                "SLIPPAGE_BPS must be at most 10000 (currently {})",
                self.slippage_bps
            )));
        }

        if !(1..=3600).contains(&self.scan_interval_secs) {
            return Err(ArbError::config(format!(
                "SCAN_INTERVAL_SECS must be between 1 and 3600 (currently {})",
                self.scan_interval_secs
            )));
        }

        if self.tx_confirmation_timeout_secs == 0 {
            return Err(ArbError::config("TX_CONFIRMATION_TIMEOUT_SECS must be positive"));
        }

        if self.max_consecutive_failures == 0 {
            return Err(ArbError::config("MAX_CONSECUTIVE_FAILURES must be at least 1"));
        }

        if matches!(self.execution_mode, ExecutionMode::DryRun | ExecutionMode::Production) {
            if self.private_key.is_none() {
                return Err(ArbError::config(format!(
                    "{} mode requires PRIVATE_KEY",
                    self.execution_mode
                )));
            }
            if self.executor_contract_address.is_none() {
                return Err(ArbError::config(format!(
                    "{} mode requires EXECUTOR_CONTRACT_ADDRESS (deploy the executor first)",
                    self.execution_mode
                )));
            }
            self.signer()?;
        }

        Ok(())
    }

    /// Parsed signing key, if one is configured
    pub fn signer(&self) -> Result<Option<PrivateKeySigner>, ArbError> {
        self.private_key
            .as_deref()
            .map(|key| {
                PrivateKeySigner::from_str(key.trim().trim_start_matches("0x"))
                    .map_err(|e| ArbError::config(format!("PRIVATE_KEY is not a valid key: {}", e)))
            })
            .transpose()
    }

    /// Print configuration summary (the private key is never shown)
    pub fn print_summary(&self) {
        let executor = self
            .executor_contract_address
            .map(|a| format!("{:?}", a))
            .unwrap_or_else(|| "✗ Not Set".to_string());

        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║                 PODARB - CONFIGURATION                     ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ Execution Mode:    {:^40} ║", self.execution_mode);
        println!("║ Network:           {:^40} ║", self.network);
        println!("║ Routes File:       {:^40} ║", self.routes_file);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ EXECUTION                                                  ║");
        println!("║ • Slippage:        {:>37} bps ║", self.slippage_bps);
        println!("║ • Confirm Timeout: {:>39}s ║", self.tx_confirmation_timeout_secs);
        println!("║ • Signer Key:      {:^40} ║",
            if self.private_key.is_some() { "✓ Configured" } else { "✗ Not Set" }
        );
        println!("║ • Executor:        {:^40} ║", executor);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ MONITOR                                                    ║");
        println!("║ • Scan Interval:   {:>39}s ║", self.scan_interval_secs);
        println!("║ • Run Once:        {:^40} ║", if self.run_once { "yes" } else { "no" });
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ SAFETY                                                     ║");
        println!("║ • Emergency Stop:  {:^40} ║",
            if self.emergency_stop { "🛑 ACTIVE" } else { "✓ Inactive" }
        );
        println!("║ • Max Failures:    {:^40} ║", self.max_consecutive_failures);
        println!("║ • Failure Pause:   {:>39}s ║", self.failure_pause_secs);
        println!("║ • Simulation Log:  {:^40} ║",
            if self.simulation_log { "✓ Enabled" } else { "✗ Disabled" }
        );
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("rpc_url", &self.rpc_url)
            .field("network", &self.network)
            .field("execution_mode", &self.execution_mode)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("executor_contract_address", &self.executor_contract_address)
            .field("slippage_bps", &self.slippage_bps)
            .field("tx_confirmation_timeout_secs", &self.tx_confirmation_timeout_secs)
            .field("routes_file", &self.routes_file)
            .field("scan_interval_secs", &self.scan_interval_secs)
            .field("run_once", &self.run_once)
            .field("emergency_stop", &self.emergency_stop)
            .field("max_consecutive_failures", &self.max_consecutive_failures)
            .field("failure_pause_secs", &self.failure_pause_secs)
            .field("simulation_log", &self.simulation_log)
            .field("simulation_log_path", &self.simulation_log_path)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: String::new(),
            network: Network::Mainnet,
            execution_mode: ExecutionMode::Simulation,
            private_key: None,
            executor_contract_address: None,
            slippage_bps: 50,
            tx_confirmation_timeout_secs: 120,
            routes_file: "routes.toml".to_string(),
            scan_interval_secs: 15,
            run_once: false,
            emergency_stop: false,
            max_consecutive_failures: 5,
            failure_pause_secs: 60,
            simulation_log: true,
            simulation_log_path: "./logs/opportunities.jsonl".to_string(),
        }
    }
}

// ============================================
// ROUTES FILE
// ============================================

/// Contents of the routes file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutesFile {
    /// When present, must match the configured network
    #[serde(default)]
    pub network: Option<Network>,

    #[serde(default)]
    pub tokens: Vec<TokenEntry>,

    #[serde(default)]
    pub pods: Vec<TokenEntry>,

    #[serde(default)]
    pub pools: BTreeMap<String, Address>,

    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

/// A route as written by hand: names (or hex addresses) and decimal strings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    pub name: String,

    /// Registered token the flash loan is drawn in
    pub loan_asset: String,

    /// Human amount, e.g. "10000"
    pub loan_amount: String,

    /// Human amount of the loan asset
    #[serde(default = "default_min_profit")]
    pub min_profit: String,

    pub legs: Vec<LegConfig>,
}

fn default_min_profit() -> String {
    "0".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LegConfig {
    V2 {
        pool: String,
        token_in: String,
        token_out: String,
        /// Defaults to 997/1000
        #[serde(default)]
        fee_numerator: Option<u32>,
        #[serde(default)]
        fee_denominator: Option<u32>,
    },
    V3 {
        pool: String,
        token_in: String,
        token_out: String,
    },
    Bond {
        pod: String,
        token_in: String,
        token_out: String,
        fee_bps: u16,
    },
    Debond {
        pod: String,
        token_in: String,
        token_out: String,
        fee_bps: u16,
    },
}

impl RoutesFile {
    pub fn parse(content: &str) -> Result<Self, ArbError> {
        toml::from_str(content).map_err(|e| ArbError::config(format!("invalid routes file: {}", e)))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ArbError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ArbError::config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    pub fn registry_entries(&self) -> RegistryEntries {
        RegistryEntries {
            tokens: self.tokens.clone(),
            pods: self.pods.clone(),
            pools: self.pools.clone(),
        }
    }

    /// Fails if the file was written for another network
    pub fn ensure_network(&self, network: Network) -> Result<(), ArbError> {
        match self.network {
            Some(declared) if declared != network => Err(ArbError::config(format!(
                "routes file is for {} but the run is configured for {}",
                declared, network
            ))),
            _ => Ok(()),
        }
    }
}

// ============================================
// OPPORTUNITY LOGGER
// ============================================

/// One profitable route found during simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityLog {
    pub timestamp: DateTime<Utc>,
    pub network: Network,
    pub route: String,
    pub block_number: Option<u64>,
    pub loan_asset: String,
    pub loan_amount: String,
    pub estimated_output: String,
    pub estimated_profit: String,
    pub leg_outputs: Vec<String>,
}

impl OpportunityLog {
    /// Append this record as one JSON line
    pub fn append_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ArbError> {
        let path = path.as_ref();
        let io_err = |e: std::io::Error| ArbError::config(format!("{}: {}", path.display(), e));

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err)?;

        let json = serde_json::to_string(self)
            .map_err(|e| ArbError::config(format!("cannot encode opportunity: {}", e)))?;
        writeln!(file, "{}", json).map_err(io_err)?;

        Ok(())
    }
}

// ============================================
// TESTS
// ============================================
