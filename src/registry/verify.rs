//! On-chain registry verification
//!
//! Every entry must point at deployed code. Tokens and pods must also answer
//! `symbol()` and `decimals()`, and the decimals must match the registry.

use alloy_primitives::Address;
use futures::future::join_all;
use std::fmt;
use tracing::{debug, info, warn};

use super::{Entry, EntryKind, Network, NetworkAddressSet};
use crate::chain::ChainReader;
use crate::error::ArbError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Verified { detail: String },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryCheck {
    pub name: String,
    pub address: Address,
    pub outcome: CheckOutcome,
}

impl EntryCheck {
    pub fn passed(&self) -> bool {
        matches!(self.outcome, CheckOutcome::Verified { .. })
    }
}

impl fmt::Display for EntryCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            CheckOutcome::Verified { detail } => {
                write!(f, "✓ {:<16} {:?} {}", self.name, self.address, detail)
            }
            CheckOutcome::Failed(reason) => {
                write!(f, "✗ {:<16} {:?} {}", self.name, self.address, reason)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct VerificationReport {
    pub network: Network,
    pub block: u64,
    pub checks: Vec<EntryCheck>,
}

impl VerificationReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(EntryCheck::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &EntryCheck> {
        self.checks.iter().filter(|c| !c.passed())
    }

    /// First failure as a configuration error
    pub fn ensure(&self) -> Result<(), ArbError> {
        match self.failures().next() {
            None => Ok(()),
            Some(check) => {
                let reason = match &check.outcome {
                    CheckOutcome::Failed(reason) => reason.as_str(),
                    CheckOutcome::Verified { .. } => "",
                };
                Err(ArbError::config(format!(
                    "{} ({:?}) on {} failed verification: {}",
                    check.name, check.address, self.network, reason
                )))
            }
        }
    }
}

async fn check_entry<R: ChainReader>(reader: &R, entry: &Entry) -> EntryCheck {
    let outcome = match verify_entry(reader, entry).await {
        Ok(detail) => CheckOutcome::Verified { detail },
        Err(reason) => CheckOutcome::Failed(reason),
    };

    EntryCheck {
        name: entry.name.clone(),
        address: entry.address,
        outcome,
    }
}

async fn verify_entry<R: ChainReader>(reader: &R, entry: &Entry) -> Result<String, String> {
    let code = reader
        .code_size(entry.address)
        .await
        .map_err(|e| e.to_string())?;
    if code == 0 {
        return Err("no contract code at address".to_string());
    }

    match entry.kind {
        EntryKind::Token { decimals } | EntryKind::Pod { decimals } => {
            let meta = reader
                .token_metadata(entry.address)
                .await
                .map_err(|e| e.to_string())?;
            if meta.decimals != decimals {
                return Err(format!(
                    "decimals() returned {}, registry says {}",
                    meta.decimals, decimals
                ));
            }
            Ok(format!("{} ({} decimals)", meta.symbol, meta.decimals))
        }
        _ => Ok(format!("{} bytes of code", code)),
    }
}

/// Check the whole set against the chain behind `reader`.
///
/// A chain id that does not match the set's network is a configuration error
/// before any entry is looked at. Entry failures are collected in the report.
pub async fn verify_registry<R: ChainReader>(
    reader: &R,
    set: &NetworkAddressSet,
) -> Result<VerificationReport, ArbError> {
    let chain_id = reader.chain_id().await?;
    if chain_id != set.network().chain_id() {
        return Err(ArbError::config(format!(
            "RPC is on chain {} but the registry is for {} (chain {})",
            chain_id,
            set.network(),
            set.network().chain_id()
        )));
    }

    let block = reader.block_number().await?;
    info!("Verifying {} registry entries on {} at block {}", set.len(), set.network(), block);

    let checks = join_all(set.entries().map(|entry| check_entry(reader, entry))).await;

    for check in &checks {
        if check.passed() {
            debug!("{}", check);
        } else {
            warn!("{}", check);
        }
    }

    Ok(VerificationReport {
        network: set.network(),
        block,
        checks,
    })
}
