//! Address Registry
//!
//! Immutable per-network address tables. A set is built once at startup from
//! the built-in tables plus the routes file, then passed by reference to
//! everything that needs an address. Nothing mutates it afterwards.

mod verify;

pub use verify::{verify_registry, CheckOutcome, EntryCheck, VerificationReport};

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::error::ArbError;
use crate::tokens::{self, ProtocolContracts, Token};

/// Name of the Aave V3 pool entry in every set
pub const FLASH_LOAN_POOL: &str = "AAVE_POOL";

/// Name of the Uniswap QuoterV2 entry in every set
pub const QUOTER: &str = "QUOTER_V2";

// ============================================
// NETWORK
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Arbitrum,
}

impl Network {
    pub fn chain_id(self) -> u64 {
        match self {
            Network::Mainnet => 1,
            Network::Arbitrum => 42161,
        }
    }

    pub fn from_chain_id(chain_id: u64) -> Result<Self, ArbError> {
        match chain_id {
            1 => Ok(Network::Mainnet),
            42161 => Ok(Network::Arbitrum),
            other => Err(ArbError::config(format!("unsupported chain id {}", other))),
        }
    }
}

impl FromStr for Network {
    type Err = ArbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mainnet" | "ethereum" | "1" => Ok(Network::Mainnet),
            "arbitrum" | "arbitrum-one" | "42161" => Ok(Network::Arbitrum),
            other => Err(ArbError::config(format!("unknown network '{}'", other))),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Arbitrum => write!(f, "arbitrum"),
        }
    }
}

// ============================================
// ENTRIES
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryKind {
    Token { decimals: u8 },
    Pod { decimals: u8 },
    Pool,
    FlashLoanPool,
    Quoter,
}

impl EntryKind {
    pub fn decimals(&self) -> Option<u8> {
        match self {
            EntryKind::Token { decimals } | EntryKind::Pod { decimals } => Some(*decimals),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub address: Address,
    pub kind: EntryKind,
}

/// Extra entries supplied by the routes file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryEntries {
    #[serde(default)]
    pub tokens: Vec<TokenEntry>,

    #[serde(default)]
    pub pods: Vec<TokenEntry>,

    #[serde(default)]
    pub pools: BTreeMap<String, Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenEntry {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
}

// ============================================
// NETWORK ADDRESS SET
// ============================================

#[derive(Debug, Clone)]
pub struct NetworkAddressSet {
    network: Network,
    entries: BTreeMap<String, Entry>,
    decimals: HashMap<Address, u8>,
}

impl NetworkAddressSet {
    /// The canonical table for `network`
    pub fn builtin(network: Network) -> Self {
        let (token_list, contracts) = match network {
            Network::Mainnet => (tokens::mainnet_tokens(), tokens::mainnet_contracts()),
            Network::Arbitrum => (tokens::arbitrum_tokens(), tokens::arbitrum_contracts()),
        };

        let mut set = Self {
            network,
            entries: BTreeMap::new(),
            decimals: HashMap::new(),
        };
        set.seed(&token_list, &contracts);
        set
    }

    fn seed(&mut self, token_list: &[Token], contracts: &ProtocolContracts) {
        for token in token_list {
            self.decimals.insert(token.address, token.decimals);
            self.entries.insert(
                token.symbol.to_string(),
                Entry {
                    name: token.symbol.to_string(),
                    address: token.address,
                    kind: EntryKind::Token { decimals: token.decimals },
                },
            );
        }

        for (name, address, kind) in [
            (FLASH_LOAN_POOL, contracts.aave_pool, EntryKind::FlashLoanPool),
            (QUOTER, contracts.quoter_v2, EntryKind::Quoter),
        ] {
            self.entries.insert(
                name.to_string(),
                Entry {
                    name: name.to_string(),
                    address,
                    kind,
                },
            );
        }
    }

    /// Returns a new set with `extra` merged in.
    ///
    /// Re-declaring an existing name with identical contents is allowed;
    /// anything else that collides is a configuration error.
    pub fn extend(mut self, extra: &RegistryEntries) -> Result<Self, ArbError> {
        for token in &extra.tokens {
            self.insert(Entry {
                name: token.symbol.clone(),
                address: token.address,
                kind: EntryKind::Token { decimals: token.decimals },
            })?;
        }
        for pod in &extra.pods {
            self.insert(Entry {
                name: pod.symbol.clone(),
                address: pod.address,
                kind: EntryKind::Pod { decimals: pod.decimals },
            })?;
        }
        for (name, address) in &extra.pools {
            self.insert(Entry {
                name: name.clone(),
                address: *address,
                kind: EntryKind::Pool,
            })?;
        }
        Ok(self)
    }

    fn insert(&mut self, entry: Entry) -> Result<(), ArbError> {
        if entry.name.trim().is_empty() || entry.name.starts_with("0x") {
            return Err(ArbError::config(format!(
                "invalid registry name '{}' for {:?}",
                entry.name, entry.address
            )));
        }

        if let Some(existing) = self.entries.get(&entry.name) {
            if *existing == entry {
                return Ok(());
            }
            return Err(ArbError::config(format!(
                "{} on {} is already registered as {:?} {:?}",
                entry.name, self.network, existing.address, existing.kind
            )));
        }

        if let Some(decimals) = entry.kind.decimals() {
            match self.decimals.get(&entry.address) {
                Some(known) if *known != decimals => {
                    return Err(ArbError::config(format!(
                        "{} ({:?}) declared with {} decimals, already known as {}",
                        entry.name, entry.address, decimals, known
                    )));
                }
                _ => {
                    self.decimals.insert(entry.address, decimals);
                }
            }
        }

        self.entries.insert(entry.name.clone(), entry);
        Ok(())
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    pub fn address(&self, name: &str) -> Result<Address, ArbError> {
        self.get(name)
            .map(|e| e.address)
            .ok_or_else(|| ArbError::config(format!("'{}' is not registered on {}", name, self.network)))
    }

    /// Address and decimals of a token or pod share
    pub fn token(&self, name: &str) -> Result<(Address, u8), ArbError> {
        let entry = self
            .get(name)
            .ok_or_else(|| ArbError::config(format!("token '{}' is not registered on {}", name, self.network)))?;

        match entry.kind.decimals() {
            Some(decimals) => Ok((entry.address, decimals)),
            None => Err(ArbError::config(format!(
                "'{}' on {} is a {:?}, not a token",
                name, self.network, entry.kind
            ))),
        }
    }

    pub fn decimals_of(&self, address: &Address) -> Option<u8> {
        self.decimals.get(address).copied()
    }

    /// Registered name for an address, for log lines
    pub fn name_of(&self, address: &Address) -> Option<&str> {
        self.entries
            .values()
            .find(|e| e.address == *address)
            .map(|e| e.name.as_str())
    }

    /// Accepts either a registered name or a literal hex address
    pub fn resolve(&self, name_or_address: &str) -> Result<Address, ArbError> {
        if name_or_address.starts_with("0x") {
            return Address::from_str(name_or_address)
                .map_err(|e| ArbError::config(format!("bad address '{}': {}", name_or_address, e)));
        }
        self.address(name_or_address)
    }

    pub fn flash_loan_pool(&self) -> Result<Address, ArbError> {
        self.address(FLASH_LOAN_POOL)
    }

    pub fn quoter(&self) -> Result<Address, ArbError> {
        self.address(QUOTER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    fn pod_entries() -> RegistryEntries {
        let mut pools = BTreeMap::new();
        pools.insert(
            "PEAS_WETH_V3".to_string(),
            address!("00000000000000000000000000000000000000a1"),
        );
        RegistryEntries {
            tokens: vec![],
            pods: vec![TokenEntry {
                symbol: "pPEAS".to_string(),
                address: address!("00000000000000000000000000000000000000b1"),
                decimals: 18,
            }],
            pools,
        }
    }

    #[test]
    fn test_network_parsing() {
        assert_eq!("mainnet".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!("Arbitrum".parse::<Network>().unwrap(), Network::Arbitrum);
        assert_eq!(Network::from_chain_id(42161).unwrap(), Network::Arbitrum);
        assert!(Network::from_chain_id(10).unwrap_err().is_configuration());
        assert!("solana".parse::<Network>().is_err());
    }

    #[test]
    fn test_builtin_lookups() {
        let set = NetworkAddressSet::builtin(Network::Mainnet);
        let (usdc, decimals) = set.token("USDC").unwrap();
        assert_eq!(usdc, address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"));
        assert_eq!(decimals, 6);
        assert_eq!(set.decimals_of(&usdc), Some(6));
        assert_eq!(set.name_of(&usdc), Some("USDC"));
        assert!(set.flash_loan_pool().is_ok());
        assert!(set.quoter().is_ok());
    }

    #[test]
    fn test_networks_do_not_share_usdc() {
        let mainnet = NetworkAddressSet::builtin(Network::Mainnet);
        let arbitrum = NetworkAddressSet::builtin(Network::Arbitrum);
        assert_ne!(
            mainnet.address("USDC").unwrap(),
            arbitrum.address("USDC").unwrap()
        );
        assert!(arbitrum.token("PEAS").unwrap_err().is_configuration());
    }

    #[test]
    fn test_extend_with_pods_and_pools() {
        let set = NetworkAddressSet::builtin(Network::Mainnet)
            .extend(&pod_entries())
            .unwrap();

        assert_eq!(set.token("pPEAS").unwrap().1, 18);
        assert_eq!(
            set.resolve("PEAS_WETH_V3").unwrap(),
            address!("00000000000000000000000000000000000000a1")
        );
        // Pools are not tokens
        assert!(set.token("PEAS_WETH_V3").is_err());
    }

    #[test]
    fn test_extend_is_idempotent_for_identical_entries() {
        let set = NetworkAddressSet::builtin(Network::Mainnet)
            .extend(&pod_entries())
            .unwrap();
        let len = set.len();
        let set = set.extend(&pod_entries()).unwrap();
        assert_eq!(set.len(), len);
    }

    #[test]
    fn test_extend_rejects_conflicts() {
        let conflicting = RegistryEntries {
            tokens: vec![TokenEntry {
                symbol: "USDC".to_string(),
                address: address!("00000000000000000000000000000000000000c1"),
                decimals: 6,
            }],
            ..Default::default()
        };
        let err = NetworkAddressSet::builtin(Network::Mainnet)
            .extend(&conflicting)
            .unwrap_err();
        assert!(err.is_configuration());

        // Same address, different decimals under a new name
        let bad_decimals = RegistryEntries {
            tokens: vec![TokenEntry {
                symbol: "USDC_ALIAS".to_string(),
                address: address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
                decimals: 18,
            }],
            ..Default::default()
        };
        assert!(NetworkAddressSet::builtin(Network::Mainnet)
            .extend(&bad_decimals)
            .is_err());
    }

    #[test]
    fn test_resolve_literal_address() {
        let set = NetworkAddressSet::builtin(Network::Arbitrum);
        let addr = set
            .resolve("0x82aF49447D8a07e3bd95BD0d56f35241523fBab1")
            .unwrap();
        assert_eq!(set.name_of(&addr), Some("WETH"));
        assert!(set.resolve("0xnothex").is_err());
        assert!(set.resolve("NOPE").is_err());
    }
}
