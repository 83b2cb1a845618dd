//! Token and contract tables, one per network
//!
//! These are the canonical defaults. Anything route-specific (pools, pods,
//! long-tail tokens) comes from the routes file and is merged by the registry.

use alloy_primitives::{address, Address};

/// Represents a token we're tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub symbol: &'static str,
    pub address: Address,
    pub decimals: u8,
}

/// Well-known protocol contracts for one network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolContracts {
    /// Aave V3 Pool (flash loans)
    pub aave_pool: Address,

    /// Uniswap V3 QuoterV2
    pub quoter_v2: Address,
}

// ============================================
// ETHEREUM MAINNET
// ============================================

pub fn mainnet_tokens() -> Vec<Token> {
    vec![
        Token {
            symbol: "WETH",
            address: address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
            decimals: 18,
        },
        Token {
            symbol: "USDC",
            address: address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
            decimals: 6,
        },
        Token {
            symbol: "USDT",
            address: address!("dAC17F958D2ee523a2206206994597C13D831ec7"),
            decimals: 6,
        },
        Token {
            symbol: "DAI",
            address: address!("6B175474E89094C44Da98b954EedcdeCB5BE3830"),
            decimals: 18,
        },
        Token {
            symbol: "PEAS",
            address: address!("02f92800F57BCD74066F5709F1Daa1A4302Df875"),
            decimals: 18,
        },
    ]
}

pub fn mainnet_contracts() -> ProtocolContracts {
    ProtocolContracts {
        aave_pool: address!("87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2"),
        quoter_v2: address!("61fFE014bA17989E743c5F6cB21bF9697530B21e"),
    }
}

// ============================================
// ARBITRUM ONE
// ============================================

pub fn arbitrum_tokens() -> Vec<Token> {
    vec![
        Token {
            symbol: "WETH",
            address: address!("82aF49447D8a07e3bd95BD0d56f35241523fBab1"),
            decimals: 18,
        },
        // Native USDC (not the bridged USDC.e)
        Token {
            symbol: "USDC",
            address: address!("af88d065e77c8cC2239327C5EDb3A432268e5831"),
            decimals: 6,
        },
        Token {
            symbol: "USDC.e",
            address: address!("FF970A61A04b1cA14834A43f5dE4533eBDDB5CC8"),
            decimals: 6,
        },
        Token {
            symbol: "USDT",
            address: address!("Fd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9"),
            decimals: 6,
        },
        Token {
            symbol: "DAI",
            address: address!("DA10009cBd5D07dd0CeCc66161FC93D7c9000da1"),
            decimals: 18,
        },
    ]
}

pub fn arbitrum_contracts() -> ProtocolContracts {
    ProtocolContracts {
        aave_pool: address!("794a61358D6845594F94dc1DB02A252b5b4814aD"),
        quoter_v2: address!("61fFE014bA17989E743c5F6cB21bF9697530B21e"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_no_duplicate_symbols_or_addresses() {
        for tokens in [mainnet_tokens(), arbitrum_tokens()] {
            let symbols: HashSet<_> = tokens.iter().map(|t| t.symbol).collect();
            let addresses: HashSet<_> = tokens.iter().map(|t| t.address).collect();
            assert_eq!(symbols.len(), tokens.len());
            assert_eq!(addresses.len(), tokens.len());
        }
    }

    #[test]
    fn test_usdc_is_six_decimals_everywhere() {
        for tokens in [mainnet_tokens(), arbitrum_tokens()] {
            let usdc = tokens.iter().find(|t| t.symbol == "USDC").unwrap();
            assert_eq!(usdc.decimals, 6);
        }
    }
}
