//! In-memory `ChainReader` for tests

use alloy_primitives::{Address, U256};
use std::collections::HashMap;
use std::sync::Mutex;

use super::{ChainReader, PairState, TokenMetadata};
use crate::error::ArbError;

/// Fixed chain state. Quotes are `amount_in * numerator / denominator`.
#[derive(Default)]
pub struct StubChain {
    pub chain_id: u64,
    pub block: u64,
    pub code: HashMap<Address, usize>,
    pub tokens: HashMap<Address, TokenMetadata>,
    pub pairs: HashMap<Address, PairState>,
    pub pools: HashMap<Address, (Address, Address, u32)>,
    pub quotes: HashMap<(Address, Address), (u128, u128)>,
    pub premiums: HashMap<Address, u16>,
    pub pod_assets: HashMap<Address, Vec<Address>>,
    /// Every `amount_in` the quoter was asked for, in call order
    pub quoted: Mutex<Vec<U256>>,
}

impl StubChain {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            block: 19_000_000,
            ..Default::default()
        }
    }

    pub fn with_token(mut self, address: Address, symbol: &str, decimals: u8) -> Self {
        self.code.insert(address, 2_000);
        self.tokens.insert(
            address,
            TokenMetadata {
                symbol: symbol.to_string(),
                decimals,
            },
        );
        self
    }

    pub fn with_contract(mut self, address: Address) -> Self {
        self.code.insert(address, 1_000);
        self
    }

    pub fn with_pair(mut self, pair: Address, state: PairState) -> Self {
        self.code.insert(pair, 1_000);
        self.pools.insert(pair, (state.token0, state.token1, 0));
        self.pairs.insert(pair, state);
        self
    }

    pub fn with_pool(mut self, pool: Address, token0: Address, token1: Address, fee: u32) -> Self {
        self.code.insert(pool, 1_000);
        self.pools.insert(pool, (token0, token1, fee));
        self
    }

    pub fn with_quote(mut self, token_in: Address, token_out: Address, numerator: u128, denominator: u128) -> Self {
        self.quotes.insert((token_in, token_out), (numerator, denominator));
        self
    }

    pub fn with_premium(mut self, pool: Address, bps: u16) -> Self {
        self.code.insert(pool, 1_000);
        self.premiums.insert(pool, bps);
        self
    }

    pub fn with_pod(mut self, pod: Address, assets: &[Address]) -> Self {
        self.code.insert(pod, 1_000);
        self.pod_assets.insert(pod, assets.to_vec());
        self
    }

    pub fn quoted_amounts(&self) -> Vec<U256> {
        self.quoted.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

fn missing(context: &str, address: Address) -> ArbError {
    ArbError::external(format!("{} on {:?}", context, address), "execution reverted")
}

impl ChainReader for StubChain {
    async fn chain_id(&self) -> Result<u64, ArbError> {
        Ok(self.chain_id)
    }

    async fn block_number(&self) -> Result<u64, ArbError> {
        Ok(self.block)
    }

    async fn code_size(&self, address: Address) -> Result<usize, ArbError> {
        Ok(self.code.get(&address).copied().unwrap_or(0))
    }

    async fn token_metadata(&self, token: Address) -> Result<TokenMetadata, ArbError> {
        self.tokens.get(&token).cloned().ok_or_else(|| missing("symbol()", token))
    }

    async fn pair_state(&self, pair: Address) -> Result<PairState, ArbError> {
        self.pairs.get(&pair).copied().ok_or_else(|| missing("getReserves()", pair))
    }

    async fn pool_tokens(&self, pool: Address) -> Result<(Address, Address), ArbError> {
        self.pools
            .get(&pool)
            .map(|(t0, t1, _)| (*t0, *t1))
            .ok_or_else(|| missing("token0()", pool))
    }

    async fn pool_fee(&self, pool: Address) -> Result<u32, ArbError> {
        self.pools
            .get(&pool)
            .map(|(_, _, fee)| *fee)
            .ok_or_else(|| missing("fee()", pool))
    }

    async fn quote_exact_input_single(
        &self,
        quoter: Address,
        token_in: Address,
        token_out: Address,
        _fee: u32,
        amount_in: U256,
    ) -> Result<U256, ArbError> {
        if let Ok(mut quoted) = self.quoted.lock() {
            quoted.push(amount_in);
        }
        let (numerator, denominator) = self
            .quotes
            .get(&(token_in, token_out))
            .ok_or_else(|| missing("quoteExactInputSingle", quoter))?;
        Ok(amount_in * U256::from(*numerator) / U256::from(*denominator))
    }

    async fn is_pod_asset(&self, pod: Address, token: Address) -> Result<bool, ArbError> {
        self.pod_assets
            .get(&pod)
            .map(|assets| assets.contains(&token))
            .ok_or_else(|| missing("isAsset()", pod))
    }

    async fn flash_loan_premium_bps(&self, pool: Address) -> Result<u16, ArbError> {
        self.premiums
            .get(&pool)
            .copied()
            .ok_or_else(|| missing("FLASHLOAN_PREMIUM_TOTAL()", pool))
    }
}
