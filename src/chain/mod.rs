//! Chain access
//!
//! Every read-only query the rest of the crate makes goes through
//! `ChainReader`. The RPC implementation wraps an alloy provider; tests use a
//! stub with fixed answers.
//!
//! Responsible for:
//! - Turning configured routes into typed routes (fee tiers, flash premium)
//! - Capturing the market snapshot a route is priced against

mod resolve;
mod rpc;
mod snapshot;

#[cfg(test)]
pub(crate) mod stub;

pub use resolve::resolve_route;
pub use rpc::RpcChainReader;
pub use snapshot::capture_snapshot;

use alloy_primitives::{Address, U256};
use std::future::Future;

use crate::error::ArbError;

/// `symbol()` and `decimals()` of an ERC-20
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadata {
    pub symbol: String,
    pub decimals: u8,
}

/// Reserves of a V2 pair together with its token ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairState {
    pub token0: Address,
    pub token1: Address,
    pub reserve0: U256,
    pub reserve1: U256,
}

impl PairState {
    /// Reserves as `(reserve_in, reserve_out)` for a swap `token_in -> token_out`.
    /// `None` when the pair does not trade exactly these two tokens.
    pub fn oriented(&self, token_in: Address, token_out: Address) -> Option<(U256, U256)> {
        if self.token0 == token_in && self.token1 == token_out {
            Some((self.reserve0, self.reserve1))
        } else if self.token1 == token_in && self.token0 == token_out {
            Some((self.reserve1, self.reserve0))
        } else {
            None
        }
    }
}

/// Read-only chain queries
pub trait ChainReader: Send + Sync {
    fn chain_id(&self) -> impl Future<Output = Result<u64, ArbError>> + Send;

    fn block_number(&self) -> impl Future<Output = Result<u64, ArbError>> + Send;

    /// Length of the deployed bytecode (0 for an EOA or empty address)
    fn code_size(&self, address: Address) -> impl Future<Output = Result<usize, ArbError>> + Send;

    fn token_metadata(
        &self,
        token: Address,
    ) -> impl Future<Output = Result<TokenMetadata, ArbError>> + Send;

    fn pair_state(&self, pair: Address) -> impl Future<Output = Result<PairState, ArbError>> + Send;

    /// `token0()` / `token1()` of a V2 pair or V3 pool
    fn pool_tokens(
        &self,
        pool: Address,
    ) -> impl Future<Output = Result<(Address, Address), ArbError>> + Send;

    /// V3 fee tier in hundredths of a bip
    fn pool_fee(&self, pool: Address) -> impl Future<Output = Result<u32, ArbError>> + Send;

    fn quote_exact_input_single(
        &self,
        quoter: Address,
        token_in: Address,
        token_out: Address,
        fee: u32,
        amount_in: U256,
    ) -> impl Future<Output = Result<U256, ArbError>> + Send;

    /// Whether `token` is one of the assets a pod wraps
    fn is_pod_asset(
        &self,
        pod: Address,
        token: Address,
    ) -> impl Future<Output = Result<bool, ArbError>> + Send;

    /// Aave `FLASHLOAN_PREMIUM_TOTAL`
    fn flash_loan_premium_bps(
        &self,
        pool: Address,
    ) -> impl Future<Output = Result<u16, ArbError>> + Send;
}
