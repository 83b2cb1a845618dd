//! `ChainReader` over an alloy HTTP provider
//!
//! Calls are plain `eth_call`s against the latest block. Every call encodes
//! and decodes through the bindings in `contracts`.

use alloy_primitives::aliases::{U160, U24};
use alloy_primitives::{Address, U256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::SolCall;
use tracing::debug;

use super::{ChainReader, PairState, TokenMetadata};
use crate::contracts::{IAavePool, IPod, IERC20, IQuoterV2, IUniswapV2Pair, IUniswapV3Pool};
use crate::error::ArbError;

#[derive(Clone)]
pub struct RpcChainReader {
    provider: DynProvider,
}

impl RpcChainReader {
    pub async fn connect(rpc_url: &str) -> Result<Self, ArbError> {
        let provider = ProviderBuilder::new()
            .connect(rpc_url)
            .await
            .map_err(|e| ArbError::config(format!("cannot connect to RPC_URL: {}", e)))?
            .erased();

        Ok(Self { provider })
    }

    pub fn from_provider(provider: DynProvider) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    async fn call_contract<C: SolCall>(
        &self,
        to: Address,
        call: C,
        context: &str,
    ) -> Result<C::Return, ArbError> {
        let tx = TransactionRequest::default()
            .to(to)
            .input(call.abi_encode().into());

        let output = self
            .provider
            .call(tx)
            .await
            .map_err(|e| ArbError::from_transport(format!("{} on {:?}", context, to), e))?;

        C::abi_decode_returns(&output).map_err(|e| {
            ArbError::external(format!("{} on {:?}", context, to), format!("undecodable output: {}", e))
        })
    }
}

impl ChainReader for RpcChainReader {
    async fn chain_id(&self) -> Result<u64, ArbError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| ArbError::from_transport("eth_chainId", e))
    }

    async fn block_number(&self) -> Result<u64, ArbError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| ArbError::from_transport("eth_blockNumber", e))
    }

    async fn code_size(&self, address: Address) -> Result<usize, ArbError> {
        let code = self
            .provider
            .get_code_at(address)
            .await
            .map_err(|e| ArbError::from_transport(format!("eth_getCode {:?}", address), e))?;
        Ok(code.len())
    }

    async fn token_metadata(&self, token: Address) -> Result<TokenMetadata, ArbError> {
        let (symbol, decimals) = futures::try_join!(
            self.call_contract(token, IERC20::symbolCall {}, "symbol()"),
            self.call_contract(token, IERC20::decimalsCall {}, "decimals()"),
        )?;
        Ok(TokenMetadata { symbol, decimals })
    }

    async fn pair_state(&self, pair: Address) -> Result<PairState, ArbError> {
        let (reserves, token0, token1) = futures::try_join!(
            self.call_contract(pair, IUniswapV2Pair::getReservesCall {}, "getReserves()"),
            self.call_contract(pair, IUniswapV2Pair::token0Call {}, "token0()"),
            self.call_contract(pair, IUniswapV2Pair::token1Call {}, "token1()"),
        )?;

        let reserve0 = U256::from(reserves.reserve0.to::<u128>());
        let reserve1 = U256::from(reserves.reserve1.to::<u128>());
        debug!("Pair {:?}: reserve0={} reserve1={}", pair, reserve0, reserve1);

        Ok(PairState {
            token0,
            token1,
            reserve0,
            reserve1,
        })
    }

    async fn pool_tokens(&self, pool: Address) -> Result<(Address, Address), ArbError> {
        futures::try_join!(
            self.call_contract(pool, IUniswapV3Pool::token0Call {}, "token0()"),
            self.call_contract(pool, IUniswapV3Pool::token1Call {}, "token1()"),
        )
    }

    async fn pool_fee(&self, pool: Address) -> Result<u32, ArbError> {
        let fee = self
            .call_contract(pool, IUniswapV3Pool::feeCall {}, "fee()")
            .await?;
        Ok(fee.to::<u32>())
    }

    async fn quote_exact_input_single(
        &self,
        quoter: Address,
        token_in: Address,
        token_out: Address,
        fee: u32,
        amount_in: U256,
    ) -> Result<U256, ArbError> {
        let fee = U24::try_from(fee)
            .map_err(|_| ArbError::validation("fee_tier", format!("{} does not fit uint24", fee)))?;

        let params = IQuoterV2::QuoteExactInputSingleParams {
            tokenIn: token_in,
            tokenOut: token_out,
            amountIn: amount_in,
            fee,
            sqrtPriceLimitX96: U160::ZERO,
        };

        let quote = self
            .call_contract(
                quoter,
                IQuoterV2::quoteExactInputSingleCall { params },
                "quoteExactInputSingle",
            )
            .await?;

        debug!(
            "Quote {:?} -> {:?} (fee {}): {} -> {}",
            token_in, token_out, fee, amount_in, quote.amountOut
        );
        Ok(quote.amountOut)
    }

    async fn is_pod_asset(&self, pod: Address, token: Address) -> Result<bool, ArbError> {
        self.call_contract(pod, IPod::isAssetCall { token }, "isAsset()").await
    }

    async fn flash_loan_premium_bps(&self, pool: Address) -> Result<u16, ArbError> {
        let premium = self
            .call_contract(pool, IAavePool::FLASHLOAN_PREMIUM_TOTALCall {}, "FLASHLOAN_PREMIUM_TOTAL()")
            .await?;

        u16::try_from(premium).map_err(|_| {
            ArbError::external(
                format!("FLASHLOAN_PREMIUM_TOTAL() on {:?}", pool),
                format!("premium {} is not a basis-point value", premium),
            )
        })
    }
}
