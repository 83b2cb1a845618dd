//! Route resolution: hand-written `RouteConfig` -> typed `ArbitrageRoute`
//!
//! Names resolve through the registry. Fee tiers and the flash-loan premium
//! are read from the contracts themselves, and pools and pods are checked
//! against the tokens the leg names.

use alloy_primitives::Address;
use tracing::debug;

use super::ChainReader;
use crate::amount::AssetAmount;
use crate::config::{LegConfig, RouteConfig};
use crate::error::ArbError;
use crate::estimator::{ArbitrageRoute, FeeRatio, FlashLoan, LegKind, SwapLeg};
use crate::registry::NetworkAddressSet;

async fn ensure_pool_trades<R: ChainReader>(
    reader: &R,
    pool: Address,
    token_in: Address,
    token_out: Address,
) -> Result<(), ArbError> {
    let (token0, token1) = reader.pool_tokens(pool).await?;
    let trades = (token0 == token_in && token1 == token_out) || (token0 == token_out && token1 == token_in);
    if !trades {
        return Err(ArbError::config(format!(
            "pool {:?} trades {:?}/{:?}, not {:?}/{:?}",
            pool, token0, token1, token_in, token_out
        )));
    }
    Ok(())
}

/// The pod must be the share token and must wrap the underlying
async fn ensure_pod_wraps<R: ChainReader>(
    reader: &R,
    pod: Address,
    share: Address,
    underlying: Address,
) -> Result<(), ArbError> {
    if share != pod {
        return Err(ArbError::config(format!(
            "pod {:?} shares are its own token, not {:?}",
            pod, share
        )));
    }
    if !reader.is_pod_asset(pod, underlying).await? {
        return Err(ArbError::config(format!(
            "pod {:?} does not wrap {:?}",
            pod, underlying
        )));
    }
    Ok(())
}

async fn resolve_leg<R: ChainReader>(
    reader: &R,
    registry: &NetworkAddressSet,
    leg: &LegConfig,
) -> Result<SwapLeg, ArbError> {
    match leg {
        LegConfig::V2 {
            pool,
            token_in,
            token_out,
            fee_numerator,
            fee_denominator,
        } => {
            let pool = registry.resolve(pool)?;
            let token_in = registry.resolve(token_in)?;
            let token_out = registry.resolve(token_out)?;
            ensure_pool_trades(reader, pool, token_in, token_out).await?;

            let fee = FeeRatio::new(
                fee_numerator.unwrap_or(FeeRatio::UNISWAP_V2.numerator),
                fee_denominator.unwrap_or(FeeRatio::UNISWAP_V2.denominator),
            )?;

            Ok(SwapLeg {
                token_in,
                token_out,
                kind: LegKind::ConstantProduct { pool, fee },
            })
        }

        LegConfig::V3 {
            pool,
            token_in,
            token_out,
        } => {
            let pool = registry.resolve(pool)?;
            let token_in = registry.resolve(token_in)?;
            let token_out = registry.resolve(token_out)?;
            ensure_pool_trades(reader, pool, token_in, token_out).await?;

            let fee_tier = reader.pool_fee(pool).await?;
            debug!("V3 pool {:?} fee tier {}", pool, fee_tier);

            Ok(SwapLeg {
                token_in,
                token_out,
                kind: LegKind::ConcentratedLiquidity { pool, fee_tier },
            })
        }

        LegConfig::Bond {
            pod,
            token_in,
            token_out,
            fee_bps,
        } => {
            let pod = registry.resolve(pod)?;
            let token_in = registry.resolve(token_in)?;
            let token_out = registry.resolve(token_out)?;
            ensure_pod_wraps(reader, pod, token_out, token_in).await?;

            Ok(SwapLeg {
                token_in,
                token_out,
                kind: LegKind::Bond {
                    pod,
                    fee_bps: *fee_bps,
                },
            })
        }

        LegConfig::Debond {
            pod,
            token_in,
            token_out,
            fee_bps,
        } => {
            let pod = registry.resolve(pod)?;
            let token_in = registry.resolve(token_in)?;
            let token_out = registry.resolve(token_out)?;
            ensure_pod_wraps(reader, pod, token_in, token_out).await?;

            Ok(SwapLeg {
                token_in,
                token_out,
                kind: LegKind::Debond {
                    pod,
                    fee_bps: *fee_bps,
                },
            })
        }
    }
}

/// Resolve and validate one configured route.
///
/// Unknown names and pools that do not trade the configured pair are
/// configuration errors; a structurally broken route is a validation error.
pub async fn resolve_route<R: ChainReader>(
    reader: &R,
    registry: &NetworkAddressSet,
    config: &RouteConfig,
) -> Result<ArbitrageRoute, ArbError> {
    let pool = registry.flash_loan_pool()?;
    let (asset, decimals) = registry.token(&config.loan_asset)?;

    let amount = AssetAmount::parse(&config.loan_amount, decimals)?;
    let min_profit = AssetAmount::parse(&config.min_profit, decimals)?.value();
    let premium_bps = reader.flash_loan_premium_bps(pool).await?;

    let mut legs = Vec::with_capacity(config.legs.len());
    for leg in &config.legs {
        legs.push(resolve_leg(reader, registry, leg).await?);
    }

    let route = ArbitrageRoute {
        name: config.name.clone(),
        flash_loan: FlashLoan {
            pool,
            asset,
            amount,
            premium_bps,
        },
        legs,
        min_profit,
    };
    route.validate(registry)?;

    debug!("Resolved route {} (premium {} bps)", route, premium_bps);
    Ok(route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::stub::StubChain;
    use crate::chain::PairState;
    use crate::registry::{Network, RegistryEntries, TokenEntry};
    use alloy_primitives::{address, U256};
    use std::collections::BTreeMap;

    const PAIR: Address = address!("00000000000000000000000000000000000000a1");
    const POOL: Address = address!("00000000000000000000000000000000000000a2");
    const POD: Address = address!("00000000000000000000000000000000000000b1");

    fn registry() -> NetworkAddressSet {
        let mut pools = BTreeMap::new();
        pools.insert("USDC_WETH_V2".to_string(), PAIR);
        pools.insert("WETH_USDC_V3".to_string(), POOL);
        NetworkAddressSet::builtin(Network::Mainnet)
            .extend(&RegistryEntries {
                pods: vec![TokenEntry {
                    symbol: "pWETH".to_string(),
                    address: POD,
                    decimals: 18,
                }],
                pools,
                ..Default::default()
            })
            .unwrap()
    }

    fn chain(registry: &NetworkAddressSet) -> StubChain {
        let usdc = registry.address("USDC").unwrap();
        let weth = registry.address("WETH").unwrap();
        StubChain::new(1)
            .with_premium(registry.flash_loan_pool().unwrap(), 5)
            .with_pair(
                PAIR,
                PairState {
                    token0: usdc,
                    token1: weth,
                    reserve0: U256::from(1u64),
                    reserve1: U256::from(1u64),
                },
            )
            .with_pool(POOL, usdc, weth, 500)
            .with_pod(POD, &[weth])
    }

    fn route_config() -> RouteConfig {
        RouteConfig {
            name: "usdc-weth-pod".to_string(),
            loan_asset: "USDC".to_string(),
            loan_amount: "2500.5".to_string(),
            min_profit: "1".to_string(),
            legs: vec![
                LegConfig::V2 {
                    pool: "USDC_WETH_V2".to_string(),
                    token_in: "USDC".to_string(),
                    token_out: "WETH".to_string(),
                    fee_numerator: None,
                    fee_denominator: None,
                },
                LegConfig::Bond {
                    pod: "pWETH".to_string(),
                    token_in: "WETH".to_string(),
                    token_out: "pWETH".to_string(),
                    fee_bps: 10,
                },
                LegConfig::Debond {
                    pod: "pWETH".to_string(),
                    token_in: "pWETH".to_string(),
                    token_out: "WETH".to_string(),
                    fee_bps: 10,
                },
                LegConfig::V3 {
                    pool: "WETH_USDC_V3".to_string(),
                    token_in: "WETH".to_string(),
                    token_out: "USDC".to_string(),
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_resolves_fees_from_chain() {
        let registry = registry();
        let chain = chain(&registry);

        let route = resolve_route(&chain, &registry, &route_config()).await.unwrap();

        assert_eq!(route.flash_loan.premium_bps, 5);
        assert_eq!(route.flash_loan.amount.value(), U256::from(2_500_500_000u64));
        assert_eq!(route.min_profit, U256::from(1_000_000u64));
        assert_eq!(route.hop_count(), 4);
        assert_eq!(
            route.legs[0].kind,
            LegKind::ConstantProduct {
                pool: PAIR,
                fee: FeeRatio::UNISWAP_V2
            }
        );
        assert_eq!(
            route.legs[3].kind,
            LegKind::ConcentratedLiquidity {
                pool: POOL,
                fee_tier: 500
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_names_are_configuration_errors() {
        let registry = registry();
        let chain = chain(&registry);

        let mut config = route_config();
        config.loan_asset = "NOPE".to_string();
        let err = resolve_route(&chain, &registry, &config).await.unwrap_err();
        assert!(err.is_configuration());

        let mut config = route_config();
        config.legs[0] = LegConfig::V2 {
            pool: "MISSING_POOL".to_string(),
            token_in: "USDC".to_string(),
            token_out: "WETH".to_string(),
            fee_numerator: None,
            fee_denominator: None,
        };
        let err = resolve_route(&chain, &registry, &config).await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_raw_addresses_accepted_for_pools_and_pods_only() {
        let registry = registry();
        let chain = chain(&registry);

        let mut config = route_config();
        config.legs[0] = LegConfig::V2 {
            pool: format!("{:?}", PAIR),
            token_in: "USDC".to_string(),
            token_out: "WETH".to_string(),
            fee_numerator: None,
            fee_denominator: None,
        };
        config.legs[1] = LegConfig::Bond {
            pod: format!("{:?}", POD),
            token_in: "WETH".to_string(),
            token_out: "pWETH".to_string(),
            fee_bps: 10,
        };
        let route = resolve_route(&chain, &registry, &config).await.unwrap();
        assert_eq!(route.legs[0].kind.target(), PAIR);
        assert_eq!(route.legs[1].kind.target(), POD);

        // The loan asset needs registered decimals
        let mut config = route_config();
        config.loan_asset = format!("{:?}", registry.address("USDC").unwrap());
        let err = resolve_route(&chain, &registry, &config).await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_pool_with_wrong_tokens_rejected() {
        let registry = registry();
        let chain = chain(&registry);

        let mut config = route_config();
        config.legs[0] = LegConfig::V2 {
            pool: "USDC_WETH_V2".to_string(),
            token_in: "USDC".to_string(),
            token_out: "DAI".to_string(),
            fee_numerator: None,
            fee_denominator: None,
        };
        let err = resolve_route(&chain, &registry, &config).await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_pod_must_wrap_leg_tokens() {
        let registry = registry();

        // Pod does not hold WETH
        let dai_pod = chain(&registry).with_pod(POD, &[registry.address("DAI").unwrap()]);
        let err = resolve_route(&dai_pod, &registry, &route_config()).await.unwrap_err();
        assert!(err.is_configuration());

        // Bond output is not the pod share
        let chain = chain(&registry);
        let mut config = route_config();
        config.legs[1] = LegConfig::Bond {
            pod: "pWETH".to_string(),
            token_in: "WETH".to_string(),
            token_out: "DAI".to_string(),
            fee_bps: 10,
        };
        let err = resolve_route(&chain, &registry, &config).await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_malformed_route_is_validation_error() {
        let registry = registry();
        let chain = chain(&registry);

        // Too many fractional digits for USDC
        let mut config = route_config();
        config.loan_amount = "1.0000001".to_string();
        assert!(resolve_route(&chain, &registry, &config).await.unwrap_err().is_validation());

        // Does not return to USDC
        let mut config = route_config();
        config.legs.pop();
        assert!(resolve_route(&chain, &registry, &config).await.unwrap_err().is_validation());
    }
}
