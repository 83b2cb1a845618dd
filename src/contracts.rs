//! Contract interfaces
//!
//! The one place ABI shapes are declared. Everything that talks to a
//! contract encodes and decodes through these bindings.

use alloy_sol_types::sol;

sol! {
    /// ERC-20 token
    #[derive(Debug)]
    interface IERC20 {
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);

        event Transfer(address indexed from, address indexed to, uint256 value);
    }

    /// Uniswap V2 Pair (constant product)
    #[derive(Debug)]
    interface IUniswapV2Pair {
        function getReserves() external view returns (
            uint112 reserve0,
            uint112 reserve1,
            uint32 blockTimestampLast
        );
        function token0() external view returns (address);
        function token1() external view returns (address);
    }

    /// Uniswap V3 Pool (concentrated liquidity)
    #[derive(Debug)]
    interface IUniswapV3Pool {
        function fee() external view returns (uint24);
        function token0() external view returns (address);
        function token1() external view returns (address);
    }

    /// Uniswap V3 QuoterV2
    #[derive(Debug)]
    interface IQuoterV2 {
        struct QuoteExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint256 amountIn;
            uint24 fee;
            uint160 sqrtPriceLimitX96;
        }

        function quoteExactInputSingle(QuoteExactInputSingleParams memory params)
            external
            returns (
                uint256 amountOut,
                uint160 sqrtPriceX96After,
                uint32 initializedTicksCrossed,
                uint256 gasEstimate
            );
    }

    /// Aave V3 Pool (flash loans)
    #[derive(Debug)]
    interface IAavePool {
        function FLASHLOAN_PREMIUM_TOTAL() external view returns (uint128);

        function flashLoanSimple(
            address receiverAddress,
            address asset,
            uint256 amount,
            bytes calldata params,
            uint16 referralCode
        ) external;
    }

    /// Peapods pod (index vault). The pod is itself the share token; bond
    /// and debond run inside the executor, so only the asset check is read here.
    #[derive(Debug)]
    interface IPod {
        function isAsset(address token) external view returns (bool);
    }

    /// Deployed flash-loan receiver that runs the planned steps
    #[derive(Debug)]
    interface IFlashArbExecutor {
        struct Step {
            uint8 kind;
            address target;
            address tokenIn;
            address tokenOut;
            uint24 fee;
            uint256 minAmountOut;
        }

        event ArbitrageExecuted(
            address indexed asset,
            uint256 amount,
            uint256 premium,
            uint256 profit
        );

        error InsufficientProfit(uint256 realized, uint256 required);
    }
}

/// Step kinds understood by `IFlashArbExecutor`
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    UniswapV2 = 0,
    UniswapV3 = 1,
    PodBond = 2,
    PodDebond = 3,
}
