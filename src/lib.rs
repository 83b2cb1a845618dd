//! podarb - flash-loan arbitrage through Peapods pod tokens
//!
//! Borrow an asset, walk it through DEX swaps and pod bond/debond legs, and
//! repay the loan in the same transaction. The crate prices routes off live
//! market data, plans the executor call, and sends it when the mode allows.

pub mod amount;
pub mod chain;
pub mod config;
pub mod contracts;
pub mod error;
pub mod estimator;
pub mod executor;
pub mod monitor;
pub mod registry;
pub mod tokens;
