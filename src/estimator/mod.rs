//! The Estimator
//!
//! Responsible for:
//! - Describing routes (flash loan + legs)
//! - Integer swap/fee math
//! - Pricing a route against a market snapshot, without touching the chain

pub mod math;
mod profit;
mod route;
mod snapshot;

pub use math::FeeRatio;
pub use profit::{apply_leg, LegStep, ProfitEstimator, ProfitabilityResult, Verdict};
pub use route::{ArbitrageRoute, FlashLoan, LegKind, SwapLeg};
pub use snapshot::{LegMarket, MarketSnapshot};
