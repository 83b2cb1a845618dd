//! Market snapshot: the plain numbers the estimator prices a route with

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Market data for one leg, already oriented to the leg's direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegMarket {
    /// Constant-product reserves, `reserve_in` is the leg's input token
    Reserves { reserve_in: U256, reserve_out: U256 },

    /// Quoter answer for exactly `amount_in`
    Quote { amount_in: U256, amount_out: U256 },

    /// Bond/debond needs no market data beyond the route's fee
    Wrap,
}

impl LegMarket {
    pub fn label(&self) -> &'static str {
        match self {
            LegMarket::Reserves { .. } => "reserves",
            LegMarket::Quote { .. } => "quote",
            LegMarket::Wrap => "wrap",
        }
    }
}

/// One entry per leg that was reached while capturing.
///
/// A capture that stopped at a degenerate pool or a zero output holds fewer
/// entries than the route has legs; the estimator stops at the same leg.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub block: Option<u64>,
    pub legs: Vec<LegMarket>,
}

impl MarketSnapshot {
    pub fn new(block: Option<u64>) -> Self {
        Self {
            block,
            legs: Vec::new(),
        }
    }

    pub fn push(&mut self, market: LegMarket) {
        self.legs.push(market);
    }
}
