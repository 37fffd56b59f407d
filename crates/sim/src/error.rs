//! Error types for the simulation library.

use alloy_primitives::U256;
use thiserror::Error;

use crate::market::MarketId;

/// Errors that can occur during simulation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// Interest accrual was attempted with a timestamp before the last update
    #[error("Invalid interest accrual: timestamp {timestamp} is before last update {last_update}")]
    InvalidInterestAccrual { timestamp: u64, last_update: u64 },

    /// Insufficient liquidity in market
    #[error("Insufficient liquidity in market {market_id}: requested {requested}, available {available}")]
    InsufficientMarketLiquidity {
        market_id: MarketId,
        requested: U256,
        available: U256,
    },
}
