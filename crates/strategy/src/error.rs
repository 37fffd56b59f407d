//! Error types for planning and configuration.

use std::path::PathBuf;

use alloy_primitives::U256;
use morpho_realloc_sim::{MarketId, SimError};
use rust_decimal::Decimal;
use thiserror::Error;

/// Result alias for planner operations.
pub type Result<T, E = PlanError> = std::result::Result<T, E>;

/// Inconsistent vault snapshots, rejected before any planning happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// The same market appears twice in a vault
    #[error("Market {market_id} appears more than once in the vault")]
    DuplicateMarket { market_id: MarketId },

    /// The declared market id does not hash from its params
    #[error("Market id {declared} does not match its params (expected {computed})")]
    MarketIdMismatch { declared: MarketId, computed: MarketId },

    /// The vault holds more than its cap allows
    #[error("Market {market_id}: vault position {vault_assets} exceeds cap {cap}")]
    CapBelowPosition {
        market_id: MarketId,
        cap: U256,
        vault_assets: U256,
    },

    /// A market was last updated after the snapshot timestamp
    #[error("Market {market_id} was updated at {last_update}, after the snapshot timestamp {timestamp}")]
    StaleTimestamp {
        market_id: MarketId,
        last_update: u64,
        timestamp: u64,
    },

    /// A market belongs to another chain than its vault
    #[error("Market {market_id} is on chain {market_chain_id} but the vault is on chain {vault_chain_id}")]
    ChainMismatch {
        market_id: MarketId,
        market_chain_id: u64,
        vault_chain_id: u64,
    },

    /// Interest accrual failed
    #[error(transparent)]
    Accrual(#[from] SimError),
}

/// Errors raised while replaying a plan against a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    /// A leg targets a market the vault does not supply to
    #[error("Market {market_id} not found in vault allocations")]
    MarketNotFound { market_id: MarketId },

    /// A deposit would push the vault above the market cap
    #[error("Supply cap exceeded for market {market_id}: cap is {cap}, position would be {assets}")]
    SupplyCapExceeded {
        market_id: MarketId,
        cap: U256,
        assets: U256,
    },

    /// Total supplied differs from total withdrawn
    #[error("Inconsistent reallocation: supplied {supplied}, withdrawn {withdrawn}")]
    InconsistentReallocation { supplied: U256, withdrawn: U256 },

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Market(#[from] SimError),
}

/// Errors raised while loading or validating a strategy configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// APY ranges must satisfy `0 <= min < max`
    #[error("Invalid APY range [{min}%, {max}%] for {scope}")]
    InvalidApyRange {
        scope: String,
        min: Decimal,
        max: Decimal,
    },

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },
}
