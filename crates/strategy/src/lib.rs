//! Liquidity reallocation planning for Morpho vaults.
//!
//! Given a [`VaultData`] snapshot and a [`Policy`], [`find_reallocation`] decides
//! whether liquidity should move between the vault's markets and, if so, emits
//! the [`MarketAllocation`] list a MetaMorpho `reallocate` call expects.
//!
//! # Overview
//!
//! - [`types`] - vault snapshots and allocation legs
//! - [`policy`] - the three balancing strategies and their thresholds
//! - [`planner`] - the two-pass planner
//! - [`simulate`] - replays a plan against a snapshot
//! - [`assembly`] - builds snapshots from raw chain reads
//! - [`config`] - TOML operator configuration
//!
//! # Example
//!
//! ```rust
//! use morpho_realloc_strategy::{find_reallocation, Policy, Strategy, VaultData};
//! use alloy_primitives::Address;
//!
//! let vault = VaultData {
//!     chain_id: 1,
//!     address: Address::ZERO,
//!     timestamp: 0,
//!     markets: vec![],
//! };
//! let policy = Policy::new(Strategy::EqualizeUtilization);
//! assert_eq!(find_reallocation(&vault, &policy).unwrap(), None);
//! ```

pub mod assembly;
pub mod config;
pub mod error;
pub mod planner;
pub mod policy;
pub mod simulate;
pub mod types;

pub use assembly::RawVaultMarket;
pub use config::{
    ChainConfig, MarketOverride, MinimumRateConfig, StrategyConfig, StrategyKind, VaultOverride,
};
pub use error::{ConfigError, PlanError, Result, SimulationError};
pub use planner::{find_reallocation, validate};
pub use policy::{
    ApyBand, ApyRangePolicy, MinimumRatePolicy, Policy, Strategy, UtilizationBounds,
    DEFAULT_MIN_DELTA_BPS, DEFAULT_MIN_TRANSFER_ASSETS,
};
pub use simulate::{apply_plan, MarketChange, ReallocationOutcome};
pub use types::{ApyRangeConfig, MarketAllocation, VaultData, VaultMarketData};
