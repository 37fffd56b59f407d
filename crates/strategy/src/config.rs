//! Operator configuration.
//!
//! A [`StrategyConfig`] is loaded from TOML, validated once, and turned into an
//! immutable [`Policy`] per strategy:
//!
//! ```toml
//! allow_idle_reallocation = true
//! min_delta_bps = 25
//! min_transfer_assets = "1000000"
//! denied_collateral = []
//!
//! [default_apy_range]
//! min = 3.0
//! max = 8.0
//!
//! [minimum_rate]
//! min_apy = 4.0
//!
//! [[chains]]
//! chain_id = 1
//! default_apy_range = { min = 3.5, max = 7.0 }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use alloy_primitives::{Address, U256};
use morpho_realloc_sim::percent_to_wad;
use morpho_realloc_sim::scalars::decimal_u256;
use morpho_realloc_sim::MarketId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::policy::{
    ApyRangePolicy, MinimumRatePolicy, Policy, Strategy, DEFAULT_MIN_DELTA_BPS,
    DEFAULT_MIN_TRANSFER_ASSETS,
};
use crate::types::ApyRangeConfig;

/// Upper bound for `min_delta_bps`: 100% utilization.
pub const MAX_MIN_DELTA_BPS: u32 = 10_000;

/// Which strategy a [`Policy`] should be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    Equalize,
    ApyRange,
    MinRate,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Equalize => "equalize",
            Self::ApyRange => "apy-range",
            Self::MinRate => "min-rate",
        };
        f.write_str(name)
    }
}

/// Root configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Let the idle market absorb surpluses and fund shortfalls
    #[serde(default = "default_allow_idle")]
    pub allow_idle_reallocation: bool,

    /// Hysteresis threshold (basis points of utilization)
    #[serde(default = "default_min_delta_bps")]
    pub min_delta_bps: u32,

    /// Smallest push-to-saturation withdrawal, in loan token units
    #[serde(default = "default_min_transfer_assets", with = "decimal_u256")]
    pub min_transfer_assets: U256,

    /// Collateral tokens whose markets are never touched
    #[serde(default)]
    pub denied_collateral: Vec<Address>,

    /// Global APY band for the apy-range strategy
    #[serde(default)]
    pub default_apy_range: Option<ApyRangeConfig>,

    /// Settings for the min-rate strategy
    #[serde(default)]
    pub minimum_rate: Option<MinimumRateConfig>,

    /// Per-chain overrides
    #[serde(default)]
    pub chains: Vec<ChainConfig>,
}

/// Minimum borrow APY, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimumRateConfig {
    pub min_apy: Decimal,
}

/// Overrides for one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    #[serde(default)]
    pub default_apy_range: Option<ApyRangeConfig>,
    #[serde(default)]
    pub vaults: Vec<VaultOverride>,
    #[serde(default)]
    pub markets: Vec<MarketOverride>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultOverride {
    pub address: Address,
    pub apy_range: ApyRangeConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketOverride {
    pub market_id: MarketId,
    pub apy_range: ApyRangeConfig,
}

fn default_allow_idle() -> bool {
    true
}

fn default_min_delta_bps() -> u32 {
    DEFAULT_MIN_DELTA_BPS
}

fn default_min_transfer_assets() -> U256 {
    DEFAULT_MIN_TRANSFER_ASSETS
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            allow_idle_reallocation: default_allow_idle(),
            min_delta_bps: DEFAULT_MIN_DELTA_BPS,
            min_transfer_assets: DEFAULT_MIN_TRANSFER_ASSETS,
            denied_collateral: Vec::new(),
            default_apy_range: None,
            minimum_rate: None,
            chains: Vec::new(),
        }
    }
}

impl StrategyConfig {
    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        content.parse()
    }

    /// Checks ranges, thresholds and duplicate overrides.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_delta_bps > MAX_MIN_DELTA_BPS {
            return Err(invalid(
                "min_delta_bps",
                format!("{} exceeds {MAX_MIN_DELTA_BPS}", self.min_delta_bps),
            ));
        }

        if let Some(range) = &self.default_apy_range {
            range.validate("default_apy_range")?;
        }

        if let Some(minimum) = &self.minimum_rate {
            if minimum.min_apy.is_sign_negative() {
                return Err(invalid("minimum_rate.min_apy", "must not be negative"));
            }
        }

        let mut chains = HashSet::new();
        for chain in &self.chains {
            if !chains.insert(chain.chain_id) {
                return Err(invalid(
                    "chains",
                    format!("chain {} is configured twice", chain.chain_id),
                ));
            }
            chain.validate()?;
        }

        Ok(())
    }

    /// Builds the policy for `kind`.
    ///
    /// `ApyRange` requires `default_apy_range`; `MinRate` requires `minimum_rate`.
    pub fn policy(&self, kind: StrategyKind) -> Result<Policy, ConfigError> {
        let strategy = match kind {
            StrategyKind::Equalize => Strategy::EqualizeUtilization,
            StrategyKind::ApyRange => Strategy::ApyRange(self.apy_range_policy()?),
            StrategyKind::MinRate => {
                let minimum = self
                    .minimum_rate
                    .ok_or_else(|| invalid("minimum_rate", "required by the min-rate strategy"))?;
                let min_apy = percent_to_wad(minimum.min_apy)
                    .ok_or_else(|| invalid("minimum_rate.min_apy", "must be a non-negative percentage"))?;
                Strategy::MinimumRate(MinimumRatePolicy { min_apy })
            }
        };

        Ok(Policy::new(strategy)
            .with_allow_idle_reallocation(self.allow_idle_reallocation)
            .with_min_delta_bps(self.min_delta_bps)
            .with_min_transfer_assets(self.min_transfer_assets)
            .with_denied_collateral(self.denied_collateral.clone()))
    }

    fn apy_range_policy(&self) -> Result<ApyRangePolicy, ConfigError> {
        let default_range = self
            .default_apy_range
            .ok_or_else(|| invalid("default_apy_range", "required by the apy-range strategy"))?;

        let mut policy = ApyRangePolicy::new(default_range)?;
        for chain in &self.chains {
            if let Some(range) = chain.default_apy_range {
                policy = policy.with_chain_range(chain.chain_id, range)?;
            }
            for vault in &chain.vaults {
                policy = policy.with_vault_range(chain.chain_id, vault.address, vault.apy_range)?;
            }
            for market in &chain.markets {
                policy = policy.with_market_range(chain.chain_id, market.market_id, market.apy_range)?;
            }
        }
        Ok(policy)
    }
}

impl std::str::FromStr for StrategyConfig {
    type Err = ConfigError;

    /// Parses and validates TOML content.
    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

impl ChainConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(range) = &self.default_apy_range {
            range.validate(&format!("chain {}", self.chain_id))?;
        }

        let mut vaults = HashSet::new();
        for vault in &self.vaults {
            if !vaults.insert(vault.address) {
                return Err(invalid(
                    "vaults",
                    format!("vault {} is configured twice on chain {}", vault.address, self.chain_id),
                ));
            }
            vault
                .apy_range
                .validate(&format!("vault {} on chain {}", vault.address, self.chain_id))?;
        }

        let mut markets = HashSet::new();
        for market in &self.markets {
            if !markets.insert(market.market_id) {
                return Err(invalid(
                    "markets",
                    format!("market {} is configured twice on chain {}", market.market_id, self.chain_id),
                ));
            }
            market
                .apy_range
                .validate(&format!("market {} on chain {}", market.market_id, self.chain_id))?;
        }

        Ok(())
    }
}

fn invalid(name: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParameter {
        name: name.to_string(),
        reason: reason.into(),
    }
}
