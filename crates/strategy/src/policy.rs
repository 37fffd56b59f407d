//! Reallocation policies.
//!
//! A [`Policy`] is an immutable value describing how a vault's markets should be
//! balanced. The three strategies only differ in how they derive per-market
//! [`UtilizationBounds`]; everything else (hysteresis, idle handling, denylist) is
//! shared.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use morpho_realloc_sim::{apy_to_utilization, MarketId, WAD};

use crate::error::ConfigError;
use crate::types::{ApyRangeConfig, VaultData, VaultMarketData};

/// Default hysteresis threshold, in basis points of utilization.
pub const DEFAULT_MIN_DELTA_BPS: u32 = 25;

/// Default floor below which push-to-saturation withdrawals are skipped.
pub const DEFAULT_MIN_TRANSFER_ASSETS: U256 = U256::from_limbs([1_000_000, 0, 0, 0]);

/// Target utilization band of one market, WAD-scaled, `lower <= upper`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtilizationBounds {
    pub lower: U256,
    pub upper: U256,
}

impl UtilizationBounds {
    /// A single target utilization.
    pub fn exact(target: U256) -> Self {
        Self {
            lower: target,
            upper: target,
        }
    }

    pub fn contains(&self, utilization: U256) -> bool {
        utilization >= self.lower && utilization <= self.upper
    }
}

/// Borrow APY band as WAD-scaled values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApyBand {
    pub min: U256,
    pub max: U256,
}

impl TryFrom<ApyRangeConfig> for ApyBand {
    type Error = ConfigError;

    fn try_from(range: ApyRangeConfig) -> Result<Self, Self::Error> {
        range.validate("range")?;
        let (min, max) = range.to_wad()?;
        Ok(Self { min, max })
    }
}

/// APY band resolution: market override, then vault override, then chain default,
/// then global default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApyRangePolicy {
    default_band: ApyBand,
    chain_bands: HashMap<u64, ApyBand>,
    vault_bands: HashMap<(u64, Address), ApyBand>,
    market_bands: HashMap<(u64, MarketId), ApyBand>,
}

impl ApyRangePolicy {
    pub fn new(default_range: ApyRangeConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            default_band: ApyBand::try_from(default_range)?,
            chain_bands: HashMap::new(),
            vault_bands: HashMap::new(),
            market_bands: HashMap::new(),
        })
    }

    pub fn with_chain_range(mut self, chain_id: u64, range: ApyRangeConfig) -> Result<Self, ConfigError> {
        self.chain_bands.insert(chain_id, ApyBand::try_from(range)?);
        Ok(self)
    }

    pub fn with_vault_range(
        mut self,
        chain_id: u64,
        vault: Address,
        range: ApyRangeConfig,
    ) -> Result<Self, ConfigError> {
        self.vault_bands.insert((chain_id, vault), ApyBand::try_from(range)?);
        Ok(self)
    }

    pub fn with_market_range(
        mut self,
        chain_id: u64,
        market_id: MarketId,
        range: ApyRangeConfig,
    ) -> Result<Self, ConfigError> {
        self.market_bands.insert((chain_id, market_id), ApyBand::try_from(range)?);
        Ok(self)
    }

    /// The band that applies to `market_id` in `vault` on `chain_id`.
    pub fn resolve(&self, chain_id: u64, vault: Address, market_id: MarketId) -> ApyBand {
        self.market_bands
            .get(&(chain_id, market_id))
            .or_else(|| self.vault_bands.get(&(chain_id, vault)))
            .or_else(|| self.chain_bands.get(&chain_id))
            .copied()
            .unwrap_or(self.default_band)
    }
}

/// Keep every market's borrow APY above a floor; never deposits into a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinimumRatePolicy {
    /// Minimum borrow APY (WAD)
    pub min_apy: U256,
}

/// How target utilizations are derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Drive every market to the vault-wide utilization.
    EqualizeUtilization,
    /// Keep each market's borrow APY inside an operator-defined band.
    ApyRange(ApyRangePolicy),
    /// Keep each market's borrow APY above a minimum.
    MinimumRate(MinimumRatePolicy),
}

/// Everything the planner needs to know about operator intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub strategy: Strategy,
    /// Let the idle market absorb surpluses and fund shortfalls.
    pub allow_idle_reallocation: bool,
    /// A market must be this many basis points outside its band to trigger a plan.
    pub min_delta_bps: u32,
    /// Push-to-saturation withdrawals below this amount are skipped.
    pub min_transfer_assets: U256,
    /// Markets with these collateral tokens are never touched.
    pub denied_collateral: Vec<Address>,
}

impl Policy {
    /// A policy with default thresholds.
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            allow_idle_reallocation: true,
            min_delta_bps: DEFAULT_MIN_DELTA_BPS,
            min_transfer_assets: DEFAULT_MIN_TRANSFER_ASSETS,
            denied_collateral: Vec::new(),
        }
    }

    pub fn with_allow_idle_reallocation(mut self, allow: bool) -> Self {
        self.allow_idle_reallocation = allow;
        self
    }

    pub fn with_min_delta_bps(mut self, bps: u32) -> Self {
        self.min_delta_bps = bps;
        self
    }

    pub fn with_min_transfer_assets(mut self, assets: U256) -> Self {
        self.min_transfer_assets = assets;
        self
    }

    pub fn with_denied_collateral(mut self, collateral: Vec<Address>) -> Self {
        self.denied_collateral = collateral;
        self
    }

    pub fn is_denied(&self, market: &VaultMarketData) -> bool {
        self.denied_collateral.contains(&market.params.collateral_token)
    }

    /// Utilization band for `market`.
    ///
    /// `rate_at_target` is the market's accrued rate at target, `average_utilization`
    /// the vault-wide utilization over the eligible markets.
    pub fn utilization_bounds(
        &self,
        vault: &VaultData,
        market: &VaultMarketData,
        rate_at_target: U256,
        average_utilization: U256,
    ) -> UtilizationBounds {
        match &self.strategy {
            Strategy::EqualizeUtilization => UtilizationBounds::exact(average_utilization),
            Strategy::ApyRange(ranges) => {
                let band = ranges.resolve(market.chain_id, vault.address, market.id);
                UtilizationBounds {
                    lower: apy_to_utilization(band.min, rate_at_target),
                    upper: apy_to_utilization(band.max, rate_at_target),
                }
            }
            Strategy::MinimumRate(minimum) => UtilizationBounds {
                lower: apy_to_utilization(minimum.min_apy, rate_at_target),
                upper: WAD,
            },
        }
    }

    /// APY a market must be able to reach at 100% utilization to be balanced
    /// normally. Markets that cannot are pushed to saturation instead.
    pub fn saturation_apy(&self, vault: &VaultData, market: &VaultMarketData) -> Option<U256> {
        match &self.strategy {
            Strategy::EqualizeUtilization => None,
            Strategy::ApyRange(ranges) => {
                Some(ranges.resolve(market.chain_id, vault.address, market.id).max)
            }
            Strategy::MinimumRate(minimum) => Some(minimum.min_apy),
        }
    }
}
