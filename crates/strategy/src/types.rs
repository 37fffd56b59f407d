//! Type definitions for the strategy crate.
//!
//! A [`VaultData`] is the planner's entire view of one vault: every market it supplies
//! to, pre-accrued to a common timestamp. A plan is a list of [`MarketAllocation`]s in
//! the shape of MetaMorpho's `reallocate` call.

use alloy_chains::Chain;
use alloy_primitives::{Address, U256};
use morpho_realloc_sim::scalars::{decimal_u256, option_decimal_u256};
use morpho_realloc_sim::{percent_to_wad, MarketId, MarketParams, MarketState};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One market as seen from one vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultMarketData {
    /// Chain the market lives on.
    pub chain_id: u64,
    /// Market id, the hash of `params`.
    pub id: MarketId,
    pub params: MarketParams,
    /// Market totals, accrued up to the snapshot timestamp.
    pub state: MarketState,
    /// Maximum assets the vault may hold in this market.
    #[serde(with = "decimal_u256")]
    pub cap: U256,
    /// Assets the vault currently supplies to this market.
    #[serde(with = "decimal_u256")]
    pub vault_assets: U256,
    /// Persistent IRM adaptation state. `None` for the idle market.
    #[serde(default, with = "option_decimal_u256")]
    pub rate_at_target: Option<U256>,
    /// Borrow APY the market would pay at 100% utilization (WAD). Required:
    /// a missing value would read as 0 and mark every market as saturating.
    #[serde(with = "decimal_u256")]
    pub apy_at_100_utilization: U256,
}

impl VaultMarketData {
    /// Whether this is the vault's idle market.
    pub fn is_idle(&self) -> bool {
        self.params.is_idle()
    }

    /// Room left under the cap.
    pub fn cap_headroom(&self) -> U256 {
        self.cap.saturating_sub(self.vault_assets)
    }
}

/// Snapshot of a vault and all of its markets at a single timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultData {
    pub chain_id: u64,
    /// Vault contract address.
    pub address: Address,
    /// Reference "now" for interest accrual, in seconds.
    pub timestamp: u64,
    /// Markets in withdraw/supply walk order.
    pub markets: Vec<VaultMarketData>,
}

impl VaultData {
    /// Chain the vault is deployed on.
    pub fn chain(&self) -> Chain {
        Chain::from_id(self.chain_id)
    }

    /// The vault's idle market, if it has one.
    pub fn idle_market(&self) -> Option<&VaultMarketData> {
        self.markets.iter().find(|m| m.is_idle())
    }

    /// Looks up a market by id.
    pub fn market(&self, id: &MarketId) -> Option<&VaultMarketData> {
        self.markets.iter().find(|m| &m.id == id)
    }

    /// Total assets the vault has supplied across its markets.
    pub fn total_assets(&self) -> U256 {
        self.markets
            .iter()
            .fold(U256::ZERO, |acc, m| acc.saturating_add(m.vault_assets))
    }
}

/// Target position of the vault in one market after reallocation.
///
/// Mirrors MetaMorpho's `MarketAllocation`: `assets` is the position the vault should
/// hold, not a delta. `U256::MAX` asks the vault to supply everything withdrawn so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketAllocation {
    pub market_params: MarketParams,
    #[serde(with = "decimal_u256")]
    pub assets: U256,
}

impl MarketAllocation {
    /// Allocation with a concrete target position.
    pub fn new(market_params: MarketParams, assets: U256) -> Self {
        Self {
            market_params,
            assets,
        }
    }

    /// Allocation that supplies all remaining withdrawn liquidity.
    pub fn all_remaining(market_params: MarketParams) -> Self {
        Self {
            market_params,
            assets: U256::MAX,
        }
    }

    /// Whether this is the "supply everything left" sentinel.
    pub fn is_sentinel(&self) -> bool {
        self.assets == U256::MAX
    }

    pub fn market_id(&self) -> MarketId {
        self.market_params.id()
    }
}

/// Borrow APY band in percent, e.g. `{ min: 3.0, max: 8.0 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApyRangeConfig {
    pub min: Decimal,
    pub max: Decimal,
}

impl ApyRangeConfig {
    /// Creates a validated range. Rejects `min < 0` and `min >= max`.
    pub fn new(min: Decimal, max: Decimal) -> Result<Self, ConfigError> {
        let range = Self { min, max };
        range.validate("range")?;
        Ok(range)
    }

    /// Checks `0 <= min < max`; `scope` names the range in the error.
    pub fn validate(&self, scope: &str) -> Result<(), ConfigError> {
        if self.min.is_sign_negative() || self.min >= self.max {
            return Err(ConfigError::InvalidApyRange {
                scope: scope.to_string(),
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    /// The range as WAD-scaled APYs.
    pub fn to_wad(&self) -> Result<(U256, U256), ConfigError> {
        let invalid = || ConfigError::InvalidApyRange {
            scope: "range".to_string(),
            min: self.min,
            max: self.max,
        };
        let min = percent_to_wad(self.min).ok_or_else(invalid)?;
        let max = percent_to_wad(self.max).ok_or_else(invalid)?;
        Ok((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use rust_decimal_macros::dec;

    fn sample_market(collateral: Address) -> VaultMarketData {
        let params = MarketParams {
            loan_token: address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
            collateral_token: collateral,
            oracle: Address::ZERO,
            irm: Address::ZERO,
            lltv: U256::ZERO,
        };
        VaultMarketData {
            chain_id: 1,
            id: params.id(),
            params,
            state: MarketState::default(),
            cap: U256::from(1_000u64),
            vault_assets: U256::from(400u64),
            rate_at_target: None,
            apy_at_100_utilization: U256::ZERO,
        }
    }

    #[test]
    fn test_vault_idle_market_lookup() {
        let idle = sample_market(Address::ZERO);
        let lending = sample_market(address!("7f39C581F595B53c5cb19bD0b3f8dA6c935E2Ca0"));
        let vault = VaultData {
            chain_id: 1,
            address: Address::ZERO,
            timestamp: 0,
            markets: vec![lending.clone(), idle.clone()],
        };

        assert_eq!(vault.idle_market(), Some(&idle));
        assert_eq!(vault.market(&lending.id), Some(&lending));
        assert_eq!(vault.total_assets(), U256::from(800u64));
        assert_eq!(vault.chain().id(), 1);
    }

    #[test]
    fn test_cap_headroom() {
        let mut market = sample_market(Address::ZERO);
        assert_eq!(market.cap_headroom(), U256::from(600u64));
        market.vault_assets = U256::from(2_000u64);
        assert_eq!(market.cap_headroom(), U256::ZERO);
    }

    #[test]
    fn test_market_allocation_sentinel() {
        let params = MarketParams::idle(Address::ZERO);
        assert!(MarketAllocation::all_remaining(params).is_sentinel());
        assert!(!MarketAllocation::new(params, U256::from(5u64)).is_sentinel());
    }

    #[test]
    fn test_apy_range_validation() {
        assert!(ApyRangeConfig::new(dec!(3), dec!(8)).is_ok());
        assert!(ApyRangeConfig::new(dec!(0), dec!(0.5)).is_ok());
        assert!(matches!(
            ApyRangeConfig::new(dec!(8), dec!(8)),
            Err(ConfigError::InvalidApyRange { .. })
        ));
        assert!(ApyRangeConfig::new(dec!(9), dec!(8)).is_err());
        assert!(ApyRangeConfig::new(dec!(-1), dec!(8)).is_err());
    }

    #[test]
    fn test_apy_range_to_wad() {
        let range = ApyRangeConfig::new(dec!(3), dec!(8.5)).unwrap();
        let (min, max) = range.to_wad().unwrap();
        assert_eq!(min, U256::from(30_000_000_000_000_000u64));
        assert_eq!(max, U256::from(85_000_000_000_000_000u64));
    }

    #[test]
    fn test_allocation_json_shape() {
        let allocation = MarketAllocation::new(MarketParams::idle(Address::ZERO), U256::from(42u64));
        let json = serde_json::to_value(allocation).unwrap();
        assert_eq!(json["assets"], "42");
        assert!(json["marketParams"]["loanToken"].is_string());
    }

    #[test]
    fn test_market_json_requires_apy_at_full_utilization() {
        let mut json = serde_json::to_value(sample_market(Address::ZERO)).unwrap();
        assert!(serde_json::from_value::<VaultMarketData>(json.clone()).is_ok());

        json.as_object_mut().unwrap().remove("apyAt100Utilization");
        let result = serde_json::from_value::<VaultMarketData>(json);
        assert!(result.unwrap_err().to_string().contains("apyAt100Utilization"));
    }
}
