//! Builds planner snapshots from raw on-chain reads.
//!
//! A keeper reads each market's params, state and stored rate at target together
//! with the vault's supply shares and cap. [`VaultData::assemble`] turns those
//! reads into a [`VaultData`] accrued to a single timestamp.

use std::collections::HashSet;

use alloy_primitives::{Address, U256};
use morpho_realloc_sim::{
    accrue_interest, apy_at_full_utilization, MarketParams, MarketState, RoundingDirection,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PlanError, Result};
use crate::types::{VaultData, VaultMarketData};

/// One vault market as read from chain, before accrual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVaultMarket {
    pub params: MarketParams,
    pub state: MarketState,
    #[serde(with = "morpho_realloc_sim::scalars::decimal_u256")]
    pub cap: U256,
    /// Supply shares held by the vault
    #[serde(with = "morpho_realloc_sim::scalars::decimal_u256")]
    pub supply_shares: U256,
    /// Rate at target stored by the IRM, zero if the market was never touched
    #[serde(default, with = "morpho_realloc_sim::scalars::decimal_u256")]
    pub rate_at_target: U256,
}

impl VaultMarketData {
    /// Accrues `raw` to `timestamp` and derives the vault's position in assets.
    ///
    /// The idle market has no IRM: its state only advances `last_update` and its
    /// rate fields stay empty.
    pub fn assemble(chain_id: u64, raw: RawVaultMarket, timestamp: u64) -> Result<Self> {
        let is_idle = raw.params.is_idle();
        let rate_at_target = (!is_idle).then_some(raw.rate_at_target);
        let accrued = accrue_interest(&raw.state, rate_at_target, timestamp)?;

        // Shares convert against the post-accrual totals, including fee shares
        let vault_assets = accrued
            .state
            .to_supply_assets(raw.supply_shares, RoundingDirection::Down);
        let apy_at_100_utilization = accrued
            .rate_at_target
            .map_or(U256::ZERO, apy_at_full_utilization);

        Ok(Self {
            chain_id,
            id: raw.params.id(),
            params: raw.params,
            state: accrued.state,
            cap: raw.cap,
            vault_assets,
            rate_at_target: accrued.rate_at_target,
            apy_at_100_utilization,
        })
    }
}

impl VaultData {
    /// Assembles a full snapshot, keeping the order of `markets`.
    ///
    /// # Errors
    ///
    /// - [`PlanError::DuplicateMarket`] if two reads share a market id
    /// - [`PlanError::Accrual`] if a market was updated after `timestamp`
    pub fn assemble(
        chain_id: u64,
        address: Address,
        timestamp: u64,
        markets: impl IntoIterator<Item = RawVaultMarket>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut assembled = Vec::new();

        for raw in markets {
            let market = VaultMarketData::assemble(chain_id, raw, timestamp)?;
            if !seen.insert(market.id) {
                return Err(PlanError::DuplicateMarket { market_id: market.id });
            }
            debug!(
                vault = %address,
                market_id = %market.id,
                vault_assets = %market.vault_assets,
                utilization = %market.state.utilization(),
                "Assembled vault market"
            );
            assembled.push(market);
        }

        Ok(Self {
            chain_id,
            address,
            timestamp,
            markets: assembled,
        })
    }
}
