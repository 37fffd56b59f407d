//! Replays a reallocation plan against a vault snapshot.
//!
//! Legs are applied in order with MetaMorpho's `reallocate` semantics: a leg whose
//! target is below the current position withdraws the difference, a leg above it
//! supplies the difference, and a `U256::MAX` leg supplies everything withdrawn so
//! far that has not been supplied yet. The plan must move exactly as much as it
//! withdraws.
//!
//! Positions are tracked in assets. Interest the vault earns between a market's
//! `last_update` and the snapshot timestamp is not credited to `vault_assets`.

use alloy_primitives::U256;
use morpho_realloc_sim::scalars::decimal_u256;
use morpho_realloc_sim::{accrue_interest, MarketId};
use serde::Serialize;

use crate::error::SimulationError;
use crate::planner::validate;
use crate::types::{MarketAllocation, VaultData};

/// Position and utilization of one market before and after a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketChange {
    pub market_id: MarketId,
    pub is_idle: bool,
    #[serde(with = "decimal_u256")]
    pub vault_assets_before: U256,
    #[serde(with = "decimal_u256")]
    pub vault_assets_after: U256,
    #[serde(with = "decimal_u256")]
    pub utilization_before: U256,
    #[serde(with = "decimal_u256")]
    pub utilization_after: U256,
}

/// Result of applying a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReallocationOutcome {
    /// The snapshot after accrual and reallocation
    pub vault: VaultData,
    pub total_withdrawn: U256,
    pub total_supplied: U256,
    /// One entry per market, in vault order
    pub changes: Vec<MarketChange>,
}

/// Applies `plan` to `vault` and returns the resulting snapshot.
///
/// Every market is first accrued to `vault.timestamp`.
///
/// # Errors
///
/// - [`SimulationError::Plan`] if the snapshot is inconsistent
/// - [`SimulationError::MarketNotFound`] if a leg targets an unknown market
/// - [`SimulationError::Market`] if a withdrawal exceeds market liquidity
/// - [`SimulationError::SupplyCapExceeded`] if a deposit exceeds the cap
/// - [`SimulationError::InconsistentReallocation`] if supplied != withdrawn
pub fn apply_plan(
    vault: &VaultData,
    plan: &[MarketAllocation],
) -> Result<ReallocationOutcome, SimulationError> {
    validate(vault)?;

    let mut sim = vault.clone();
    for market in &mut sim.markets {
        let rate_at_target = if market.is_idle() {
            None
        } else {
            Some(market.rate_at_target.unwrap_or(U256::ZERO))
        };
        let accrued = accrue_interest(&market.state, rate_at_target, vault.timestamp)?;
        market.state = accrued.state;
        market.rate_at_target = accrued.rate_at_target;
    }
    let before = sim.clone();

    let mut total_withdrawn = U256::ZERO;
    let mut total_supplied = U256::ZERO;

    for allocation in plan {
        let market_id = allocation.market_id();
        let market = sim
            .markets
            .iter_mut()
            .find(|m| m.id == market_id)
            .ok_or(SimulationError::MarketNotFound { market_id })?;

        let current = market.vault_assets;
        let withdrawn = current.saturating_sub(allocation.assets);

        if !withdrawn.is_zero() {
            let (state, _) = market.state.withdraw(market_id, withdrawn)?;
            market.state = state;
            market.vault_assets = current - withdrawn;
            total_withdrawn = total_withdrawn.saturating_add(withdrawn);
            continue;
        }

        let supplied = if allocation.is_sentinel() {
            total_withdrawn.saturating_sub(total_supplied)
        } else {
            allocation.assets.saturating_sub(current)
        };
        if supplied.is_zero() {
            continue;
        }

        let position = current.saturating_add(supplied);
        if position > market.cap {
            return Err(SimulationError::SupplyCapExceeded {
                market_id,
                cap: market.cap,
                assets: position,
            });
        }

        let (state, _) = market.state.supply(supplied);
        market.state = state;
        market.vault_assets = position;
        total_supplied = total_supplied.saturating_add(supplied);
    }

    if total_withdrawn != total_supplied {
        return Err(SimulationError::InconsistentReallocation {
            supplied: total_supplied,
            withdrawn: total_withdrawn,
        });
    }

    let changes = before
        .markets
        .iter()
        .zip(&sim.markets)
        .map(|(old, new)| MarketChange {
            market_id: new.id,
            is_idle: new.is_idle(),
            vault_assets_before: old.vault_assets,
            vault_assets_after: new.vault_assets,
            utilization_before: old.state.utilization(),
            utilization_after: new.state.utilization(),
        })
        .collect();

    Ok(ReallocationOutcome {
        vault: sim,
        total_withdrawn,
        total_supplied,
        changes,
    })
}
