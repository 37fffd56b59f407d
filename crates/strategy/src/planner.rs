//! Allocation planner.
//!
//! # Overview
//!
//! [`find_reallocation`] turns a vault snapshot and a [`Policy`] into an optional
//! reallocation plan. It is a pure function: no state survives between calls.
//!
//! 1. Every lending market is accrued to the snapshot timestamp.
//! 2. **Pass 1** sizes the imbalance. Markets above their band can take deposits,
//!    markets below it can give up liquidity, and markets that cannot reach the
//!    policy's APY even at 100% utilization are drained ("push to saturation").
//!    The idle market absorbs whatever is left over.
//! 3. Nothing happens unless at least one market is outside its band by more than
//!    `min_delta_bps` (hysteresis).
//! 4. **Pass 2** walks the markets in the same order and emits concrete legs until
//!    `min(total withdrawable, total depositable)` has been moved. The deposit that
//!    takes the last of it is emitted as `U256::MAX` so rounding dust is re-supplied.
//! 5. Legs above their market's cap are dropped.
//!
//! Withdrawal legs always precede deposit legs.

use std::collections::HashSet;

use alloy_primitives::U256;
use morpho_realloc_sim::math::{bps_to_wad, min, mul_div_down};
use morpho_realloc_sim::{accrue_interest, get_utilization, MarketState};
use tracing::{debug, info};

use crate::error::{PlanError, Result};
use crate::policy::Policy;
use crate::types::{MarketAllocation, VaultData, VaultMarketData};

/// Share of the drainable liquidity withdrawn when pushing a market to saturation,
/// in percent. The remainder keeps the market strictly below 100% utilization.
const SATURATION_WITHDRAW_PERCENT: u64 = 99;

/// Pass 1 verdict for one market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    /// Utilization too high: can take `assets` more
    Deposit(U256),
    /// Utilization too low: can give up `assets`
    Withdraw(U256),
    /// Cannot reach the policy APY: drain `assets`
    Saturate(U256),
    Hold,
}

/// An eligible market after accrual and assessment.
#[derive(Debug, Clone, Copy)]
struct Assessment<'a> {
    market: &'a VaultMarketData,
    action: Action,
}

/// Computes a reallocation plan for `vault` under `policy`.
///
/// Returns `Ok(None)` when the vault is balanced enough or nothing can be moved.
///
/// # Errors
///
/// Returns a [`PlanError`] when the snapshot is inconsistent (see [`validate`]).
pub fn find_reallocation(vault: &VaultData, policy: &Policy) -> Result<Option<Vec<MarketAllocation>>> {
    validate(vault)?;

    let idle = vault.idle_market();

    // ==================== Accrual & eligibility ====================

    let mut eligible = Vec::new();
    for market in vault.markets.iter().filter(|m| !m.is_idle()) {
        let accrued = accrue_interest(
            &market.state,
            Some(market.rate_at_target.unwrap_or(U256::ZERO)),
            vault.timestamp,
        )?;
        let rate_at_target = accrued.rate_at_target.unwrap_or(U256::ZERO);

        if market.vault_assets.is_zero()
            || accrued.state.total_supply_assets.is_zero()
            || accrued.state.total_borrow_assets.is_zero()
        {
            debug!(market_id = %market.id, "Skipping market without position, supply or borrow");
            continue;
        }
        if policy.is_denied(market) {
            debug!(market_id = %market.id, collateral = %market.params.collateral_token, "Skipping denied collateral");
            continue;
        }

        eligible.push((market, accrued.state, rate_at_target));
    }

    let (total_supply, total_borrow) = eligible.iter().fold(
        (U256::ZERO, U256::ZERO),
        |(supply, borrow), (_, state, _)| {
            (
                supply.saturating_add(state.total_supply_assets),
                borrow.saturating_add(state.total_borrow_assets),
            )
        },
    );
    let average_utilization = get_utilization(total_supply, total_borrow);

    // ==================== Pass 1: sizing ====================

    let min_delta = bps_to_wad(policy.min_delta_bps);
    let mut threshold_exceeded = false;
    let mut total_withdrawable = U256::ZERO;
    let mut total_depositable = U256::ZERO;
    let mut assessments = Vec::with_capacity(eligible.len());

    for (market, state, rate_at_target) in &eligible {
        let action = match policy.saturation_apy(vault, market) {
            Some(threshold) if market.apy_at_100_utilization < threshold => {
                // Saturation always trips the gate, even when its own leg is dust
                threshold_exceeded = true;
                let assets = saturation_withdrawal(market, state);
                if assets.is_zero() || assets < policy.min_transfer_assets {
                    // Kept out of sizing since pass 2 could never emit it
                    debug!(market_id = %market.id, %assets, "Saturation withdrawal below transfer floor");
                    Action::Hold
                } else {
                    debug!(
                        market_id = %market.id,
                        apy_at_100_utilization = %market.apy_at_100_utilization,
                        %threshold,
                        %assets,
                        "Pushing market to saturation"
                    );
                    Action::Saturate(assets)
                }
            }
            _ => {
                let utilization = state.utilization();
                let bounds =
                    policy.utilization_bounds(vault, market, *rate_at_target, average_utilization);

                if utilization > bounds.upper {
                    let assets = state.get_supply_to_utilization(bounds.upper);
                    threshold_exceeded |= utilization - bounds.upper > min_delta;
                    debug!(market_id = %market.id, %utilization, upper = %bounds.upper, %assets, "Market above band");
                    Action::Deposit(assets)
                } else if utilization < bounds.lower {
                    let assets = min(
                        market.vault_assets,
                        state.get_withdraw_to_utilization(bounds.lower),
                    );
                    threshold_exceeded |= bounds.lower - utilization > min_delta;
                    debug!(market_id = %market.id, %utilization, lower = %bounds.lower, %assets, "Market below band");
                    Action::Withdraw(assets)
                } else {
                    debug!(market_id = %market.id, %utilization, "Market within band");
                    Action::Hold
                }
            }
        };

        match action {
            Action::Deposit(assets) => total_depositable = total_depositable.saturating_add(assets),
            Action::Withdraw(assets) | Action::Saturate(assets) => {
                total_withdrawable = total_withdrawable.saturating_add(assets);
            }
            Action::Hold => {}
        }

        assessments.push(Assessment { market, action });
    }

    // Idle absorbs the imbalance between both sides
    let mut idle_deposit = U256::ZERO;
    let mut idle_withdrawal = U256::ZERO;
    if let Some(idle) = idle.filter(|_| policy.allow_idle_reallocation) {
        if total_withdrawable > total_depositable {
            idle_deposit = min(total_withdrawable - total_depositable, idle.cap_headroom());
            total_depositable = total_depositable.saturating_add(idle_deposit);
        } else if total_depositable > total_withdrawable {
            idle_withdrawal = min(total_depositable - total_withdrawable, idle.vault_assets);
            total_withdrawable = total_withdrawable.saturating_add(idle_withdrawal);
        }
    }

    let to_reallocate = min(total_withdrawable, total_depositable);
    if to_reallocate.is_zero() {
        debug!(vault = %vault.address, %total_withdrawable, %total_depositable, "Nothing to reallocate");
        return Ok(None);
    }
    if !threshold_exceeded {
        debug!(vault = %vault.address, min_delta_bps = policy.min_delta_bps, "No market beyond the minimum delta");
        return Ok(None);
    }

    // ==================== Pass 2: allocation ====================

    let mut remaining_withdrawal = to_reallocate;
    let mut remaining_deposit = to_reallocate;
    let mut withdrawals = Vec::new();
    let mut deposits = Vec::new();

    for assessment in &assessments {
        if remaining_withdrawal.is_zero() && remaining_deposit.is_zero() {
            break;
        }

        let market = assessment.market;
        match assessment.action {
            Action::Saturate(assets) => {
                let withdrawn = min(assets, remaining_withdrawal);
                if withdrawn.is_zero() || withdrawn < policy.min_transfer_assets {
                    continue;
                }
                remaining_withdrawal -= withdrawn;
                withdrawals.push(MarketAllocation::new(
                    market.params,
                    market.vault_assets - withdrawn,
                ));
            }
            Action::Withdraw(assets) => {
                let withdrawn = min(assets, remaining_withdrawal);
                if withdrawn.is_zero() {
                    continue;
                }
                remaining_withdrawal -= withdrawn;
                withdrawals.push(MarketAllocation::new(
                    market.params,
                    market.vault_assets - withdrawn,
                ));
            }
            Action::Deposit(assets) => {
                let deposited = min(assets, remaining_deposit);
                if deposited.is_zero() {
                    continue;
                }
                let allocation = if deposited == remaining_deposit {
                    MarketAllocation::all_remaining(market.params)
                } else {
                    MarketAllocation::new(market.params, market.vault_assets.saturating_add(deposited))
                };
                remaining_deposit -= deposited;
                deposits.push(allocation);
            }
            Action::Hold => {}
        }
    }

    if let Some(idle) = idle {
        if !idle_withdrawal.is_zero() {
            withdrawals.push(MarketAllocation::new(
                idle.params,
                idle.vault_assets - idle_withdrawal,
            ));
        }
        if !idle_deposit.is_zero() {
            if deposits.iter().any(MarketAllocation::is_sentinel) {
                deposits.push(MarketAllocation::new(
                    idle.params,
                    idle.vault_assets.saturating_add(idle_deposit),
                ));
            } else {
                deposits.push(MarketAllocation::all_remaining(idle.params));
            }
        }
    }

    let plan = finalize(vault, withdrawals, deposits);
    match &plan {
        Some(allocations) => info!(
            vault = %vault.address,
            chain = %vault.chain(),
            legs = allocations.len(),
            %to_reallocate,
            "Reallocation planned"
        ),
        None => debug!(vault = %vault.address, "Plan collapsed after cap filtering"),
    }

    Ok(plan)
}

/// Checks that a snapshot is internally consistent.
///
/// # Errors
///
/// - [`PlanError::ChainMismatch`] if a market is on another chain than the vault
/// - [`PlanError::MarketIdMismatch`] if a market id is not the hash of its params
/// - [`PlanError::DuplicateMarket`] if a market appears twice
/// - [`PlanError::StaleTimestamp`] if a market was updated after the snapshot
/// - [`PlanError::CapBelowPosition`] if the vault holds more than a market's cap
pub fn validate(vault: &VaultData) -> Result<()> {
    let mut seen = HashSet::with_capacity(vault.markets.len());

    for market in &vault.markets {
        if market.chain_id != vault.chain_id {
            return Err(PlanError::ChainMismatch {
                market_id: market.id,
                market_chain_id: market.chain_id,
                vault_chain_id: vault.chain_id,
            });
        }

        let computed = market.params.id();
        if computed != market.id {
            return Err(PlanError::MarketIdMismatch {
                declared: market.id,
                computed,
            });
        }

        if !seen.insert(market.id) {
            return Err(PlanError::DuplicateMarket { market_id: market.id });
        }

        if market.state.last_update > vault.timestamp {
            return Err(PlanError::StaleTimestamp {
                market_id: market.id,
                last_update: market.state.last_update,
                timestamp: vault.timestamp,
            });
        }

        if market.vault_assets > market.cap {
            return Err(PlanError::CapBelowPosition {
                market_id: market.id,
                cap: market.cap,
                vault_assets: market.vault_assets,
            });
        }
    }

    Ok(())
}

/// Liquidity a saturating market gives up: 99% of what the vault can pull out.
fn saturation_withdrawal(market: &VaultMarketData, state: &MarketState) -> U256 {
    mul_div_down(
        min(market.vault_assets, state.liquidity()),
        U256::from(SATURATION_WITHDRAW_PERCENT),
        U256::from(100),
    )
}

/// Drops legs above their market's cap and discards plans that no longer move
/// liquidity between two sides.
fn finalize(
    vault: &VaultData,
    withdrawals: Vec<MarketAllocation>,
    deposits: Vec<MarketAllocation>,
) -> Option<Vec<MarketAllocation>> {
    let within_cap = |allocation: &MarketAllocation| {
        if allocation.is_sentinel() {
            return true;
        }
        let id = allocation.market_id();
        match vault.market(&id) {
            Some(market) if allocation.assets > market.cap => {
                debug!(market_id = %id, assets = %allocation.assets, cap = %market.cap, "Dropping leg above cap");
                false
            }
            _ => true,
        }
    };

    let withdrawals: Vec<_> = withdrawals.into_iter().filter(|a| within_cap(a)).collect();
    let deposits: Vec<_> = deposits.into_iter().filter(|a| within_cap(a)).collect();

    if withdrawals.is_empty() || deposits.is_empty() {
        return None;
    }

    let mut plan = withdrawals;
    plan.extend(deposits);

    // A plan only shuffling idle liquidity into idle is a no-op
    if plan.iter().all(|a| a.market_params.is_idle()) {
        return None;
    }

    Some(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{ApyRangePolicy, MinimumRatePolicy, Strategy};
    use crate::types::ApyRangeConfig;
    use alloy_primitives::{address, Address};
    use rust_decimal::Decimal;
    use morpho_realloc_sim::{MarketParams, SimError, INITIAL_RATE_AT_TARGET};

    const LOAN: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");

    fn params(collateral: u8) -> MarketParams {
        MarketParams {
            loan_token: LOAN,
            collateral_token: Address::with_last_byte(collateral),
            oracle: Address::with_last_byte(0xAA),
            irm: Address::with_last_byte(0xBB),
            lltv: U256::from(860_000_000_000_000_000u64),
        }
    }

    fn market(collateral: u8, supply: u64, borrow: u64, vault_assets: u64) -> VaultMarketData {
        let params = params(collateral);
        VaultMarketData {
            chain_id: 1,
            id: params.id(),
            params,
            state: MarketState {
                total_supply_assets: U256::from(supply),
                total_supply_shares: U256::from(supply) * U256::from(1_000_000u64),
                total_borrow_assets: U256::from(borrow),
                total_borrow_shares: U256::from(borrow) * U256::from(1_000_000u64),
                last_update: 1_000,
                fee: U256::ZERO,
            },
            cap: U256::MAX,
            vault_assets: U256::from(vault_assets),
            rate_at_target: Some(INITIAL_RATE_AT_TARGET),
            apy_at_100_utilization: U256::MAX,
        }
    }

    fn idle(vault_assets: u64, cap: U256) -> VaultMarketData {
        let params = MarketParams::idle(LOAN);
        VaultMarketData {
            chain_id: 1,
            id: params.id(),
            params,
            state: MarketState {
                total_supply_assets: U256::from(vault_assets),
                total_supply_shares: U256::from(vault_assets) * U256::from(1_000_000u64),
                last_update: 1_000,
                ..MarketState::default()
            },
            cap,
            vault_assets: U256::from(vault_assets),
            rate_at_target: None,
            apy_at_100_utilization: U256::ZERO,
        }
    }

    fn vault(markets: Vec<VaultMarketData>) -> VaultData {
        VaultData {
            chain_id: 1,
            address: Address::with_last_byte(0x01),
            timestamp: 1_000,
            markets,
        }
    }

    fn equalize() -> Policy {
        Policy::new(Strategy::EqualizeUtilization).with_min_delta_bps(25)
    }

    #[test]
    fn test_validate_duplicate_market() {
        let m = market(1, 1_000, 500, 1_000);
        let result = find_reallocation(&vault(vec![m.clone(), m.clone()]), &equalize());
        assert_eq!(result, Err(PlanError::DuplicateMarket { market_id: m.id }));
    }

    #[test]
    fn test_validate_market_id_mismatch() {
        let mut m = market(1, 1_000, 500, 1_000);
        m.id = params(2).id();
        let result = validate(&vault(vec![m]));
        assert!(matches!(result, Err(PlanError::MarketIdMismatch { .. })));
    }

    #[test]
    fn test_validate_cap_below_position() {
        let mut m = market(1, 1_000, 500, 1_000);
        m.cap = U256::from(999u64);
        let result = validate(&vault(vec![m]));
        assert!(matches!(result, Err(PlanError::CapBelowPosition { .. })));
    }

    #[test]
    fn test_validate_stale_timestamp() {
        let mut m = market(1, 1_000, 500, 1_000);
        m.state.last_update = 2_000;
        let result = validate(&vault(vec![m]));
        assert!(matches!(result, Err(PlanError::StaleTimestamp { last_update: 2_000, timestamp: 1_000, .. })));
    }

    #[test]
    fn test_validate_chain_mismatch() {
        let mut m = market(1, 1_000, 500, 1_000);
        m.chain_id = 8453;
        let result = validate(&vault(vec![m]));
        assert!(matches!(result, Err(PlanError::ChainMismatch { market_chain_id: 8453, .. })));
    }

    #[test]
    fn test_accrual_error_is_propagated() {
        // Unreachable through validate; accrual still guards its own input
        let state = MarketState {
            last_update: 10,
            ..MarketState::default()
        };
        let result = accrue_interest(&state, Some(U256::ZERO), 5).map_err(PlanError::from);
        assert!(matches!(result, Err(PlanError::Accrual(SimError::InvalidInterestAccrual { .. }))));
    }

    #[test]
    fn test_no_plan_for_single_market() {
        let plan = find_reallocation(&vault(vec![market(1, 10_000, 9_000, 10_000)]), &equalize()).unwrap();
        assert_eq!(plan, None);
    }

    #[test]
    fn test_no_plan_for_empty_vault() {
        assert_eq!(find_reallocation(&vault(vec![]), &equalize()).unwrap(), None);
    }

    #[test]
    fn test_ineligible_markets_are_skipped() {
        // Zero borrow and zero position markets cannot be rebalanced
        let markets = vec![
            market(1, 10_000, 9_000, 10_000),
            market(2, 10_000, 0, 10_000),
            market(3, 10_000, 1_000, 0),
        ];
        assert_eq!(find_reallocation(&vault(markets), &equalize()).unwrap(), None);
    }

    #[test]
    fn test_denied_collateral_is_skipped() {
        let hot = market(1, 10_000_000_000, 9_000_000_000, 10_000_000_000);
        let cold = market(2, 10_000_000_000, 2_000_000_000, 10_000_000_000);
        let policy = equalize().with_denied_collateral(vec![cold.params.collateral_token]);
        assert_eq!(find_reallocation(&vault(vec![hot, cold]), &policy).unwrap(), None);
    }

    #[test]
    fn test_withdrawals_precede_deposits() {
        let markets = vec![
            market(1, 10_000_000_000, 9_000_000_000, 10_000_000_000),
            market(2, 10_000_000_000, 2_000_000_000, 10_000_000_000),
        ];
        let plan = find_reallocation(&vault(markets.clone()), &equalize()).unwrap().unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].market_params, markets[1].params);
        assert!(plan[0].assets < markets[1].vault_assets);
        assert_eq!(plan[1].market_params, markets[0].params);
        assert!(plan[1].is_sentinel());
    }

    #[test]
    fn test_idle_absorbs_surplus_withdrawal() {
        // Only an under-utilized market: freed liquidity goes to idle
        let policy = Policy::new(Strategy::MinimumRate(MinimumRatePolicy {
            min_apy: U256::from(40_000_000_000_000_000u64),
        }));
        let mut cold = market(1, 10_000_000_000, 2_000_000_000, 10_000_000_000);
        cold.apy_at_100_utilization = U256::MAX;
        let markets = vec![cold.clone(), idle(0, U256::MAX)];

        let plan = find_reallocation(&vault(markets), &policy).unwrap().unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].market_params, cold.params);
        assert!(plan[1].market_params.is_idle());
        assert!(plan[1].is_sentinel());
    }

    fn apy_range_2_to_5() -> Policy {
        let range = ApyRangeConfig::new(Decimal::from(2), Decimal::from(5)).unwrap();
        Policy::new(Strategy::ApyRange(ApyRangePolicy::new(range).unwrap()))
    }

    #[test]
    fn test_idle_funds_shortfall() {
        let hot = market(1, 10_000_000_000, 9_500_000_000, 5_000_000_000);
        let policy = apy_range_2_to_5();
        let markets = vec![hot.clone(), idle(50_000_000_000, U256::MAX)];

        let plan = find_reallocation(&vault(markets), &policy).unwrap().unwrap();
        assert_eq!(plan.len(), 2);
        assert!(plan[0].market_params.is_idle());
        assert!(plan[0].assets < U256::from(50_000_000_000u64));
        assert_eq!(plan[1].market_params, hot.params);
        assert!(plan[1].is_sentinel());
    }

    #[test]
    fn test_idle_disabled_means_no_plan() {
        let hot = market(1, 10_000_000_000, 9_500_000_000, 5_000_000_000);
        let policy = apy_range_2_to_5().with_allow_idle_reallocation(false);
        let markets = vec![hot, idle(50_000_000_000, U256::MAX)];
        assert_eq!(find_reallocation(&vault(markets), &policy).unwrap(), None);
    }

    #[test]
    fn test_finalize_drops_capped_deposit() {
        let cold = market(1, 10_000, 2_000, 10_000);
        let mut hot = market(2, 10_000, 9_000, 10_000);
        hot.cap = U256::from(10_500u64);
        let idle_market = idle(0, U256::MAX);
        let snapshot = vault(vec![cold.clone(), hot.clone(), idle_market.clone()]);

        let plan = finalize(
            &snapshot,
            vec![MarketAllocation::new(cold.params, U256::from(4_000u64))],
            vec![
                MarketAllocation::new(hot.params, U256::from(11_000u64)),
                MarketAllocation::all_remaining(idle_market.params),
            ],
        )
        .unwrap();

        assert_eq!(plan.len(), 2);
        assert!(plan.iter().all(|a| a.market_params != hot.params));
    }

    #[test]
    fn test_finalize_collapses_one_sided_plan() {
        let cold = market(1, 10_000, 2_000, 10_000);
        let mut hot = market(2, 10_000, 9_000, 10_000);
        hot.cap = U256::from(10_500u64);
        let snapshot = vault(vec![cold.clone(), hot.clone()]);

        let plan = finalize(
            &snapshot,
            vec![MarketAllocation::new(cold.params, U256::from(4_000u64))],
            vec![MarketAllocation::new(hot.params, U256::from(11_000u64))],
        );
        assert_eq!(plan, None);
    }

    #[test]
    fn test_finalize_rejects_idle_only_plan() {
        let idle_market = idle(1_000, U256::MAX);
        let snapshot = vault(vec![idle_market.clone()]);
        let plan = finalize(
            &snapshot,
            vec![MarketAllocation::new(idle_market.params, U256::from(500u64))],
            vec![MarketAllocation::all_remaining(idle_market.params)],
        );
        assert_eq!(plan, None);
    }

    #[test]
    fn test_saturation_withdrawal_keeps_buffer() {
        let m = market(1, 10_000, 2_000, 6_000);
        // min(6_000, 8_000) * 99%
        assert_eq!(saturation_withdrawal(&m, &m.state), U256::from(5_940u64));
    }
}
