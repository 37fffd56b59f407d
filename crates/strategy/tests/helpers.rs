//! Snapshot builders for strategy integration tests.

use alloy_primitives::{Address, U256};
use morpho_realloc_sim::{MarketParams, MarketState, INITIAL_RATE_AT_TARGET};
use morpho_realloc_strategy::{VaultData, VaultMarketData};

/// One loan token unit with six decimals.
pub const UNIT: u64 = 1_000_000;

pub const LOAN: Address = Address::with_last_byte(0x01);
pub const TIMESTAMP: u64 = 1_700_000_000;

pub fn units(n: u64) -> U256 {
    U256::from(n) * U256::from(UNIT)
}

/// APY in whole percent, WAD-scaled.
pub fn percent(p: u64) -> U256 {
    U256::from(p) * U256::from(10_000_000_000_000_000u64)
}

pub fn params(collateral: u8) -> MarketParams {
    MarketParams {
        loan_token: LOAN,
        collateral_token: Address::with_last_byte(collateral),
        oracle: Address::with_last_byte(0xAA),
        irm: Address::with_last_byte(0xBB),
        lltv: U256::from(860_000_000_000_000_000u64),
    }
}

fn state(supply: U256, borrow: U256) -> MarketState {
    MarketState {
        total_supply_assets: supply,
        total_supply_shares: supply * U256::from(1_000_000u64),
        total_borrow_assets: borrow,
        total_borrow_shares: borrow * U256::from(1_000_000u64),
        last_update: TIMESTAMP,
        fee: U256::ZERO,
    }
}

/// Lending market at its initial rate at target, uncapped, able to reach any APY.
pub fn market(collateral: u8, supply: U256, borrow: U256, vault_assets: U256) -> VaultMarketData {
    let params = params(collateral);
    VaultMarketData {
        chain_id: 1,
        id: params.id(),
        params,
        state: state(supply, borrow),
        cap: U256::MAX,
        vault_assets,
        rate_at_target: Some(INITIAL_RATE_AT_TARGET),
        apy_at_100_utilization: U256::MAX,
    }
}

pub fn idle_market(vault_assets: U256) -> VaultMarketData {
    let params = MarketParams::idle(LOAN);
    VaultMarketData {
        chain_id: 1,
        id: params.id(),
        params,
        state: state(vault_assets, U256::ZERO),
        cap: U256::MAX,
        vault_assets,
        rate_at_target: None,
        apy_at_100_utilization: U256::ZERO,
    }
}

pub fn vault(markets: Vec<VaultMarketData>) -> VaultData {
    VaultData {
        chain_id: 1,
        address: Address::with_last_byte(0xFE),
        timestamp: TIMESTAMP,
        markets,
    }
}

/// Absolute difference between two WAD values.
pub fn distance(a: U256, b: U256) -> U256 {
    if a > b {
        a - b
    } else {
        b - a
    }
}
