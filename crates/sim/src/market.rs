//! Market parameters, state and interest accrual for Morpho Blue markets.
//!
//! # Overview
//!
//! A Morpho Blue market is an isolated lending pool identified by the hash of its
//! [`MarketParams`]. Its [`MarketState`] tracks:
//! - **Supply side**: total assets lent and the shares representing them
//! - **Borrow side**: total assets borrowed and the debt shares
//! - **Accrual bookkeeping**: last accrual timestamp and protocol fee
//!
//! Interest accrues lazily. [`accrue_interest`] brings a state forward to a given
//! timestamp exactly like `Morpho._accrueInterest`, using the Adaptive Curve IRM
//! replica in [`crate::irm`].
//!
//! # Example
//!
//! ```rust
//! use morpho_realloc_sim::market::{accrue_interest, MarketState};
//! use morpho_realloc_sim::irm::INITIAL_RATE_AT_TARGET;
//! use morpho_realloc_sim::math::WAD;
//! use alloy_primitives::U256;
//!
//! let state = MarketState {
//!     total_supply_assets: U256::from(1_000_000) * WAD,
//!     total_supply_shares: U256::from(1_000_000_000_000u64) * WAD,
//!     total_borrow_assets: U256::from(800_000) * WAD,
//!     total_borrow_shares: U256::from(800_000_000_000u64) * WAD,
//!     last_update: 1_000,
//!     fee: U256::ZERO,
//! };
//!
//! let accrued = accrue_interest(&state, Some(INITIAL_RATE_AT_TARGET), 1_000 + 86_400).unwrap();
//! assert!(accrued.interest > U256::ZERO);
//! assert_eq!(accrued.state.last_update, 1_000 + 86_400);
//! ```

use alloy_primitives::{keccak256, Address, FixedBytes, U256};
use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::irm::get_borrow_rate;
use crate::math::{
    assets_to_shares, shares_to_assets, w_div_down, w_div_up, w_mul_down, w_taylor_compounded,
    zero_floor_sub, RoundingDirection,
};
use crate::scalars::decimal_u256;

/// 32-byte market identifier (keccak256 of the ABI-encoded market params)
pub type MarketId = FixedBytes<32>;

/// Immutable parameters defining a Morpho Blue market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketParams {
    /// Token lent and borrowed
    pub loan_token: Address,
    /// Token posted as collateral; zero for the idle market
    pub collateral_token: Address,
    pub oracle: Address,
    /// Interest rate model; zero for the idle market
    pub irm: Address,
    /// Liquidation loan-to-value (WAD-scaled)
    #[serde(with = "decimal_u256")]
    pub lltv: U256,
}

impl MarketParams {
    /// Idle market for a loan token: no collateral, oracle, IRM or LLTV.
    pub fn idle(loan_token: Address) -> Self {
        Self {
            loan_token,
            collateral_token: Address::ZERO,
            oracle: Address::ZERO,
            irm: Address::ZERO,
            lltv: U256::ZERO,
        }
    }

    /// Computes the market id, `keccak256(abi.encode(params))`.
    pub fn id(&self) -> MarketId {
        let mut encoded = Vec::with_capacity(5 * 32);
        encoded.extend_from_slice(self.loan_token.into_word().as_slice());
        encoded.extend_from_slice(self.collateral_token.into_word().as_slice());
        encoded.extend_from_slice(self.oracle.into_word().as_slice());
        encoded.extend_from_slice(self.irm.into_word().as_slice());
        encoded.extend_from_slice(&self.lltv.to_be_bytes::<32>());
        keccak256(&encoded)
    }

    /// The idle market holds undeployed vault liquidity and earns nothing.
    pub fn is_idle(&self) -> bool {
        self.collateral_token == Address::ZERO
    }
}

/// Mutable totals of a Morpho Blue market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketState {
    /// The amount of loan assets supplied in total on the market
    #[serde(with = "decimal_u256")]
    pub total_supply_assets: U256,
    /// The total supply shares representing lender positions
    #[serde(with = "decimal_u256")]
    pub total_supply_shares: U256,
    /// The amount of loan assets borrowed in total from the market
    #[serde(with = "decimal_u256")]
    pub total_borrow_assets: U256,
    /// The total borrow shares representing borrower debt
    #[serde(with = "decimal_u256")]
    pub total_borrow_shares: U256,
    /// The block timestamp (in seconds) when interest was last accrued
    pub last_update: u64,
    /// The protocol fee percentage (WAD-scaled, e.g., 0.1 WAD = 10%)
    #[serde(with = "decimal_u256")]
    pub fee: U256,
}

impl MarketState {
    /// Returns the market's current liquidity (supply - borrow)
    pub fn liquidity(&self) -> U256 {
        zero_floor_sub(self.total_supply_assets, self.total_borrow_assets)
    }

    /// Returns the market's utilization rate (WAD-scaled)
    pub fn utilization(&self) -> U256 {
        get_utilization(self.total_supply_assets, self.total_borrow_assets)
    }

    /// Convert supply shares to assets
    pub fn to_supply_assets(&self, shares: U256, rounding: RoundingDirection) -> U256 {
        shares_to_assets(
            shares,
            self.total_supply_assets,
            self.total_supply_shares,
            rounding,
        )
    }

    /// Convert assets to supply shares
    pub fn to_supply_shares(&self, assets: U256, rounding: RoundingDirection) -> U256 {
        assets_to_shares(
            assets,
            self.total_supply_assets,
            self.total_supply_shares,
            rounding,
        )
    }

    /// Supplies `assets` without accruing first.
    ///
    /// Returns the new state and the shares minted (rounded down).
    pub fn supply(&self, assets: U256) -> (MarketState, U256) {
        let shares = self.to_supply_shares(assets, RoundingDirection::Down);
        let mut market = *self;
        market.total_supply_assets = market.total_supply_assets.saturating_add(assets);
        market.total_supply_shares = market.total_supply_shares.saturating_add(shares);
        (market, shares)
    }

    /// Withdraws `assets` without accruing first.
    ///
    /// Returns the new state and the shares burned (rounded up).
    ///
    /// # Errors
    ///
    /// - [`SimError::InsufficientMarketLiquidity`] if `assets > liquidity()`
    pub fn withdraw(&self, market_id: MarketId, assets: U256) -> Result<(MarketState, U256), SimError> {
        if assets > self.liquidity() {
            return Err(SimError::InsufficientMarketLiquidity {
                market_id,
                requested: assets,
                available: self.liquidity(),
            });
        }

        let shares = self.to_supply_shares(assets, RoundingDirection::Up);
        let mut market = *self;
        market.total_supply_assets -= assets;
        market.total_supply_shares = zero_floor_sub(market.total_supply_shares, shares);
        Ok((market, shares))
    }

    // ==================== Utilization Targeting ====================

    /// Returns the smallest volume to supply until the market reaches the target utilization
    pub fn get_supply_to_utilization(&self, target_utilization: U256) -> U256 {
        get_supply_to_utilization(
            self.total_supply_assets,
            self.total_borrow_assets,
            target_utilization,
        )
    }

    /// Returns the amount to withdraw until the market reaches the target utilization
    pub fn get_withdraw_to_utilization(&self, target_utilization: U256) -> U256 {
        get_withdraw_to_utilization(
            self.total_supply_assets,
            self.total_borrow_assets,
            target_utilization,
        )
    }
}

/// A market state brought forward to a timestamp, with the accrual by-products.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccruedMarket {
    /// State after accrual; `last_update` equals the accrual timestamp
    pub state: MarketState,
    /// Rate at target after adaptation, `None` for markets without an IRM
    pub rate_at_target: Option<U256>,
    /// Average borrow rate applied over the accrued period
    pub avg_borrow_rate: U256,
    /// Instantaneous borrow rate at the accrual timestamp
    pub borrow_rate: U256,
    /// Interest added to both supply and borrow totals
    pub interest: U256,
    /// Supply shares minted to the fee recipient
    pub fee_shares: U256,
}

/// Accrues interest on a market up to the given timestamp.
///
/// # How Interest Accrual Works
///
/// 1. Calculate elapsed time since `last_update`
/// 2. Compute the average borrow rate over the period using the IRM
/// 3. Calculate interest: `total_borrow * (e^(rate * time) - 1)` (3-term Taylor series)
/// 4. Add interest to both `total_supply_assets` and `total_borrow_assets`
/// 5. Mint fee shares: `fee_amount * shares / (total_assets - fee_amount)`
/// 6. Advance `rate_at_target`, even when nothing is borrowed
///
/// # Arguments
///
/// * `state` - Market totals at `state.last_update`
/// * `rate_at_target` - Stored rate at target. `None` for markets without an IRM
///   (the idle market), which accrue nothing. `Some(U256::ZERO)` means the IRM was
///   never initialized for this market.
/// * `timestamp` - Unix timestamp in seconds. Must be >= `last_update`.
///
/// # Errors
///
/// - [`SimError::InvalidInterestAccrual`] if `timestamp < last_update`
pub fn accrue_interest(
    state: &MarketState,
    rate_at_target: Option<U256>,
    timestamp: u64,
) -> Result<AccruedMarket, SimError> {
    if timestamp < state.last_update {
        return Err(SimError::InvalidInterestAccrual {
            timestamp,
            last_update: state.last_update,
        });
    }

    let elapsed = timestamp - state.last_update;

    let Some(start_rate_at_target) = rate_at_target else {
        let mut state = *state;
        state.last_update = timestamp;
        return Ok(AccruedMarket {
            state,
            rate_at_target: None,
            avg_borrow_rate: U256::ZERO,
            borrow_rate: U256::ZERO,
            interest: U256::ZERO,
            fee_shares: U256::ZERO,
        });
    };

    let rates = get_borrow_rate(state.utilization(), start_rate_at_target, elapsed);

    if elapsed == 0 {
        return Ok(AccruedMarket {
            state: *state,
            rate_at_target: Some(start_rate_at_target),
            avg_borrow_rate: rates.avg_borrow_rate,
            borrow_rate: rates.end_borrow_rate,
            interest: U256::ZERO,
            fee_shares: U256::ZERO,
        });
    }

    let AccruedInterest { interest, fee_shares } = get_accrued_interest(
        rates.avg_borrow_rate,
        state.total_supply_assets,
        state.total_borrow_assets,
        state.total_supply_shares,
        state.fee,
        elapsed,
    );

    Ok(AccruedMarket {
        state: MarketState {
            total_supply_assets: state.total_supply_assets.saturating_add(interest),
            total_supply_shares: state.total_supply_shares.saturating_add(fee_shares),
            total_borrow_assets: state.total_borrow_assets.saturating_add(interest),
            total_borrow_shares: state.total_borrow_shares,
            last_update: timestamp,
            fee: state.fee,
        },
        rate_at_target: Some(rates.end_rate_at_target),
        avg_borrow_rate: rates.avg_borrow_rate,
        borrow_rate: rates.end_borrow_rate,
        interest,
        fee_shares,
    })
}

/// Result of interest accrual calculation
struct AccruedInterest {
    /// Total interest accrued
    interest: U256,
    /// Fee shares minted to the protocol
    fee_shares: U256,
}

// ==================== Utility Functions ====================

/// Calculate the utilization rate (WAD-scaled). Zero when nothing is supplied.
pub fn get_utilization(total_supply_assets: U256, total_borrow_assets: U256) -> U256 {
    if total_supply_assets.is_zero() {
        return U256::ZERO;
    }
    w_div_down(total_borrow_assets, total_supply_assets)
}

/// Calculate the interest accrued on a market
fn get_accrued_interest(
    borrow_rate: U256,
    total_supply_assets: U256,
    total_borrow_assets: U256,
    total_supply_shares: U256,
    fee: U256,
    elapsed: u64,
) -> AccruedInterest {
    let interest = w_mul_down(
        total_borrow_assets,
        w_taylor_compounded(borrow_rate, U256::from(elapsed)),
    );

    if fee.is_zero() || interest.is_zero() {
        return AccruedInterest {
            interest,
            fee_shares: U256::ZERO,
        };
    }

    let fee_amount = w_mul_down(interest, fee);

    // Shares are priced on the supply after interest, before the fee is minted
    let fee_shares = assets_to_shares(
        fee_amount,
        zero_floor_sub(total_supply_assets.saturating_add(interest), fee_amount),
        total_supply_shares,
        RoundingDirection::Down,
    );

    AccruedInterest {
        interest,
        fee_shares,
    }
}

/// Returns the smallest volume to supply until the market reaches the target utilization
pub fn get_supply_to_utilization(
    total_supply_assets: U256,
    total_borrow_assets: U256,
    target_utilization: U256,
) -> U256 {
    if target_utilization.is_zero() {
        if get_utilization(total_supply_assets, total_borrow_assets).is_zero() {
            return U256::ZERO;
        }
        return U256::MAX;
    }

    zero_floor_sub(
        w_div_up(total_borrow_assets, target_utilization),
        total_supply_assets,
    )
}

/// Returns the amount to withdraw until the market reaches the target utilization
pub fn get_withdraw_to_utilization(
    total_supply_assets: U256,
    total_borrow_assets: U256,
    target_utilization: U256,
) -> U256 {
    if target_utilization.is_zero() {
        if total_borrow_assets.is_zero() {
            return total_supply_assets;
        }
        return U256::ZERO;
    }

    zero_floor_sub(
        total_supply_assets,
        w_div_up(total_borrow_assets, target_utilization),
    )
}
