//! Morpho Blue market math for reallocation planning
//!
//! This crate replicates, bit for bit, the parts of Morpho Blue that decide how a
//! market reacts to liquidity moving in or out of it.
//!
//! # Overview
//!
//! - [`math`] - WAD fixed-point arithmetic with 512-bit intermediates
//! - [`irm`] - the Adaptive Curve interest rate model
//! - [`market`] - market params, ids, state and interest accrual
//! - [`rates`] - conversions between rates, APYs and utilizations
//! - [`scalars`] - serde helpers for 256-bit amounts
//!
//! # Example
//!
//! ```rust
//! use morpho_realloc_sim::{apy_to_utilization, INITIAL_RATE_AT_TARGET, WAD};
//! use alloy_primitives::U256;
//!
//! // Utilization at which a fresh market pays a 5% borrow APY
//! let five_percent = U256::from(50_000_000_000_000_000u64);
//! let utilization = apy_to_utilization(five_percent, INITIAL_RATE_AT_TARGET);
//! assert!(utilization > U256::ZERO && utilization < WAD);
//! ```

pub mod error;
pub mod irm;
pub mod market;
pub mod math;
pub mod rates;
pub mod scalars;

// Re-export commonly used types
pub use error::SimError;

// Market exports
pub use market::{
    accrue_interest, get_supply_to_utilization, get_utilization, get_withdraw_to_utilization,
    AccruedMarket, MarketId, MarketParams, MarketState,
};

// Math exports
pub use math::{RoundingDirection, SECONDS_PER_YEAR, WAD};

// Rate conversion exports
pub use rates::{
    apy_at_full_utilization, apy_to_rate, apy_to_utilization, percent_to_wad, rate_to_apy,
    rate_to_utilization, utilization_to_rate, wad_to_percent,
};

// IRM exports
pub use irm::{
    get_borrow_rate, w_exp, BorrowRateResult, ADJUSTMENT_SPEED, CURVE_STEEPNESS,
    INITIAL_RATE_AT_TARGET, MAX_RATE_AT_TARGET, MIN_RATE_AT_TARGET, TARGET_UTILIZATION,
};
