//! Conversions between per-second borrow rates, APYs and utilizations.
//!
//! APYs are compounded with the same truncated Taylor series the protocol uses for
//! accrual, so an APY computed here is exactly what a borrower pays over a year at a
//! constant rate. The inverse conversions let operators express policy in APY terms
//! and have it turned into utilization targets for a given `rate_at_target`.
//!
//! # Example
//!
//! ```rust
//! use morpho_realloc_sim::irm::{INITIAL_RATE_AT_TARGET, TARGET_UTILIZATION};
//! use morpho_realloc_sim::rates::{rate_to_utilization, utilization_to_rate};
//!
//! let rate = utilization_to_rate(TARGET_UTILIZATION, INITIAL_RATE_AT_TARGET);
//! assert_eq!(rate, INITIAL_RATE_AT_TARGET);
//! assert_eq!(rate_to_utilization(rate, INITIAL_RATE_AT_TARGET), TARGET_UTILIZATION);
//! ```

use alloy_primitives::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::irm::{get_borrow_rate, CURVE_STEEPNESS, INITIAL_RATE_AT_TARGET, TARGET_UTILIZATION};
use crate::math::{w_div_down, w_mul_down, w_taylor_compounded, SECONDS_PER_YEAR, WAD};

/// WAD per percentage point (1e16)
const WAD_PER_PERCENT: u64 = 10_000_000_000_000_000;

/// Annualizes a per-second rate: `e^(rate * year) - 1`, 3-term Taylor series.
pub fn rate_to_apy(rate: U256) -> U256 {
    w_taylor_compounded(rate, SECONDS_PER_YEAR)
}

/// Largest per-second rate whose [`rate_to_apy`] does not exceed `apy`.
///
/// `rate_to_apy` is non-decreasing and at least `rate * SECONDS_PER_YEAR`, so the
/// answer lies in `[0, apy / SECONDS_PER_YEAR]` and is found by bisection.
pub fn apy_to_rate(apy: U256) -> U256 {
    let mut low = U256::ZERO;
    let mut high = apy / SECONDS_PER_YEAR + U256::from(1);

    while high - low > U256::from(1) {
        let mid = low + (high - low) / U256::from(2);
        if rate_to_apy(mid) <= apy {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

/// Instantaneous borrow rate of the Adaptive Curve IRM at `utilization`.
///
/// A zero `rate_at_target` stands for a market whose IRM was never initialized.
pub fn utilization_to_rate(utilization: U256, rate_at_target: U256) -> U256 {
    get_borrow_rate(utilization, rate_at_target, 0).end_borrow_rate
}

/// Utilization at which the IRM curve yields `rate`, clamped to `[0, WAD]`.
///
/// Rates at or below `rate_at_target / 4` map to 0 and rates at or above
/// `4 * rate_at_target` map to 100%.
pub fn rate_to_utilization(rate: U256, rate_at_target: U256) -> U256 {
    let rate_at_target = if rate_at_target.is_zero() {
        INITIAL_RATE_AT_TARGET
    } else {
        rate_at_target
    };

    let max_rate = w_mul_down(rate_at_target, CURVE_STEEPNESS);
    let min_rate = w_div_down(rate_at_target, CURVE_STEEPNESS);

    if rate >= max_rate {
        return WAD;
    }
    if rate <= min_rate {
        return U256::ZERO;
    }

    if rate >= rate_at_target {
        TARGET_UTILIZATION
            + w_mul_down(
                WAD - TARGET_UTILIZATION,
                w_div_down(rate - rate_at_target, max_rate - rate_at_target),
            )
    } else {
        w_mul_down(
            TARGET_UTILIZATION,
            w_div_down(rate - min_rate, rate_at_target - min_rate),
        )
    }
}

/// Utilization at which a market's borrow APY equals `apy`.
pub fn apy_to_utilization(apy: U256, rate_at_target: U256) -> U256 {
    rate_to_utilization(apy_to_rate(apy), rate_at_target)
}

/// Borrow APY a market would pay at 100% utilization.
pub fn apy_at_full_utilization(rate_at_target: U256) -> U256 {
    rate_to_apy(utilization_to_rate(WAD, rate_at_target))
}

/// Converts a percentage (`5.0` for 5%) into WAD. `None` for negative values or overflow.
pub fn percent_to_wad(percent: Decimal) -> Option<U256> {
    if percent.is_sign_negative() {
        return None;
    }
    let scaled = percent.checked_mul(Decimal::from(WAD_PER_PERCENT))?;
    scaled.trunc().to_u128().map(U256::from)
}

/// Converts a WAD-scaled ratio into a percentage, saturating at `Decimal::MAX`.
pub fn wad_to_percent(value: U256) -> Decimal {
    let raw = value.saturating_to::<u128>();
    i128::try_from(raw)
        .ok()
        .and_then(|raw| Decimal::try_from_i128_with_scale(raw, 16).ok())
        .map_or(Decimal::MAX, |percent| percent.normalize())
}
