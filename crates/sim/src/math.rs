//! Fixed-point math primitives mirroring Morpho Blue's `MathLib` and `SharesMathLib`.
//!
//! Every ratio handled by this crate (utilization, rates, fees, APYs) is a WAD-scaled
//! [`U256`] (`1e18 == 1.0`). Products are formed in 512 bits before dividing, so
//! `x * y` never wraps even when both operands are close to `U256::MAX`. A quotient
//! that does not fit back into 256 bits saturates to `U256::MAX`.

use alloy_primitives::{U256, U512};

/// 1e18, the fixed-point scale for ratios and rates
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Seconds in a 365-day year
pub const SECONDS_PER_YEAR: U256 = U256::from_limbs([31_536_000, 0, 0, 0]);

/// Virtual assets added to market totals in share conversions
pub const VIRTUAL_ASSETS: U256 = U256::from_limbs([1, 0, 0, 0]);

/// Virtual shares added to market totals in share conversions (1e6)
pub const VIRTUAL_SHARES: U256 = U256::from_limbs([1_000_000, 0, 0, 0]);

/// One basis point in WAD (1e14)
pub const BPS_WAD: U256 = U256::from_limbs([100_000_000_000_000, 0, 0, 0]);

/// Rounding direction for divisions and share conversions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingDirection {
    Down,
    Up,
}

fn widen(x: U256) -> U512 {
    let limbs = x.as_limbs();
    U512::from_limbs([limbs[0], limbs[1], limbs[2], limbs[3], 0, 0, 0, 0])
}

fn narrow(x: U512) -> U256 {
    let limbs = x.as_limbs();
    if limbs[4..].iter().any(|limb| *limb != 0) {
        return U256::MAX;
    }
    U256::from_limbs([limbs[0], limbs[1], limbs[2], limbs[3]])
}

/// `x * y / d` with the given rounding. Returns zero when `d` is zero.
pub fn mul_div(x: U256, y: U256, d: U256, rounding: RoundingDirection) -> U256 {
    if d.is_zero() {
        return U256::ZERO;
    }

    let product = widen(x) * widen(y);
    let divisor = widen(d);
    let quotient = product / divisor;

    match rounding {
        RoundingDirection::Down => narrow(quotient),
        RoundingDirection::Up => {
            if (product % divisor).is_zero() {
                narrow(quotient)
            } else {
                narrow(quotient).saturating_add(U256::from(1))
            }
        }
    }
}

/// `floor(x * y / d)`
pub fn mul_div_down(x: U256, y: U256, d: U256) -> U256 {
    mul_div(x, y, d, RoundingDirection::Down)
}

/// `ceil(x * y / d)`
pub fn mul_div_up(x: U256, y: U256, d: U256) -> U256 {
    mul_div(x, y, d, RoundingDirection::Up)
}

/// `floor(x * y / WAD)`
pub fn w_mul_down(x: U256, y: U256) -> U256 {
    mul_div_down(x, y, WAD)
}

/// `ceil(x * y / WAD)`
pub fn w_mul_up(x: U256, y: U256) -> U256 {
    mul_div_up(x, y, WAD)
}

/// `floor(x * WAD / y)`
pub fn w_div_down(x: U256, y: U256) -> U256 {
    mul_div_down(x, WAD, y)
}

/// `ceil(x * WAD / y)`
pub fn w_div_up(x: U256, y: U256) -> U256 {
    mul_div_up(x, WAD, y)
}

/// Third-order Taylor approximation of `e^(x * n) - 1`.
///
/// This is the compounding used by Morpho Blue for interest accrual. Each term is
/// rounded down, exactly like `MathLib.wTaylorCompounded`.
pub fn w_taylor_compounded(x: U256, n: U256) -> U256 {
    let first_term = x.saturating_mul(n);
    let second_term = mul_div_down(first_term, first_term, WAD * U256::from(2));
    let third_term = mul_div_down(second_term, first_term, WAD * U256::from(3));

    first_term
        .saturating_add(second_term)
        .saturating_add(third_term)
}

/// `max(x - y, 0)`
pub fn zero_floor_sub(x: U256, y: U256) -> U256 {
    x.saturating_sub(y)
}

pub fn min(x: U256, y: U256) -> U256 {
    if x < y {
        x
    } else {
        y
    }
}

pub fn max(x: U256, y: U256) -> U256 {
    if x > y {
        x
    } else {
        y
    }
}

/// Scale a basis-point amount into WAD (`1 bps == 1e14`).
pub fn bps_to_wad(bps: u32) -> U256 {
    U256::from(bps) * BPS_WAD
}

/// Convert supply/borrow shares to assets using virtual offsets
pub fn shares_to_assets(
    shares: U256,
    total_assets: U256,
    total_shares: U256,
    rounding: RoundingDirection,
) -> U256 {
    mul_div(
        shares,
        total_assets.saturating_add(VIRTUAL_ASSETS),
        total_shares.saturating_add(VIRTUAL_SHARES),
        rounding,
    )
}

/// Convert assets to supply/borrow shares using virtual offsets
pub fn assets_to_shares(
    assets: U256,
    total_assets: U256,
    total_shares: U256,
    rounding: RoundingDirection,
) -> U256 {
    mul_div(
        assets,
        total_shares.saturating_add(VIRTUAL_SHARES),
        total_assets.saturating_add(VIRTUAL_ASSETS),
        rounding,
    )
}

/// Lossy conversion of a WAD-scaled value to `f64`. Display and tests only.
pub fn rate_to_f64(value: U256) -> f64 {
    let value = value
        .as_limbs()
        .iter()
        .rev()
        .fold(0.0_f64, |acc, limb| acc * 18_446_744_073_709_551_616.0 + *limb as f64);
    value / 1e18
}
