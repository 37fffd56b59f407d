//! Adaptive Curve Interest Rate Model (IRM) implementation.
//!
//! This module replicates the [Adaptive Curve IRM](https://docs.morpho.org/morpho/concepts/adaptive-interest-rate-model)
//! used by Morpho Blue. Results must match the on-chain `AdaptiveCurveIrm` bit for bit,
//! so every operation rounds toward zero exactly like the Solidity `wMulToZero` /
//! `wDivToZero` helpers.
//!
//! # How the IRM Works
//!
//! ## 1. The Curve Function
//!
//! The borrow rate is determined by a curve centered at the target utilization (90%):
//!
//! ```text
//! If utilization >= target (90%):
//!     rate = rate_at_target * (1 + 3 * error)    // Steep increase above target
//! If utilization < target:
//!     rate = rate_at_target * (1 - 0.75 * error) // Gradual decrease below target
//!
//! where error = |utilization - target| / normalization_factor
//! ```
//!
//! ## 2. Rate Adaptation
//!
//! The `rate_at_target` itself drifts exponentially with the utilization error:
//! `rate_at_target(t) = rate_at_target(0) * exp(ADJUSTMENT_SPEED * error * t)`,
//! bounded to `[MIN_RATE_AT_TARGET, MAX_RATE_AT_TARGET]`. The rate applied over an
//! interval is the curve evaluated at the average of the start, mid and end
//! `rate_at_target` (weights 1:2:1).
//!
//! # Constants
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `TARGET_UTILIZATION` | 90% | Optimal utilization rate |
//! | `CURVE_STEEPNESS` | 4.0 | Rate multiplier at 100% utilization |
//! | `INITIAL_RATE_AT_TARGET` | 4% APR | Starting rate for new markets |
//! | `ADJUSTMENT_SPEED` | 50/year | How fast rate_at_target adapts |
//! | `MIN_RATE_AT_TARGET` | 0.1% APR | Minimum rate at target |
//! | `MAX_RATE_AT_TARGET` | 200% APR | Maximum rate at target |
//!
//! # Example
//!
//! ```rust
//! use morpho_realloc_sim::irm::{get_borrow_rate, TARGET_UTILIZATION, INITIAL_RATE_AT_TARGET};
//! use alloy_primitives::U256;
//!
//! // At exactly target utilization the borrow rate equals the rate at target
//! let result = get_borrow_rate(TARGET_UTILIZATION, INITIAL_RATE_AT_TARGET, 0);
//! assert_eq!(result.end_borrow_rate, INITIAL_RATE_AT_TARGET);
//! ```

use alloy_primitives::U256;

use crate::math::{max, min, w_div_down, w_mul_down, WAD};

/// Curve steepness parameter (4.0 in WAD)
pub const CURVE_STEEPNESS: U256 = U256::from_limbs([4_000_000_000_000_000_000, 0, 0, 0]);

/// Target utilization rate (90% in WAD = 0.9)
pub const TARGET_UTILIZATION: U256 = U256::from_limbs([900_000_000_000_000_000, 0, 0, 0]);

/// Initial rate at target: 4% per year / SECONDS_PER_YEAR
pub const INITIAL_RATE_AT_TARGET: U256 = U256::from_limbs([1_268_391_679, 0, 0, 0]);

/// Adjustment speed: 50 per year / SECONDS_PER_YEAR
pub const ADJUSTMENT_SPEED: U256 = U256::from_limbs([1_585_489_599_188, 0, 0, 0]);

/// Minimum rate at target: 0.1% per year / SECONDS_PER_YEAR
pub const MIN_RATE_AT_TARGET: U256 = U256::from_limbs([31_709_791, 0, 0, 0]);

/// Maximum rate at target: 200% per year / SECONDS_PER_YEAR
pub const MAX_RATE_AT_TARGET: U256 = U256::from_limbs([63_419_583_967, 0, 0, 0]);

/// ln(2) scaled by WAD
pub const LN_2_INT: i128 = 693_147_180_559_945_309;

/// ln(1e-18) scaled by WAD (negative)
pub const LN_WEI_INT: i128 = -41_446_531_673_892_822_312;

/// Above this input `w_exp` is clipped to avoid overflowing in later multiplications
pub const WEXP_UPPER_BOUND: i128 = 93_859_467_695_000_404_319;

/// Value of `w_exp(WEXP_UPPER_BOUND)`:
/// 57716089161558943949701069502944508345128422502756744429568
pub const WEXP_UPPER_VALUE: U256 = U256::from_limbs([0, 0, 0x31D8_1650_C7D8_8B80, 0x9]);

/// Result of borrow rate calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorrowRateResult {
    /// Rate applied over the elapsed period (WAD-scaled per second)
    pub avg_borrow_rate: U256,
    /// Instantaneous rate at the end of the period
    pub end_borrow_rate: U256,
    /// Rate at target after adaptation; persisted by the caller
    pub end_rate_at_target: U256,
}

/// Signed utilization error, stored as magnitude plus sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtilizationError {
    /// `|utilization - target| / norm_factor`, WAD-scaled and rounded toward zero
    pub magnitude: U256,
    /// True when utilization is below target
    pub negative: bool,
}

impl UtilizationError {
    /// Normalized distance of `utilization` from [`TARGET_UTILIZATION`].
    pub fn from_utilization(utilization: U256) -> Self {
        let err_norm_factor = if utilization > TARGET_UTILIZATION {
            WAD - TARGET_UTILIZATION
        } else {
            TARGET_UTILIZATION
        };

        if utilization >= TARGET_UTILIZATION {
            Self {
                magnitude: w_div_down(utilization - TARGET_UTILIZATION, err_norm_factor),
                negative: false,
            }
        } else {
            Self {
                magnitude: w_div_down(TARGET_UTILIZATION - utilization, err_norm_factor),
                negative: true,
            }
        }
    }
}

/// Approximation of exp(x) used by the Adaptive Curve IRM.
///
/// Uses the decomposition: e^x = 2^q * e^r where x = q*ln(2) + r
/// with -ln(2)/2 <= r <= ln(2)/2
pub fn w_exp(x: i128) -> U256 {
    // If x < ln(1e-18) then exp(x) < 1e-18 so it is rounded to zero
    if x < LN_WEI_INT {
        return U256::ZERO;
    }

    if x >= WEXP_UPPER_BOUND {
        return WEXP_UPPER_VALUE;
    }

    // q = x / ln(2) rounded half toward zero
    let rounding_adjustment = if x < 0 { -(LN_2_INT / 2) } else { LN_2_INT / 2 };
    let q = (x + rounding_adjustment) / LN_2_INT;
    let r = x - q * LN_2_INT;

    // e^r ≈ 1 + r + r²/2
    let wad_i128 = WAD.saturating_to::<i128>();
    let exp_r = wad_i128 + r + (r * r) / wad_i128 / 2;
    let exp_r = U256::from(exp_r.unsigned_abs());

    if q >= 0 {
        exp_r << (q as usize)
    } else {
        exp_r >> ((-q) as usize)
    }
}

/// Applies the IRM curve to a rate at target for a given utilization error.
///
/// `rate_at_target * (1 + coeff * err)` where `coeff` is `1 - 1/steepness` below target
/// and `steepness - 1` above it.
pub fn curve(rate_at_target: U256, err: UtilizationError) -> U256 {
    if err.negative {
        let coeff = WAD - w_div_down(WAD, CURVE_STEEPNESS);
        let factor = WAD.saturating_sub(w_mul_down(coeff, err.magnitude));
        w_mul_down(factor, rate_at_target)
    } else {
        let coeff = CURVE_STEEPNESS - WAD;
        let factor = WAD + w_mul_down(coeff, err.magnitude);
        w_mul_down(factor, rate_at_target)
    }
}

/// `start * exp(±adaptation)`, bounded to the allowed rate-at-target range.
fn new_rate_at_target(start_rate_at_target: U256, adaptation: U256, negative: bool) -> U256 {
    let adaptation = adaptation.saturating_to::<i128>();
    let exp_arg = if negative { -adaptation } else { adaptation };
    let raw_rate = w_mul_down(start_rate_at_target, w_exp(exp_arg));
    min(max(raw_rate, MIN_RATE_AT_TARGET), MAX_RATE_AT_TARGET)
}

/// Calculates the borrow rate for the Adaptive Curve IRM.
///
/// This is the core IRM function that computes both the instantaneous borrow rate
/// and the adapted `rate_at_target` after a given time period.
///
/// # Arguments
///
/// * `utilization` - Current market utilization (WAD-scaled, 0 to 1e18)
/// * `rate_at_target` - Current rate at target utilization (per-second, WAD-scaled).
///   Pass `U256::ZERO` for a market that never adapted (uses `INITIAL_RATE_AT_TARGET`).
/// * `elapsed` - Time since last update in seconds
///
/// # Example
///
/// ```rust
/// use morpho_realloc_sim::irm::{get_borrow_rate, INITIAL_RATE_AT_TARGET};
/// use alloy_primitives::U256;
///
/// // High utilization (95%) gives a higher rate, and pushes rate_at_target up over time
/// let high_util = U256::from(950_000_000_000_000_000u64);
/// let result = get_borrow_rate(high_util, INITIAL_RATE_AT_TARGET, 86_400);
/// assert!(result.end_borrow_rate > INITIAL_RATE_AT_TARGET);
/// assert!(result.end_rate_at_target > INITIAL_RATE_AT_TARGET);
/// ```
pub fn get_borrow_rate(utilization: U256, rate_at_target: U256, elapsed: u64) -> BorrowRateResult {
    let err = UtilizationError::from_utilization(utilization);

    let (avg_rate_at_target, end_rate_at_target) = if rate_at_target.is_zero() {
        (INITIAL_RATE_AT_TARGET, INITIAL_RATE_AT_TARGET)
    } else {
        let speed = w_mul_down(ADJUSTMENT_SPEED, err.magnitude);
        let linear_adaptation = speed.saturating_mul(U256::from(elapsed));

        if linear_adaptation.is_zero() {
            (rate_at_target, rate_at_target)
        } else {
            let end_rate = new_rate_at_target(rate_at_target, linear_adaptation, err.negative);
            let mid_rate = new_rate_at_target(
                rate_at_target,
                linear_adaptation / U256::from(2),
                err.negative,
            );

            // Trapezoidal approximation of the integral of the exponential
            let avg_rate = (rate_at_target + end_rate + U256::from(2) * mid_rate) / U256::from(4);

            (avg_rate, end_rate)
        }
    };

    BorrowRateResult {
        avg_borrow_rate: curve(avg_rate_at_target, err),
        end_borrow_rate: curve(end_rate_at_target, err),
        end_rate_at_target,
    }
}
