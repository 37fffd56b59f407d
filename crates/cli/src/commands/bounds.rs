//! `bounds` command: utilization band of an APY range.

use alloy_primitives::U256;
use anyhow::Result;
use morpho_realloc_sim::scalars::decimal_u256;
use morpho_realloc_sim::{apy_at_full_utilization, apy_to_utilization, INITIAL_RATE_AT_TARGET};
use morpho_realloc_strategy::ApyRangeConfig;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::cli::{BoundsArgs, OutputFormat};
use crate::output::format_bounds;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundsReport {
    pub min_apy: Decimal,
    pub max_apy: Decimal,
    #[serde(with = "decimal_u256")]
    pub rate_at_target: U256,
    #[serde(with = "decimal_u256")]
    pub lower_utilization: U256,
    #[serde(with = "decimal_u256")]
    pub upper_utilization: U256,
    #[serde(with = "decimal_u256")]
    pub apy_at_full_utilization: U256,
    /// The upper APY cannot be reached even at 100% utilization
    pub saturates: bool,
}

pub fn compute_bounds(min: Decimal, max: Decimal, rate_at_target: U256) -> Result<BoundsReport> {
    let range = ApyRangeConfig::new(min, max)?;
    let (min_wad, max_wad) = range.to_wad()?;
    let full = apy_at_full_utilization(rate_at_target);

    Ok(BoundsReport {
        min_apy: min,
        max_apy: max,
        rate_at_target,
        lower_utilization: apy_to_utilization(min_wad, rate_at_target),
        upper_utilization: apy_to_utilization(max_wad, rate_at_target),
        apy_at_full_utilization: full,
        saturates: full < max_wad,
    })
}

pub fn run_bounds(args: &BoundsArgs, format: OutputFormat) -> Result<()> {
    let rate_at_target = args.rate_at_target.map_or(INITIAL_RATE_AT_TARGET, |r| r.0);
    let report = compute_bounds(args.min, args.max, rate_at_target)?;

    match format {
        OutputFormat::Table => {
            println!("{}", format_bounds(&report));
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)?;
            println!("{}", json);
        }
    }

    Ok(())
}
