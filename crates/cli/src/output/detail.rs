//! Detailed output for bounds and config summaries.

use alloy_primitives::U256;
use colored::Colorize;
use morpho_realloc_sim::wad_to_percent;
use morpho_realloc_strategy::{StrategyConfig, StrategyKind};

use super::table::{format_percent, truncate_hex};
use crate::commands::bounds::BoundsReport;
use crate::commands::plan::VaultReport;

fn format_apy(wad: U256) -> String {
    format!("{:.2}%", wad_to_percent(wad))
}

pub fn format_vault_header(report: &VaultReport) -> String {
    let legs = report.plan.as_ref().map_or(0, Vec::len);
    format!(
        "{} {} ({}, {} markets, {} legs)",
        "Vault".cyan().bold(),
        report.vault,
        report.snapshot.chain(),
        report.snapshot.markets.len(),
        legs
    )
}

pub fn format_bounds(report: &BoundsReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("{}\n", "Utilization Bounds".cyan().bold()));
    output.push_str(&format!("  APY range:       {}% - {}%\n", report.min_apy, report.max_apy));
    output.push_str(&format!("  Rate at target:  {}\n", report.rate_at_target));
    output.push_str(&format!(
        "  Lower:           {} ({})\n",
        format_percent(report.lower_utilization),
        report.lower_utilization
    ));
    output.push_str(&format!(
        "  Upper:           {} ({})\n",
        format_percent(report.upper_utilization),
        report.upper_utilization
    ));
    output.push_str(&format!(
        "  APY at 100%:     {}\n",
        format_apy(report.apy_at_full_utilization)
    ));

    if report.saturates {
        output.push_str(&format!(
            "\n{}\n",
            "Upper APY is unreachable: markets at this rate are pushed to saturation".yellow()
        ));
    }

    output
}

pub fn format_config_summary(config: &StrategyConfig, strategies: &[(StrategyKind, Option<String>)]) -> String {
    let mut output = String::new();

    output.push_str(&format!("{}\n", "Config OK".green().bold()));
    output.push_str(&format!(
        "  Idle reallocation:   {}\n",
        if config.allow_idle_reallocation { "Yes" } else { "No" }
    ));
    output.push_str(&format!("  Min delta:           {} bps\n", config.min_delta_bps));
    output.push_str(&format!("  Min transfer:        {}\n", config.min_transfer_assets));
    output.push_str(&format!("  Denied collateral:   {}\n", config.denied_collateral.len()));

    if let Some(range) = &config.default_apy_range {
        output.push_str(&format!("  Default APY range:   {}% - {}%\n", range.min, range.max));
    }
    if let Some(minimum) = &config.minimum_rate {
        output.push_str(&format!("  Minimum APY:         {}%\n", minimum.min_apy));
    }
    output.push('\n');

    if !config.chains.is_empty() {
        output.push_str(&format!("{}\n", "Chains".cyan().bold()));
        for chain in &config.chains {
            output.push_str(&format!(
                "  {} - {} vault overrides, {} market overrides\n",
                alloy_chains::Chain::from_id(chain.chain_id),
                chain.vaults.len(),
                chain.markets.len()
            ));
            for market in &chain.markets {
                output.push_str(&format!(
                    "    {} {}% - {}%\n",
                    truncate_hex(&market.market_id.to_string()),
                    market.apy_range.min,
                    market.apy_range.max
                ));
            }
        }
        output.push('\n');
    }

    output.push_str(&format!("{}\n", "Strategies".cyan().bold()));
    for (kind, problem) in strategies {
        match problem {
            None => output.push_str(&format!("  {:<10} {}\n", kind.to_string(), "ready".green())),
            Some(reason) => output.push_str(&format!("  {:<10} {}\n", kind.to_string(), reason.yellow())),
        }
    }

    output
}
