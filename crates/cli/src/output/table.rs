//! Table formatting for reallocation plans.

use alloy_primitives::U256;
use morpho_realloc_sim::{wad_to_percent, MarketId};
use morpho_realloc_strategy::{MarketAllocation, MarketChange, VaultData};
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Tabled)]
struct LegRow {
    #[tabled(rename = "#")]
    step: usize,
    #[tabled(rename = "Market")]
    market: String,
    #[tabled(rename = "Collateral")]
    collateral: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Target")]
    target: String,
}

#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "Market")]
    market: String,
    #[tabled(rename = "Position Before")]
    before: String,
    #[tabled(rename = "Position After")]
    after: String,
    #[tabled(rename = "Utilization Before")]
    utilization_before: String,
    #[tabled(rename = "Utilization After")]
    utilization_after: String,
}

pub(crate) fn truncate_hex(value: &str) -> String {
    if value.len() > 10 {
        format!("{}...{}", &value[..6], &value[value.len() - 4..])
    } else {
        value.to_string()
    }
}

fn format_market(id: &MarketId, is_idle: bool) -> String {
    if is_idle {
        "idle".to_string()
    } else {
        truncate_hex(&id.to_string())
    }
}

/// WAD ratio as a percentage with two decimals.
pub fn format_percent(wad: U256) -> String {
    format!("{:.2}%", wad_to_percent(wad))
}

pub fn format_plan_table(vault: &VaultData, plan: &[MarketAllocation]) -> String {
    if plan.is_empty() {
        return "No reallocation needed.".to_string();
    }

    let rows: Vec<LegRow> = plan
        .iter()
        .enumerate()
        .map(|(i, leg)| {
            let id = leg.market_id();
            let current = vault.market(&id).map(|m| m.vault_assets);
            let is_idle = leg.market_params.is_idle();

            let action = match current {
                _ if leg.is_sentinel() => "Supply all",
                Some(assets) if leg.assets < assets => "Withdraw",
                _ => "Supply",
            };
            let target = if leg.is_sentinel() {
                "remaining".to_string()
            } else {
                leg.assets.to_string()
            };
            let collateral = if is_idle {
                "-".to_string()
            } else {
                truncate_hex(&leg.market_params.collateral_token.to_string())
            };

            LegRow {
                step: i + 1,
                market: format_market(&id, is_idle),
                collateral,
                action: action.to_string(),
                current: current.map_or_else(|| "-".to_string(), |a| a.to_string()),
                target,
            }
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::left()));

    table.to_string()
}

pub fn format_changes_table(changes: &[MarketChange]) -> String {
    let rows: Vec<ChangeRow> = changes
        .iter()
        .map(|c| ChangeRow {
            market: format_market(&c.market_id, c.is_idle),
            before: c.vault_assets_before.to_string(),
            after: c.vault_assets_after.to_string(),
            utilization_before: format_percent(c.utilization_before),
            utilization_after: format_percent(c.utilization_after),
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::left()));

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_hex() {
        assert_eq!(truncate_hex("0x1234567890abcdef"), "0x1234...cdef");
        assert_eq!(truncate_hex("0x12"), "0x12");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(U256::from(533_333_333_333_333_333u64)), "53.33%");
        assert_eq!(format_percent(U256::ZERO), "0.00%");
    }

    #[test]
    fn test_empty_plan() {
        let vault = VaultData {
            chain_id: 1,
            address: Default::default(),
            timestamp: 0,
            markets: vec![],
        };
        assert_eq!(format_plan_table(&vault, &[]), "No reallocation needed.");
    }
}
