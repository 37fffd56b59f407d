//! `plan` command: plan every vault of a snapshot file.

use std::path::Path;
use std::sync::Arc;

use alloy_primitives::Address;
use anyhow::{Context, Result};
use futures::future::join_all;
use morpho_realloc_strategy::{
    apply_plan, find_reallocation, MarketAllocation, MarketChange, Policy, StrategyConfig,
    StrategyKind, VaultData,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cli::{OutputFormat, PlanArgs};
use crate::output::{format_changes_table, format_plan_table, format_vault_header};

/// A snapshot file holds one vault or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum Snapshot {
    Many(Vec<VaultData>),
    One(Box<VaultData>),
}

/// Planning result for one vault.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultReport {
    pub vault: Address,
    pub chain_id: u64,
    pub timestamp: u64,
    /// `None` when the vault needs no reallocation
    pub plan: Option<Vec<MarketAllocation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation: Option<Vec<MarketChange>>,
    #[serde(skip)]
    pub snapshot: VaultData,
}

pub fn load_snapshot(path: &Path) -> Result<Vec<VaultData>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    let snapshot: Snapshot = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;

    Ok(match snapshot {
        Snapshot::Many(vaults) => vaults,
        Snapshot::One(vault) => vec![*vault],
    })
}

fn plan_vault(vault: VaultData, policy: &Policy, simulate: bool) -> Result<VaultReport> {
    let plan = find_reallocation(&vault, policy)
        .with_context(|| format!("Failed to plan vault {}", vault.address))?;

    let simulation = match (&plan, simulate) {
        (Some(legs), true) => {
            let outcome = apply_plan(&vault, legs)
                .with_context(|| format!("Failed to simulate plan for vault {}", vault.address))?;
            Some(outcome.changes)
        }
        _ => None,
    };

    Ok(VaultReport {
        vault: vault.address,
        chain_id: vault.chain_id,
        timestamp: vault.timestamp,
        plan,
        simulation,
        snapshot: vault,
    })
}

pub async fn run_plan(args: &PlanArgs, format: OutputFormat) -> Result<()> {
    let config = StrategyConfig::load(&args.config)
        .with_context(|| format!("Invalid config {}", args.config.display()))?;
    let kind = StrategyKind::from(args.strategy);
    let policy = Arc::new(config.policy(kind)?);

    let mut vaults = load_snapshot(&args.snapshot)?;
    if let Some(chain) = args.chain {
        vaults.retain(|v| v.chain_id == chain.id());
        debug!(%chain, remaining = vaults.len(), "Filtered vaults by chain");
    }

    info!(vaults = vaults.len(), strategy = %kind, "Planning reallocations");

    // Vaults are independent: plan each one on the blocking pool
    let simulate = args.simulate;
    let tasks: Vec<_> = vaults
        .into_iter()
        .map(|vault| {
            let policy = Arc::clone(&policy);
            tokio::task::spawn_blocking(move || plan_vault(vault, &policy, simulate))
        })
        .collect();

    let mut reports = Vec::with_capacity(tasks.len());
    for result in join_all(tasks).await {
        reports.push(result.context("Planning task failed")??);
    }

    match format {
        OutputFormat::Table => {
            if reports.is_empty() {
                println!("No vaults found.");
            }
            for report in &reports {
                println!("{}", format_vault_header(report));
                match &report.plan {
                    Some(plan) => println!("{}", format_plan_table(&report.snapshot, plan)),
                    None => println!("No reallocation needed."),
                }
                if let Some(changes) = &report.simulation {
                    println!("{}", format_changes_table(changes));
                }
                println!();
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&reports)?;
            println!("{}", json);
        }
    }

    Ok(())
}
