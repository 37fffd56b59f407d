//! `check-config` command: load and validate a strategy config.

use anyhow::{Context, Result};
use morpho_realloc_strategy::{StrategyConfig, StrategyKind};
use serde_json::json;

use crate::cli::{CheckConfigArgs, OutputFormat};
use crate::output::format_config_summary;

const STRATEGIES: [StrategyKind; 3] = [
    StrategyKind::Equalize,
    StrategyKind::ApyRange,
    StrategyKind::MinRate,
];

pub fn run_check_config(args: &CheckConfigArgs, format: OutputFormat) -> Result<()> {
    let config = StrategyConfig::load(&args.config)
        .with_context(|| format!("Invalid config {}", args.config.display()))?;

    // A config may only support some strategies
    let strategies: Vec<(StrategyKind, Option<String>)> = STRATEGIES
        .iter()
        .map(|&kind| (kind, config.policy(kind).err().map(|e| e.to_string())))
        .collect();

    match format {
        OutputFormat::Table => {
            println!("{}", format_config_summary(&config, &strategies));
        }
        OutputFormat::Json => {
            let status: serde_json::Map<String, serde_json::Value> = strategies
                .iter()
                .map(|(kind, problem)| {
                    let value = match problem {
                        None => json!("ready"),
                        Some(reason) => json!(reason),
                    };
                    (kind.to_string(), value)
                })
                .collect();
            let output = json!({
                "valid": true,
                "chains": config.chains.len(),
                "strategies": status,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
