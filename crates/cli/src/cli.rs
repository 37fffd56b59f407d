//! CLI argument definitions using clap.

use std::path::PathBuf;
use std::str::FromStr;

use alloy_chains::NamedChain;
use alloy_primitives::U256;
use clap::{Parser, Subcommand, ValueEnum};
use morpho_realloc_sim::scalars::parse_bigint;
use morpho_realloc_strategy::StrategyKind;
use rust_decimal::Decimal;

/// Plan liquidity reallocations for Morpho vaults
#[derive(Parser, Debug)]
#[command(name = "realloc")]
#[command(about = "Offline reallocation planner for Morpho vaults", long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "table")]
    pub format: OutputFormat,

    /// Log planner decisions (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Plan reallocations for every vault in a snapshot
    Plan(PlanArgs),
    /// Show the utilization band an APY range maps to
    Bounds(BoundsArgs),
    /// Load and validate a strategy config
    #[command(name = "check-config")]
    CheckConfig(CheckConfigArgs),
}

#[derive(Parser, Debug)]
pub struct PlanArgs {
    /// Vault snapshot JSON (one vault or an array of vaults)
    #[arg(long, env = "REALLOC_SNAPSHOT")]
    pub snapshot: PathBuf,

    /// Strategy config TOML
    #[arg(long, env = "REALLOC_CONFIG")]
    pub config: PathBuf,

    /// Balancing strategy
    #[arg(long, default_value = "equalize")]
    pub strategy: StrategyArg,

    /// Only plan vaults on this chain (e.g., ethereum, base, 8453)
    #[arg(long)]
    pub chain: Option<ChainArg>,

    /// Replay each plan and show post-reallocation utilizations
    #[arg(long)]
    pub simulate: bool,
}

#[derive(Parser, Debug)]
pub struct BoundsArgs {
    /// Lower borrow APY in percent (e.g., "3.5")
    #[arg(long, allow_hyphen_values = true)]
    pub min: Decimal,

    /// Upper borrow APY in percent
    #[arg(long, allow_hyphen_values = true)]
    pub max: Decimal,

    /// IRM rate at target, per second and WAD-scaled (default: 4% APR)
    #[arg(long)]
    pub rate_at_target: Option<WadArg>,
}

#[derive(Parser, Debug)]
pub struct CheckConfigArgs {
    /// Strategy config TOML
    #[arg(long, env = "REALLOC_CONFIG")]
    pub config: PathBuf,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StrategyArg {
    /// Drive every market to the vault-wide utilization
    #[default]
    Equalize,
    /// Keep borrow APYs inside the configured bands
    ApyRange,
    /// Keep borrow APYs above the configured minimum
    MinRate,
}

impl From<StrategyArg> for StrategyKind {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Equalize => StrategyKind::Equalize,
            StrategyArg::ApyRange => StrategyKind::ApyRange,
            StrategyArg::MinRate => StrategyKind::MinRate,
        }
    }
}

/// A WAD-scaled integer given in decimal or 0x-prefixed hex.
#[derive(Clone, Copy, Debug)]
pub struct WadArg(pub U256);

impl FromStr for WadArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_bigint(s)
            .map(WadArg)
            .ok_or_else(|| format!("Invalid integer: {}", s))
    }
}

/// Wrapper for NamedChain that implements FromStr with aliases
#[derive(Clone, Copy, Debug)]
pub struct ChainArg(pub NamedChain);

impl FromStr for ChainArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chain = match s.to_lowercase().as_str() {
            "ethereum" | "eth" | "mainnet" | "1" => NamedChain::Mainnet,
            "base" | "8453" => NamedChain::Base,
            "polygon" | "matic" | "137" => NamedChain::Polygon,
            "arbitrum" | "arb" | "42161" => NamedChain::Arbitrum,
            "optimism" | "op" | "10" => NamedChain::Optimism,
            "unichain" | "130" => NamedChain::Unichain,
            "sepolia" | "11155111" => NamedChain::Sepolia,
            _ => return Err(format!("Unknown chain: {}", s)),
        };
        Ok(ChainArg(chain))
    }
}

impl ChainArg {
    pub fn id(&self) -> u64 {
        u64::from(self.0)
    }
}

impl std::fmt::Display for ChainArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_aliases() {
        assert_eq!(ChainArg::from_str("eth").unwrap().id(), 1);
        assert_eq!(ChainArg::from_str("BASE").unwrap().id(), 8453);
        assert_eq!(ChainArg::from_str("42161").unwrap().id(), 42161);
        assert!(ChainArg::from_str("atlantis").is_err());
    }

    #[test]
    fn test_wad_arg() {
        assert_eq!(WadArg::from_str("1268391679").unwrap().0, U256::from(1_268_391_679u64));
        assert_eq!(WadArg::from_str("0x10").unwrap().0, U256::from(16u64));
        assert!(WadArg::from_str("four").is_err());
    }

    #[test]
    fn test_strategy_arg_maps_to_kind() {
        assert_eq!(StrategyKind::from(StrategyArg::MinRate), StrategyKind::MinRate);
        assert_eq!(StrategyKind::from(StrategyArg::default()), StrategyKind::Equalize);
    }
}
