//! Output formatting for CLI results.

pub mod detail;
pub mod table;

pub use detail::{format_bounds, format_config_summary, format_vault_header};
pub use table::{format_changes_table, format_plan_table};
