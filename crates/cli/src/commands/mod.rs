//! Command implementations.

pub mod bounds;
pub mod check_config;
pub mod plan;

pub use bounds::run_bounds;
pub use check_config::run_check_config;
pub use plan::run_plan;
