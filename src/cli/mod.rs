//! Command-line surface of the transfer ledger
//!
//! Arguments map onto [`crate::config::EngineConfig`] and
//! [`crate::strategy::BatchConfig`]; TTL and log level also read the
//! `IDEMPOTENCY_TTL_SECONDS` and `LOG_LEVEL` environment variables.

mod args;

pub use args::{CliArgs, StrategyType};

use clap::Parser;

/// Parse process arguments, exiting with usage on error
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}
