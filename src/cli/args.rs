use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::EngineConfig;
use crate::core::DEFAULT_HISTORY_TAKE;
use crate::strategy::BatchConfig;
use crate::types::AccountId;

/// Command-line arguments for the transfer ledger
#[derive(Parser, Debug)]
#[command(name = "transfer-ledger")]
#[command(
    about = "Execute idempotent funds transfers between accounts",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the transfers CSV file
    #[arg(value_name = "TRANSFERS", help = "Path to the transfers CSV file")]
    pub transfers_file: PathBuf,

    /// Path to the account seed CSV file
    #[arg(
        long = "accounts",
        value_name = "ACCOUNTS",
        help = "Path to the account seed CSV file (account,customer,balance)"
    )]
    pub accounts_file: PathBuf,

    /// Processing strategy to use
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for file order or 'async' for concurrent batches"
    )]
    pub strategy: StrategyType,

    /// Batch size for async processing
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of transfers per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Worker threads for async processing
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Worker threads for concurrent batches (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    #[arg(
        long = "max-retries",
        value_name = "COUNT",
        default_value_t = 3,
        help = "Retries of a transfer after a transient store failure"
    )]
    pub max_retries: u32,

    #[arg(
        long = "lock-timeout-ms",
        value_name = "MILLIS",
        default_value_t = 5_000,
        help = "Timeout for acquiring account write access"
    )]
    pub lock_timeout_ms: u64,

    #[arg(
        long = "idempotency-ttl-secs",
        value_name = "SECONDS",
        env = "IDEMPOTENCY_TTL_SECONDS",
        default_value_t = 86_400,
        help = "Lifetime of idempotency records"
    )]
    pub idempotency_ttl_secs: u64,

    #[arg(
        long = "log-level",
        value_name = "LEVEL",
        env = "LOG_LEVEL",
        default_value = "info",
        help = "Log filter used when RUST_LOG is not set"
    )]
    pub log_level: String,

    /// Optional path for the committed transfer log
    #[arg(
        long = "transfers-out",
        value_name = "PATH",
        help = "Write the committed transfer log as CSV to this path"
    )]
    pub transfers_out: Option<PathBuf>,

    /// Account whose transfer history is written to `--history-out`
    #[arg(
        long = "history",
        value_name = "ACCOUNT",
        requires = "history_out",
        help = "Write the transfer history of this account after processing"
    )]
    pub history: Option<AccountId>,

    #[arg(
        long = "history-out",
        value_name = "PATH",
        requires = "history",
        help = "Path of the account history CSV (newest first)"
    )]
    pub history_out: Option<PathBuf>,

    #[arg(
        long = "history-take",
        value_name = "COUNT",
        default_value_t = DEFAULT_HISTORY_TAKE,
        help = "Maximum number of history entries"
    )]
    pub history_take: usize,

    #[arg(
        long = "history-skip",
        value_name = "COUNT",
        default_value_t = 0,
        help = "Number of newest history entries to skip"
    )]
    pub history_skip: usize,
}

/// Available processing strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    /// Sequential processing in file order
    Sync,
    /// Concurrent batches partitioned by source account
    Async,
}

impl CliArgs {
    /// Build the batch configuration, falling back to defaults
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }

    /// Build the engine configuration
    pub fn to_engine_config(&self) -> EngineConfig {
        let default = EngineConfig::default();
        EngineConfig::new(
            self.max_retries,
            default.retry_backoff,
            Duration::from_millis(self.lock_timeout_ms),
            Duration::from_secs(self.idempotency_ttl_secs),
            default.sweep_interval,
        )
    }
}
