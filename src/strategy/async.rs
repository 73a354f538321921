//! Asynchronous batch processing strategy
//!
//! This module provides a multi-threaded implementation of the
//! ProcessingStrategy trait. It reads transfers in batches and executes each
//! batch with source-account partitioning.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     ├── BatchProcessor (source partitioning + tasks)
//!     ├── TransferEngine (shared, clone per task)
//!     │   └── InMemoryLedger (accounts, transfer log, idempotency cache)
//!     └── idempotency sweeper (background task for the pipeline's lifetime)
//! ```
//!
//! # Ordering
//!
//! - Batches are processed sequentially, so a source's transfers keep their
//!   file order across batch boundaries
//! - Within a batch, each source account's transfers run sequentially on one
//!   task while different sources run in parallel
//! - Transfers from different sources into the same account serialize on
//!   that account's lock; their relative order is unspecified

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tokio_util::compat::TokioAsyncReadCompatExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::core::{spawn_idempotency_sweeper, BatchProcessor, TransferEngine};
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::write_accounts_csv;
use crate::strategy::{read_balances, seed_ledger, ProcessingReport, ProcessingStrategy};
use crate::types::LedgerError;

/// Configuration for async batch processing
#[derive(Clone, Debug, PartialEq)]
pub struct BatchConfig {
    /// Number of transfers read per batch
    pub batch_size: usize,

    /// Worker threads of the tokio runtime
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a configuration, replacing zero values with defaults
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                default = default.batch_size,
                "Invalid batch_size (0), using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                default = default.max_concurrent_batches,
                "Invalid max_concurrent_batches (0), using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AsyncProcessingStrategy {
    engine_config: EngineConfig,
    batch_config: BatchConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(engine_config: EngineConfig, batch_config: BatchConfig) -> Self {
        Self {
            engine_config,
            batch_config,
        }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(
        &self,
        accounts_path: &Path,
        transfers_path: &Path,
        output: &mut dyn Write,
    ) -> Result<ProcessingReport, LedgerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.batch_config.max_concurrent_batches)
            .enable_time()
            .build()
            .map_err(|e| LedgerError::IoError {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        let ledger = Arc::new(seed_ledger(accounts_path, &self.engine_config)?);

        let report = runtime.block_on(async {
            let engine = TransferEngine::new(Arc::clone(&ledger), self.engine_config.clone());
            let processor = BatchProcessor::new(engine);

            let file = tokio::fs::File::open(transfers_path)
                .await
                .map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => LedgerError::file_not_found(transfers_path),
                    _ => LedgerError::IoError {
                        message: format!(
                            "Failed to open file '{}': {}",
                            transfers_path.display(),
                            e
                        ),
                    },
                })?;
            let mut reader = AsyncReader::new(file.compat());

            let shutdown = CancellationToken::new();
            let sweeper = spawn_idempotency_sweeper(
                Arc::clone(&ledger),
                self.engine_config.sweep_interval,
                shutdown.clone(),
            );

            let mut report = ProcessingReport::default();
            loop {
                let batch = reader.read_batch(self.batch_config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                debug!(size = batch.len(), "Processing batch");
                for result in processor.process_batch(batch).await {
                    report.record(&result.result);
                }
            }
            report.rejected += reader.rejected() as usize;

            shutdown.cancel();
            if let Err(e) = sweeper.await {
                warn!(error = %e, "Idempotency sweeper ended abnormally");
            }

            let ids = ledger.accounts().ids();
            let accounts = read_balances(ledger.as_ref(), &ids).await?;
            report.finish(&ledger, accounts);
            Ok::<_, LedgerError>(report)
        })?;

        write_accounts_csv(&report.accounts, output)?;

        info!(
            succeeded = report.succeeded,
            replayed = report.replayed,
            rejected = report.rejected,
            "Async processing finished"
        );

        Ok(report)
    }
}
