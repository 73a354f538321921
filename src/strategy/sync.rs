//! Synchronous processing strategy
//!
//! Executes transfers one at a time in file order on a single-threaded tokio
//! runtime. The engine is asynchronous, but with one request in flight the
//! outcome is fully determined by the input order.
//!
//! # Design
//!
//! The SyncProcessingStrategy focuses on orchestration, delegating:
//! - account seeding to `sync_reader::read_accounts`
//! - CSV parsing to `SyncReader` (iterator interface)
//! - transfer execution to `TransferEngine`
//! - CSV output to `csv_format::write_accounts_csv`
//!
//! # Memory Efficiency
//!
//! Transfer rows are streamed; memory grows with accounts, committed transfers
//! and live idempotency records, not with the size of the input.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::core::TransferEngine;
use crate::io::csv_format::write_accounts_csv;
use crate::io::sync_reader::SyncReader;
use crate::strategy::{read_balances, seed_ledger, ProcessingReport, ProcessingStrategy};
use crate::types::LedgerError;

#[derive(Debug, Clone, Default)]
pub struct SyncProcessingStrategy {
    config: EngineConfig,
}

impl SyncProcessingStrategy {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(
        &self,
        accounts_path: &Path,
        transfers_path: &Path,
        output: &mut dyn Write,
    ) -> Result<ProcessingReport, LedgerError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| LedgerError::IoError {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        let ledger = Arc::new(seed_ledger(accounts_path, &self.config)?);
        let engine = TransferEngine::new(Arc::clone(&ledger), self.config.clone());
        let reader = SyncReader::new(transfers_path)?;

        let mut report = ProcessingReport::default();
        for row in reader {
            match row {
                Ok(request) => {
                    let result = runtime.block_on(engine.execute_detailed(request.clone()));
                    if let Err(e) = &result {
                        warn!(
                            source = request.source,
                            destination = request.destination,
                            amount = %request.amount,
                            error = %e,
                            "Transfer rejected"
                        );
                    }
                    report.record(&result);
                }
                Err(e) => {
                    warn!(error = %e, "Skipping malformed transfer row");
                    report.rejected += 1;
                }
            }
        }

        let ids = ledger.accounts().ids();
        let accounts = runtime.block_on(read_balances(ledger.as_ref(), &ids))?;
        report.finish(&ledger, accounts);

        write_accounts_csv(&report.accounts, output)?;

        info!(
            succeeded = report.succeeded,
            replayed = report.replayed,
            rejected = report.rejected,
            "Sync processing finished"
        );

        Ok(report)
    }
}
