//! Batch processing with source-account partitioning
//!
//! This module provides the `BatchProcessor` struct, which runs a batch of
//! transfer requests through a shared [`TransferEngine`].
//!
//! # Design
//!
//! A batch is partitioned by source account. Each partition runs on its own
//! tokio task, executing its requests sequentially, so debits from one account
//! keep their file order while different sources proceed in parallel.
//! Partitions that share a destination (or whose destination is another
//! partition's source) are serialized by the store's account locks.

use std::collections::HashMap;

use tracing::{error, warn};

use super::engine::{TransferEngine, TransferOutcome};
use super::traits::LedgerStore;
use crate::types::{AccountId, LedgerError, TransferRequest};

/// Result of processing a single transfer request
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The request that was processed
    pub request: TransferRequest,

    /// The result of processing (success or error)
    pub result: Result<TransferOutcome, LedgerError>,
}

#[derive(Debug)]
pub struct BatchProcessor<S> {
    engine: TransferEngine<S>,
}

impl<S> Clone for BatchProcessor<S> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
        }
    }
}

impl<S: LedgerStore> BatchProcessor<S> {
    pub fn new(engine: TransferEngine<S>) -> Self {
        Self { engine }
    }

    /// Group requests by source account, preserving order within each group
    pub fn partition_by_source(
        &self,
        batch: Vec<TransferRequest>,
    ) -> HashMap<AccountId, Vec<TransferRequest>> {
        let mut partitions: HashMap<AccountId, Vec<TransferRequest>> = HashMap::new();

        for request in batch {
            partitions.entry(request.source).or_default().push(request);
        }

        partitions
    }

    /// Execute one partition's requests in order
    pub async fn process_partition(&self, requests: Vec<TransferRequest>) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(requests.len());

        for request in requests {
            let result = self.engine.execute_detailed(request.clone()).await;
            if let Err(err) = &result {
                warn!(
                    source = request.source,
                    destination = request.destination,
                    amount = %request.amount,
                    error = %err,
                    "Transfer rejected"
                );
            }
            results.push(ProcessingResult { request, result });
        }

        results
    }

    /// Execute a batch, running source partitions concurrently
    pub async fn process_batch(&self, batch: Vec<TransferRequest>) -> Vec<ProcessingResult> {
        let partitions = self.partition_by_source(batch);

        let mut tasks = Vec::with_capacity(partitions.len());
        for (_source, requests) in partitions {
            let processor = self.clone();
            tasks.push(tokio::spawn(async move {
                processor.process_partition(requests).await
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(partition_results) => results.extend(partition_results),
                Err(e) => error!(error = %e, "Partition task panicked"),
            }
        }

        results
    }
}
