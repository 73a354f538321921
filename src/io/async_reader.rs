//! Asynchronous CSV reader with batch interface
//!
//! Provides a streaming interface over transfer requests from a CSV file.
//! Supports batch reading for efficient async processing.
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of TransferRequests
//!                  ↓
//!           csv_format module
//!           (TransferCsvRecord, convert_transfer_record)
//! ```

use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

use crate::io::csv_format::{convert_transfer_record, TransferCsvRecord};
use crate::types::TransferRequest;

pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    /// Rows consumed so far, malformed ones included
    rows: u64,
    rejected: u64,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            rows: 0,
            rejected: 0,
        }
    }

    /// Read up to `batch_size` valid requests
    ///
    /// Malformed rows are logged and skipped. An empty batch means the end of
    /// the input.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<TransferRequest> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<TransferCsvRecord>();

        while batch.len() < batch_size {
            let Some(row) = records.next().await else {
                break;
            };
            self.rows += 1;
            let line = self.rows + 1;

            match row {
                Ok(record) => match convert_transfer_record(record) {
                    Ok(request) => batch.push(request),
                    Err(e) => {
                        self.rejected += 1;
                        warn!(line, error = %e, "Skipping malformed transfer row");
                    }
                },
                Err(e) => {
                    self.rejected += 1;
                    warn!(line, error = %e, "CSV parse error");
                }
            }
        }

        batch
    }

    /// Number of rows skipped as malformed so far
    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}
