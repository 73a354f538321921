//! Synchronous CSV readers
//!
//! Provides a streaming iterator over transfer requests and a loader for the
//! account seed file. Delegates CSV format concerns to the csv_format module.
//!
//! # Iterator Interface
//!
//! SyncReader implements the Iterator trait, yielding
//! `Result<TransferRequest, LedgerError>` for each CSV row:
//!
//! ```no_run
//! use transfer_ledger::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("transfers.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(request) => println!("Transfer: {:?}", request),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual row errors are yielded as Err variants carrying the line number
//! - The reader streams rows one at a time and never loads the whole file

use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use tracing::warn;

use crate::io::csv_format::{
    convert_account_record, convert_transfer_record, AccountCsvRecord, AccountSeed,
    TransferCsvRecord,
};
use crate::types::{LedgerError, TransferRequest};

fn open_csv(path: &Path) -> Result<csv::Reader<File>, LedgerError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => LedgerError::file_not_found(path),
        _ => LedgerError::IoError {
            message: format!("Failed to open file '{}': {}", path.display(), e),
        },
    })?;

    Ok(ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .buffer_capacity(8 * 1024)
        .from_reader(file))
}

fn with_line(err: LedgerError, line: u64) -> LedgerError {
    LedgerError::ParseError {
        line: Some(line),
        message: err.to_string(),
    }
}

/// Streaming reader over a transfers CSV file
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    /// Data rows consumed so far; the header is line 1
    line_num: u64,
}

impl SyncReader {
    pub fn new(path: &Path) -> Result<Self, LedgerError> {
        Ok(Self {
            reader: open_csv(path)?,
            line_num: 1,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<TransferRequest, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<TransferCsvRecord>();
        let row = deserializer.next()?;
        self.line_num += 1;

        Some(match row {
            Ok(record) => {
                convert_transfer_record(record).map_err(|e| with_line(e, self.line_num))
            }
            Err(e) => Err(LedgerError::from(e)),
        })
    }
}

/// Load every account seed row from a CSV file
///
/// Malformed rows are logged and skipped; a missing or unreadable file is an
/// error.
pub fn read_accounts(path: &Path) -> Result<Vec<AccountSeed>, LedgerError> {
    let mut reader = open_csv(path)?;
    let mut accounts = Vec::new();

    for (index, row) in reader.deserialize::<AccountCsvRecord>().enumerate() {
        let line = index as u64 + 2;
        match row.map_err(LedgerError::from).and_then(convert_account_record) {
            Ok(seed) => accounts.push(seed),
            Err(e) => warn!(line, error = %e, "Skipping malformed account row"),
        }
    }

    Ok(accounts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Account;
    use rust_decimal::Decimal;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[test]
    fn test_sync_reader_missing_file() {
        let err = SyncReader::new(Path::new("does-not-exist.csv")).unwrap_err();

        assert!(matches!(err, LedgerError::FileNotFound { .. }));
    }

    #[test]
    fn test_sync_reader_yields_requests_in_order() {
        let file = create_temp_csv(
            "source,destination,amount,idempotency_key\n\
             1,2,10.00,abc\n\
             2,1, 5 ,\n",
        );

        let requests: Vec<TransferRequest> = SyncReader::new(file.path())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].idempotency_key.as_deref(), Some("abc"));
        assert_eq!(requests[1].source, 2);
        assert_eq!(requests[1].amount, Decimal::new(500, 2));
        assert_eq!(requests[1].idempotency_key, None);
    }

    #[test]
    fn test_sync_reader_accepts_rows_without_key_column() {
        let file = create_temp_csv("source,destination,amount\n1,2,3\n");

        let mut reader = SyncReader::new(file.path()).unwrap();
        let request = reader.next().unwrap().unwrap();

        assert_eq!(request.idempotency_key, None);
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_sync_reader_reports_bad_rows_and_continues() {
        let file = create_temp_csv(
            "source,destination,amount,idempotency_key\n\
             1,2,ten,\n\
             x,2,1,\n\
             1,2,1,\n",
        );

        let results: Vec<_> = SyncReader::new(file.path()).unwrap().collect();

        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0].as_ref().unwrap_err(),
            &LedgerError::ParseError {
                line: Some(2),
                message: "Invalid request: invalid amount 'ten'".to_string()
            }
        );
        assert!(matches!(results[1], Err(LedgerError::ParseError { .. })));
        assert!(results[2].is_ok());
    }

    #[test]
    fn test_read_accounts_skips_malformed_rows() {
        let file = create_temp_csv(
            "account,customer,balance\n\
             1,10,100\n\
             2,20,oops\n\
             3,30,0.5\n\
             ,40,7\n",
        );

        let accounts = read_accounts(file.path()).unwrap();

        assert_eq!(
            accounts,
            vec![
                AccountSeed::Existing(Account::new(1, 10, Decimal::new(10000, 2))),
                AccountSeed::Existing(Account::new(3, 30, Decimal::new(50, 2))),
                AccountSeed::Open {
                    customer_id: 40,
                    initial_deposit: Decimal::new(700, 2),
                },
            ]
        );
    }
}
