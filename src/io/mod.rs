//! I/O module
//!
//! Handles CSV parsing and output.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (record conversion, output serialization)
//! - `sync_reader` - Synchronous transfer reader with iterator interface, account seed loader
//! - `async_reader` - Asynchronous transfer reader with batch reading interface

pub mod async_reader;
pub mod csv_format;
pub mod sync_reader;

pub use async_reader::AsyncReader;
pub use csv_format::{
    convert_account_record, convert_transfer_record, write_accounts_csv, write_transfers_csv,
    AccountCsvRecord, AccountSeed, TransferCsvRecord,
};
pub use sync_reader::{read_accounts, SyncReader};
