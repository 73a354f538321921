//! Transfer Ledger Library
//! # Overview
//!
//! This library moves funds between accounts with atomicity, balance
//! consistency and request idempotency, and ships a CSV batch pipeline with a
//! sync and an async strategy around it.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, TransferRequest, TransferRecord, LedgerError, ...)
//! - [`config`] - Engine configuration (retries, lock timeout, idempotency TTL)
//! - [`core`] - Business logic components:
//!   - [`core::engine`] - Transfer execution orchestration
//!   - [`core::account_store`] - Account balances with ordered per-account locking
//!   - [`core::transfer_log`] - Append-only transfer history
//!   - [`core::idempotency`] - Idempotency cache with expiry
//!   - [`core::memory`] - In-memory transactional store
//! - [`io`] - CSV reading and writing
//! - [`strategy`] - Sync and async processing pipelines
//! - [`cli`] - CLI arguments parsing
//! - [`logging`] - Tracing subscriber setup
//!
//! # Guarantees
//!
//! - A transfer debits the source and credits the destination by the same
//!   amount, or changes nothing
//! - No balance ever becomes negative
//! - Retrying a request with the same idempotency key and payload returns the
//!   original transfer; the same key with a different payload is rejected
//! - Concurrent transfers sharing an account never lose an update, and
//!   opposite-direction transfers cannot deadlock
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rust_decimal::Decimal;
//! use transfer_ledger::{EngineConfig, InMemoryLedger, TransferEngine};
//!
//! # async fn demo() -> Result<(), transfer_ledger::LedgerError> {
//! let config = EngineConfig::default();
//! let ledger = Arc::new(InMemoryLedger::from_config(&config));
//! let alice = ledger.accounts().open_account(1, Decimal::new(10_000, 2))?;
//! let bob = ledger.accounts().open_account(2, Decimal::ZERO)?;
//!
//! let engine = TransferEngine::new(ledger, config);
//! let record = engine
//!     .create_transfer(alice.id, bob.id, Decimal::new(2_500, 2), Some("order-42"))
//!     .await?;
//! assert_eq!(record.amount, Decimal::new(2_500, 2));
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod logging;
pub mod strategy;
pub mod types;

pub use config::EngineConfig;
pub use core::{
    InMemoryLedger, LedgerStore, TransferEngine, TransferLog, TransferOutcome, UnitOfWork,
};
pub use io::{write_accounts_csv, write_transfers_csv};
pub use strategy::ProcessingReport;
pub use types::{
    Account, AccountId, CustomerId, ErrorKind, Fingerprint, IdempotencyRecord, LedgerError,
    TransferId, TransferRecord, TransferRequest,
};
