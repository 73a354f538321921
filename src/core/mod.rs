//! Core business logic module
//!
//! This module contains the transfer ledger components:
//! - `traits` - Store abstractions (`LedgerStore`, `UnitOfWork`)
//! - `account_store` - Account balances with ordered per-account locking
//! - `transfer_log` - Append-only transfer history
//! - `idempotency` - Idempotency cache with TTL
//! - `memory` - In-memory transactional store composing the three above
//! - `engine` - Transfer execution orchestration
//! - `batch_processor` - Concurrent batch execution partitioned by source
//! - `sweeper` - Background reclamation of expired idempotency records

pub mod account_store;
pub mod batch_processor;
pub mod engine;
pub mod idempotency;
pub mod memory;
pub mod sweeper;
pub mod traits;
pub mod transfer_log;

pub use account_store::AccountStore;
pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use engine::{TransferEngine, TransferOutcome};
pub use idempotency::{IdempotencyCache, Registration};
pub use memory::{InMemoryLedger, InMemoryUnit};
pub use sweeper::spawn_idempotency_sweeper;
pub use traits::{CommitOutcome, LedgerStore, NewTransfer, UnitOfWork};
pub use transfer_log::{TransferLog, DEFAULT_HISTORY_TAKE};
