//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account-related types
//! - `transfer`: Transfer requests and committed transfer records
//! - `money`: Fixed-point amount parsing and normalization
//! - `idempotency`: Request fingerprints and idempotency records
//! - `error`: Error types for the ledger

pub mod account;
pub mod error;
pub mod idempotency;
pub mod money;
pub mod transfer;

pub use account::{Account, AccountId, CustomerId};
pub use error::{ErrorKind, LedgerError};
pub use idempotency::{Fingerprint, IdempotencyClaim, IdempotencyRecord};
pub use money::{normalize_amount, parse_amount, CURRENCY_SCALE};
pub use transfer::{TransferId, TransferRecord, TransferRequest};
