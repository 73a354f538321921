//! Error types for the transfer ledger
//!
//! This module defines all error types that can occur while executing a
//! transfer or while reading and writing the CSV surface around it.
//!
//! # Error Categories
//!
//! - **Caller errors**: malformed request, unknown account
//! - **Business rule violations**: insufficient funds, idempotency key reuse
//! - **Transient failures**: store contention or timeout, safe to retry with
//!   identical parameters and the same idempotency key
//! - **File I/O and CSV errors**: only produced by the CLI pipeline

use rust_decimal::Decimal;
use thiserror::Error;

use super::account::AccountId;

/// Main error type for the ledger
///
/// Every failure is returned as a typed value so that a boundary layer can
/// map each kind to a precise response without inspecting messages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Bad input shape, same-account transfer or non-positive amount
    ///
    /// Not retryable without changing the request.
    #[error("Invalid request: {reason}")]
    InvalidRequest {
        /// Why the request was rejected
        reason: String,
    },

    /// Source or destination account does not exist
    #[error("Account {account} not found")]
    AccountNotFound {
        /// The account that was not found
        account: AccountId,
    },

    /// The source balance cannot cover the requested amount
    ///
    /// The transfer is rejected and both balances remain unchanged.
    #[error(
        "Insufficient funds in account {account}: available {available}, requested {requested}"
    )]
    InsufficientFunds {
        /// Debited account
        account: AccountId,
        /// Balance at the time of the check
        available: Decimal,
        /// Requested amount
        requested: Decimal,
    },

    /// An idempotency key was reused with a different request payload
    #[error("Idempotency key '{key}' was already used for a different request")]
    IdempotencyConflict {
        /// The reused key
        key: String,
    },

    /// Store contention or timeout
    ///
    /// Safe to retry with identical parameters and the same idempotency key.
    #[error("Transient store failure: {reason}")]
    Transient {
        /// Description of the failure
        reason: String,
    },

    /// File not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error occurred
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },
}

/// Field-free discriminant of [`LedgerError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidRequest,
    AccountNotFound,
    InsufficientFunds,
    IdempotencyConflict,
    Transient,
    Io,
}

impl LedgerError {
    /// The kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            LedgerError::AccountNotFound { .. } => ErrorKind::AccountNotFound,
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::IdempotencyConflict { .. } => ErrorKind::IdempotencyConflict,
            LedgerError::Transient { .. } => ErrorKind::Transient,
            LedgerError::FileNotFound { .. }
            | LedgerError::IoError { .. }
            | LedgerError::ParseError { .. } => ErrorKind::Io,
        }
    }

    /// Whether repeating the same request may succeed
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

// Conversion from io::Error to LedgerError
impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::IoError {
            message: error.to_string(),
        }
    }
}

// Conversion from csv::Error to LedgerError
impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl LedgerError {
    /// Create an InvalidRequest error
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        LedgerError::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Create an AccountNotFound error
    pub fn account_not_found(account: AccountId) -> Self {
        LedgerError::AccountNotFound { account }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(account: AccountId, available: Decimal, requested: Decimal) -> Self {
        LedgerError::InsufficientFunds {
            account,
            available,
            requested,
        }
    }

    /// Create an IdempotencyConflict error
    pub fn idempotency_conflict(key: &str) -> Self {
        LedgerError::IdempotencyConflict {
            key: key.to_string(),
        }
    }

    /// Create a Transient error
    pub fn transient(reason: impl Into<String>) -> Self {
        LedgerError::Transient {
            reason: reason.into(),
        }
    }

    /// Create a FileNotFound error
    pub fn file_not_found(path: &std::path::Path) -> Self {
        LedgerError::FileNotFound {
            path: path.display().to_string(),
        }
    }
}
