//! Transfer-related types for the transfer ledger
//!
//! This module defines the inbound transfer request and the immutable record
//! appended to the transfer log once a transfer commits.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::account::AccountId;

/// Transfer identifier, assigned by the transfer log on commit
pub type TransferId = u64;

/// Request to move funds between two accounts
///
/// The amount is validated and normalized by the engine before any store
/// access, so a request may carry any decimal the caller supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    /// Account to debit
    pub source: AccountId,

    /// Account to credit
    pub destination: AccountId,

    /// Amount to move; must be positive with at most two fractional digits
    pub amount: Decimal,

    /// Client-supplied idempotency key (optional)
    pub idempotency_key: Option<String>,
}

impl TransferRequest {
    /// Create a transfer request without an idempotency key
    pub fn new(source: AccountId, destination: AccountId, amount: Decimal) -> Self {
        Self {
            source,
            destination,
            amount,
            idempotency_key: None,
        }
    }

    /// Create a transfer request carrying a client idempotency key
    pub fn with_idempotency_key(
        source: AccountId,
        destination: AccountId,
        amount: Decimal,
        key: impl Into<String>,
    ) -> Self {
        Self {
            source,
            destination,
            amount,
            idempotency_key: Some(key.into()),
        }
    }
}

/// Committed transfer
///
/// Immutable once appended to the transfer log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferRecord {
    /// Unique transfer ID
    pub id: TransferId,

    /// Debited account
    pub source: AccountId,

    /// Credited account
    pub destination: AccountId,

    /// Amount moved, always positive with two fractional digits
    pub amount: Decimal,

    /// Server-assigned commit timestamp
    pub created_at: DateTime<Utc>,
}

impl TransferRecord {
    /// True if the given account is either side of this transfer
    pub fn touches(&self, account: AccountId) -> bool {
        self.source == account || self.destination == account
    }
}
