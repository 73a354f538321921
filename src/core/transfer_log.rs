//! Append-only transfer history
//!
//! Records are only ever added by a committing unit of work while it holds
//! both affected accounts. Nothing updates or deletes them.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;

use crate::types::{AccountId, TransferId, TransferRecord};

/// Page size used by account history when the caller does not choose one
pub const DEFAULT_HISTORY_TAKE: usize = 50;

/// Committed transfers keyed by id
#[derive(Debug)]
pub struct TransferLog {
    entries: DashMap<TransferId, TransferRecord>,
    next_id: AtomicU64,
}

impl TransferLog {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Append a transfer, assigning the next id
    pub(crate) fn append(
        &self,
        source: AccountId,
        destination: AccountId,
        amount: Decimal,
        created_at: DateTime<Utc>,
    ) -> TransferRecord {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = TransferRecord {
            id,
            source,
            destination,
            amount,
            created_at,
        };
        self.entries.insert(id, record.clone());
        record
    }

    pub fn get(&self, id: TransferId) -> Option<TransferRecord> {
        self.entries.get(&id).map(|entry| entry.value().clone())
    }

    /// Every transfer in ascending id order
    pub fn all(&self) -> Vec<TransferRecord> {
        let mut records: Vec<TransferRecord> = self
            .entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|record| record.id);
        records
    }

    /// Transfers where `account` is the source or the destination
    ///
    /// Newest first, skipping `skip` records and returning at most `take`.
    pub fn history(&self, account: AccountId, take: usize, skip: usize) -> Vec<TransferRecord> {
        let mut records: Vec<TransferRecord> = self
            .entries
            .iter()
            .filter(|entry| entry.value().touches(account))
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| b.id.cmp(&a.id));
        records.into_iter().skip(skip).take(take).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TransferLog {
    fn default() -> Self {
        Self::new()
    }
}
