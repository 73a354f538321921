//! Idempotency cache with expiry
//!
//! Maps client keys to the outcome of the first successful request that used
//! them. Registration is an insert-or-reject on the key: when two requests race
//! on the same key, exactly one materializes a transfer and the other gets the
//! winner's record back.
//!
//! Records expire `ttl` after registration. An expired record behaves exactly
//! like an absent one; it is dropped when next touched or by
//! [`IdempotencyCache::sweep_expired`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::types::{IdempotencyClaim, IdempotencyRecord, TransferRecord};

/// Result of an attempt to register a key
#[derive(Debug, Clone, PartialEq)]
pub enum Registration {
    /// The key was free; the transfer was materialized and recorded
    Registered(IdempotencyRecord),
    /// A live record already holds the key; nothing was materialized
    Existing(IdempotencyRecord),
}

#[derive(Debug)]
pub struct IdempotencyCache {
    entries: DashMap<String, IdempotencyRecord>,
    ttl: Duration,
}

impl IdempotencyCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Live record for `key`, if any
    pub fn lookup(&self, key: &str, now: DateTime<Utc>) -> Option<IdempotencyRecord> {
        // Clone out and release the shard before a possible removal.
        let record = self.entries.get(key).map(|entry| entry.value().clone())?;

        if record.is_expired(now) {
            self.entries
                .remove_if(key, |_, existing| existing.is_expired(now));
            return None;
        }

        Some(record)
    }

    /// Register `claim`, materializing the transfer only if the key is free
    ///
    /// `materialize` runs while the key's shard is held, so no other
    /// registration for the same key can interleave with it.
    pub fn register_with<F>(
        &self,
        claim: &IdempotencyClaim,
        now: DateTime<Utc>,
        materialize: F,
    ) -> Registration
    where
        F: FnOnce() -> TransferRecord,
    {
        match self.entries.entry(claim.key.clone()) {
            Entry::Occupied(mut occupied) => {
                if !occupied.get().is_expired(now) {
                    return Registration::Existing(occupied.get().clone());
                }
                let record = self.record(claim, materialize(), now);
                occupied.insert(record.clone());
                Registration::Registered(record)
            }
            Entry::Vacant(vacant) => {
                let record = self.record(claim, materialize(), now);
                vacant.insert(record.clone());
                Registration::Registered(record)
            }
        }
    }

    fn record(
        &self,
        claim: &IdempotencyClaim,
        transfer: TransferRecord,
        now: DateTime<Utc>,
    ) -> IdempotencyRecord {
        IdempotencyRecord {
            key: claim.key.clone(),
            fingerprint: claim.fingerprint,
            transfer,
            created_at: now,
            expires_at: self.expiry(now),
        }
    }

    /// Remove every expired record, returning how many were dropped
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, record| {
            let keep = !record.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
