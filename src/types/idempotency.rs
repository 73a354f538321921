//! Idempotency types
//!
//! A [`Fingerprint`] is a SHA-256 digest over the semantic fields of a transfer
//! request. An [`IdempotencyRecord`] binds a client key to the fingerprint of
//! the request that first used it and to the transfer that request produced.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use super::account::AccountId;
use super::money::CURRENCY_SCALE;
use super::transfer::TransferRecord;

/// Deterministic digest of a transfer request's semantic fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Fingerprint a request by its source, destination and amount
    ///
    /// The amount is serialized at the ledger scale, so `10`, `10.0` and
    /// `10.00` produce the same digest.
    pub fn of(source: AccountId, destination: AccountId, amount: Decimal) -> Self {
        let mut canonical = amount;
        canonical.rescale(CURRENCY_SCALE);

        let mut hasher = Sha256::new();
        hasher.update(format!("{}|{}|{}", source, destination, canonical).as_bytes());
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&hasher.finalize());
        Self(digest)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Cached outcome of the first successful request for a key
#[derive(Debug, Clone, PartialEq)]
pub struct IdempotencyRecord {
    /// Client-supplied key
    pub key: String,

    /// Fingerprint of the request that registered the key
    pub fingerprint: Fingerprint,

    /// Transfer materialized by that request
    pub transfer: TransferRecord,

    /// Registration time
    pub created_at: DateTime<Utc>,

    /// After this instant the record is treated as absent
    pub expires_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Key registration requested as part of a commit
#[derive(Debug, Clone, PartialEq)]
pub struct IdempotencyClaim {
    pub key: String,
    pub fingerprint: Fingerprint,
}

impl IdempotencyClaim {
    pub fn new(key: impl Into<String>, fingerprint: Fingerprint) -> Self {
        Self {
            key: key.into(),
            fingerprint,
        }
    }
}
