//! Store abstractions used by the transfer engine
//!
//! The engine owns no state. Everything it reads or writes goes through a
//! [`LedgerStore`] handle injected at construction, and every balance mutation
//! happens inside a [`UnitOfWork`] that either commits as a whole or leaves no
//! trace.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::types::{
    Account, AccountId, IdempotencyClaim, IdempotencyRecord, LedgerError, TransferRecord,
};

/// Transfer fields handed to a commit; the store assigns id and timestamp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewTransfer {
    pub source: AccountId,
    pub destination: AccountId,
    pub amount: Decimal,
}

/// Outcome of [`UnitOfWork::commit`]
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// Balances were written and the transfer appended
    Committed(TransferRecord),
    /// A live record already holds the idempotency key; nothing was written
    KeyTaken(IdempotencyRecord),
}

/// Transactional store for accounts, transfers and idempotency records
///
/// Implementations must serialize units of work that share an account so that
/// no balance update is lost.
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    /// Unit of work type produced by [`LedgerStore::begin`]
    type Unit: UnitOfWork;

    /// Committed state of an account
    async fn account(&self, id: AccountId) -> Result<Account, LedgerError>;

    /// Open an atomic unit of work with write access to `accounts`
    ///
    /// # Errors
    ///
    /// * `AccountNotFound` if any account is absent; no access is held
    /// * `Transient` if write access is not granted within the store's timeout
    async fn begin(&self, accounts: &[AccountId]) -> Result<Self::Unit, LedgerError>;

    /// Live idempotency record for `key`; expired records count as absent
    async fn lookup_idempotency(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<IdempotencyRecord>, LedgerError>;

    /// Reclaim every idempotency record expired at `now`
    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, LedgerError>;
}

/// Atomic group of balance changes plus one transfer append
///
/// Dropping a unit without committing discards every staged change.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Account as seen inside this unit, staged changes included
    async fn account(&self, id: AccountId) -> Result<Account, LedgerError>;

    /// Stage a signed balance change
    ///
    /// # Errors
    ///
    /// `InsufficientFunds` if the staged balance would become negative.
    async fn apply_delta(&mut self, id: AccountId, delta: Decimal)
        -> Result<Account, LedgerError>;

    /// Write staged balances, append `transfer` and register `claim`
    ///
    /// All three happen together or not at all.
    async fn commit(
        self,
        transfer: NewTransfer,
        claim: Option<IdempotencyClaim>,
    ) -> Result<CommitOutcome, LedgerError>;
}
