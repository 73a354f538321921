//! In-memory transactional ledger
//!
//! `InMemoryLedger` composes the [`AccountStore`], [`TransferLog`] and
//! [`IdempotencyCache`] behind the [`LedgerStore`] trait.
//!
//! # Units of work
//!
//! [`InMemoryLedger::begin`] locks the involved accounts in ascending id order
//! and hands back an [`InMemoryUnit`] holding the guards. Balance changes are
//! staged on the unit; the guarded accounts are only written on commit. A
//! keyed commit runs inside the idempotency registration, so the balance
//! writes, the log append and the key registration become visible together, or
//! not at all when the key is already taken.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::OwnedMutexGuard;
use tracing::trace;

use super::account_store::AccountStore;
use super::idempotency::{IdempotencyCache, Registration};
use super::traits::{CommitOutcome, LedgerStore, NewTransfer, UnitOfWork};
use super::transfer_log::TransferLog;
use crate::config::EngineConfig;
use crate::types::{
    Account, AccountId, IdempotencyClaim, IdempotencyRecord, LedgerError, TransferRecord,
};

#[derive(Debug)]
pub struct InMemoryLedger {
    accounts: AccountStore,
    transfers: Arc<TransferLog>,
    idempotency: Arc<IdempotencyCache>,
    lock_timeout: Duration,
}

impl InMemoryLedger {
    pub fn new(lock_timeout: Duration, idempotency_ttl: Duration) -> Self {
        Self {
            accounts: AccountStore::new(),
            transfers: Arc::new(TransferLog::new()),
            idempotency: Arc::new(IdempotencyCache::new(idempotency_ttl)),
            lock_timeout,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.lock_timeout, config.idempotency_ttl)
    }

    pub fn accounts(&self) -> &AccountStore {
        &self.accounts
    }

    pub fn transfers(&self) -> &TransferLog {
        &self.transfers
    }

    /// Shared handle to the transfer log
    pub fn transfer_log(&self) -> Arc<TransferLog> {
        Arc::clone(&self.transfers)
    }

    pub fn idempotency(&self) -> &IdempotencyCache {
        &self.idempotency
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    type Unit = InMemoryUnit;

    async fn account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.accounts.get(id).await
    }

    async fn begin(&self, accounts: &[AccountId]) -> Result<InMemoryUnit, LedgerError> {
        let guards = self.accounts.lock_ordered(accounts, self.lock_timeout).await?;
        trace!(accounts = ?accounts, "Unit of work opened");

        let slots = guards
            .into_iter()
            .map(|guard| Slot {
                staged: guard.balance,
                guard,
            })
            .collect();

        Ok(InMemoryUnit {
            slots,
            transfers: Arc::clone(&self.transfers),
            idempotency: Arc::clone(&self.idempotency),
        })
    }

    async fn lookup_idempotency(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<IdempotencyRecord>, LedgerError> {
        Ok(self.idempotency.lookup(key, now))
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, LedgerError> {
        Ok(self.idempotency.sweep_expired(now))
    }
}

#[derive(Debug)]
struct Slot {
    guard: OwnedMutexGuard<Account>,
    staged: Decimal,
}

/// Unit of work over locked accounts of an [`InMemoryLedger`]
///
/// Holds the account locks until it is committed or dropped.
#[derive(Debug)]
pub struct InMemoryUnit {
    slots: Vec<Slot>,
    transfers: Arc<TransferLog>,
    idempotency: Arc<IdempotencyCache>,
}

impl InMemoryUnit {
    fn slot(&self, id: AccountId) -> Result<&Slot, LedgerError> {
        self.slots
            .iter()
            .find(|slot| slot.guard.id == id)
            .ok_or_else(|| LedgerError::account_not_found(id))
    }

    fn slot_mut(&mut self, id: AccountId) -> Result<&mut Slot, LedgerError> {
        self.slots
            .iter_mut()
            .find(|slot| slot.guard.id == id)
            .ok_or_else(|| LedgerError::account_not_found(id))
    }
}

fn staged_view(slot: &Slot) -> Account {
    Account::new(slot.guard.id, slot.guard.customer_id, slot.staged)
}

fn write_through(
    slots: &mut [Slot],
    transfers: &TransferLog,
    transfer: NewTransfer,
    now: DateTime<Utc>,
) -> TransferRecord {
    for slot in slots.iter_mut() {
        slot.guard.balance = slot.staged;
    }
    transfers.append(transfer.source, transfer.destination, transfer.amount, now)
}

#[async_trait]
impl UnitOfWork for InMemoryUnit {
    async fn account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.slot(id).map(staged_view)
    }

    async fn apply_delta(
        &mut self,
        id: AccountId,
        delta: Decimal,
    ) -> Result<Account, LedgerError> {
        let slot = self.slot_mut(id)?;
        let updated = slot.staged.checked_add(delta).ok_or_else(|| {
            LedgerError::invalid_request(format!("balance overflow on account {}", id))
        })?;

        if updated < Decimal::ZERO {
            return Err(LedgerError::insufficient_funds(id, slot.staged, -delta));
        }

        slot.staged = updated;
        Ok(staged_view(slot))
    }

    async fn commit(
        self,
        transfer: NewTransfer,
        claim: Option<IdempotencyClaim>,
    ) -> Result<CommitOutcome, LedgerError> {
        let InMemoryUnit {
            mut slots,
            transfers,
            idempotency,
        } = self;
        let now = Utc::now();

        let outcome = match claim {
            None => CommitOutcome::Committed(write_through(&mut slots, &transfers, transfer, now)),
            Some(claim) => {
                let registration = idempotency.register_with(&claim, now, || {
                    write_through(&mut slots, &transfers, transfer, now)
                });
                match registration {
                    Registration::Registered(record) => CommitOutcome::Committed(record.transfer),
                    Registration::Existing(record) => CommitOutcome::KeyTaken(record),
                }
            }
        };

        // Guards in `slots` are released here.
        Ok(outcome)
    }
}
