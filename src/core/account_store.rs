//! Account balances with per-account write access
//!
//! This module provides the `AccountStore` struct, which owns every account and
//! its balance. Each account sits behind its own `tokio::sync::Mutex` inside a
//! `DashMap`, so transfers touching disjoint accounts proceed in parallel while
//! transfers sharing an account serialize on that account's lock.
//!
//! # Lock ordering
//!
//! [`AccountStore::lock_ordered`] acquires the locks of a set of accounts in
//! ascending id order regardless of the order the caller names them in. Two
//! transfers moving money in opposite directions between the same pair of
//! accounts therefore wait on the same lock first and cannot deadlock.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::types::{normalize_amount, Account, AccountId, CustomerId, LedgerError};

/// Concurrent account storage
///
/// Account ids opened through [`AccountStore::open_account`] come from a
/// monotonic sequence starting at 1 that always stays above any imported id.
#[derive(Debug)]
pub struct AccountStore {
    accounts: DashMap<AccountId, Arc<Mutex<Account>>>,
    next_id: AtomicU64,
}

impl AccountStore {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Open a new account for a customer with an initial deposit
    ///
    /// # Errors
    ///
    /// `InvalidRequest` if the deposit is negative or carries more than two
    /// fractional digits.
    pub fn open_account(
        &self,
        customer_id: CustomerId,
        initial_deposit: Decimal,
    ) -> Result<Account, LedgerError> {
        let balance = normalize_amount(initial_deposit)?;
        if balance < Decimal::ZERO {
            return Err(LedgerError::invalid_request(
                "initial deposit must not be negative",
            ));
        }

        loop {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            if let Entry::Vacant(slot) = self.accounts.entry(id) {
                let account = Account::new(id, customer_id, balance);
                slot.insert(Arc::new(Mutex::new(account.clone())));
                return Ok(account);
            }
        }
    }

    /// Insert an account with an explicit id
    ///
    /// Used to seed the store from an existing ledger.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` if the id is already taken or the balance is negative
    /// or over-precise.
    pub fn import(&self, account: Account) -> Result<Account, LedgerError> {
        let balance = normalize_amount(account.balance)?;
        if balance < Decimal::ZERO {
            return Err(LedgerError::invalid_request(format!(
                "account {} has a negative balance",
                account.id
            )));
        }
        let account = Account::new(account.id, account.customer_id, balance);

        match self.accounts.entry(account.id) {
            Entry::Occupied(_) => Err(LedgerError::invalid_request(format!(
                "account {} already exists",
                account.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(account.clone())));
                self.next_id
                    .fetch_max(account.id.saturating_add(1), Ordering::SeqCst);
                Ok(account)
            }
        }
    }

    fn handle(&self, id: AccountId) -> Option<Arc<Mutex<Account>>> {
        self.accounts.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Current committed state of an account
    ///
    /// Waits for any unit of work holding the account to finish.
    pub async fn get(&self, id: AccountId) -> Result<Account, LedgerError> {
        let handle = self
            .handle(id)
            .ok_or_else(|| LedgerError::account_not_found(id))?;
        let account = handle.lock().await.clone();
        Ok(account)
    }

    pub async fn balance(&self, id: AccountId) -> Result<Decimal, LedgerError> {
        Ok(self.get(id).await?.balance)
    }

    pub fn contains(&self, id: AccountId) -> bool {
        self.accounts.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Ids of every account, ascending
    pub fn ids(&self) -> Vec<AccountId> {
        let mut ids: Vec<AccountId> = self.accounts.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    /// Acquire write access to a set of accounts
    ///
    /// Every id is resolved before any lock is taken, so a missing account is
    /// reported (in the caller's order) without blocking. Locks are then taken
    /// in ascending id order; duplicates are locked once. The returned guards
    /// are sorted by account id.
    ///
    /// # Errors
    ///
    /// * `AccountNotFound` for the first unknown id
    /// * `Transient` if all locks are not acquired within `timeout`; any locks
    ///   already taken are released
    pub async fn lock_ordered(
        &self,
        ids: &[AccountId],
        timeout: Duration,
    ) -> Result<Vec<OwnedMutexGuard<Account>>, LedgerError> {
        let mut ordered = BTreeMap::new();
        for &id in ids {
            let handle = self
                .handle(id)
                .ok_or_else(|| LedgerError::account_not_found(id))?;
            ordered.entry(id).or_insert(handle);
        }

        let acquire = async move {
            let mut guards = Vec::with_capacity(ordered.len());
            for (_, handle) in ordered {
                guards.push(handle.lock_owned().await);
            }
            guards
        };

        tokio::time::timeout(timeout, acquire).await.map_err(|_| {
            LedgerError::transient(format!(
                "timed out after {:?} waiting for account locks {:?}",
                timeout, ids
            ))
        })
    }
}

impl Default for AccountStore {
    fn default() -> Self {
        Self::new()
    }
}
