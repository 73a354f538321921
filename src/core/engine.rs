//! Transfer execution
//!
//! This module provides the `TransferEngine` struct, which executes a transfer
//! request exactly once per idempotency key and atomically per request.
//!
//! # Flow
//!
//! ```text
//! execute(request)
//!     ├── validate shape (distinct accounts, positive two-digit amount)
//!     ├── fingerprint(source, destination, amount)
//!     ├── idempotency lookup ── hit ──> replay (or IdempotencyConflict)
//!     └── attempt loop (bounded, Transient only)
//!         ├── begin(source, destination)   ascending lock order
//!         ├── idempotency lookup ── hit ──> replay winner
//!         ├── debit source                 InsufficientFunds aborts
//!         ├── credit destination
//!         └── commit(transfer, key claim)  KeyTaken ──> replay winner
//! ```
//!
//! # Thread Safety
//!
//! The engine holds no mutable state of its own. It is cheap to clone and can
//! be shared across tasks; the store serializes conflicting units of work.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::traits::{CommitOutcome, LedgerStore, NewTransfer, UnitOfWork};
use crate::config::EngineConfig;
use crate::types::{
    normalize_amount, AccountId, Fingerprint, IdempotencyClaim, IdempotencyRecord, LedgerError,
    TransferRecord, TransferRequest,
};

/// Result of a successful [`TransferEngine::execute_detailed`] call
#[derive(Debug, Clone, PartialEq)]
pub struct TransferOutcome {
    /// The committed transfer
    pub record: TransferRecord,

    /// True when the record was served from the idempotency cache
    pub replayed: bool,
}

/// Orchestrates validation, idempotency and the atomic balance update
#[derive(Debug)]
pub struct TransferEngine<S> {
    /// Injected store handle
    store: Arc<S>,

    config: EngineConfig,
}

impl<S> Clone for TransferEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: LedgerStore> TransferEngine<S> {
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute a transfer
    ///
    /// # Arguments
    ///
    /// * `request` - Source, destination, amount and optional idempotency key
    ///
    /// # Returns
    ///
    /// * `Ok(TransferRecord)` - the committed transfer, or the transfer
    ///   originally committed under the same key
    /// * `Err(LedgerError)` - see [`TransferEngine::execute_detailed`]
    pub async fn execute(&self, request: TransferRequest) -> Result<TransferRecord, LedgerError> {
        self.execute_detailed(request)
            .await
            .map(|outcome| outcome.record)
    }

    /// Execute a transfer and report whether it was replayed
    ///
    /// # Errors
    ///
    /// * `InvalidRequest` - same account on both sides, or an amount that is
    ///   not positive or has more than two fractional digits; the store is not
    ///   touched
    /// * `IdempotencyConflict` - the key is held by a request with a different
    ///   payload
    /// * `AccountNotFound` / `InsufficientFunds` - nothing was written
    /// * `Transient` - retries were exhausted; the same request with the same
    ///   key may be sent again
    pub async fn execute_detailed(
        &self,
        request: TransferRequest,
    ) -> Result<TransferOutcome, LedgerError> {
        let amount = validate(&request)?;
        let fingerprint = Fingerprint::of(request.source, request.destination, amount);
        let claim = request
            .idempotency_key
            .as_ref()
            .map(|key| IdempotencyClaim::new(key.clone(), fingerprint));

        if let Some(claim) = &claim {
            if let Some(existing) = self.store.lookup_idempotency(&claim.key, Utc::now()).await? {
                return replay(fingerprint, existing);
            }
        }

        let transfer = NewTransfer {
            source: request.source,
            destination: request.destination,
            amount,
        };

        let mut attempt: u32 = 0;
        loop {
            match self.attempt(transfer, claim.clone()).await {
                Ok(CommitOutcome::Committed(record)) => {
                    info!(
                        id = record.id,
                        source = record.source,
                        destination = record.destination,
                        amount = %record.amount,
                        "Transfer committed"
                    );
                    return Ok(TransferOutcome {
                        record,
                        replayed: false,
                    });
                }
                Ok(CommitOutcome::KeyTaken(existing)) => {
                    debug!(key = %existing.key, "Idempotency key claimed concurrently");
                    return replay(fingerprint, existing);
                }
                Err(err) if err.is_retryable() && attempt < self.config.max_commit_retries => {
                    attempt += 1;
                    warn!(
                        attempt,
                        max_retries = self.config.max_commit_retries,
                        error = %err,
                        "Transient failure, retrying transfer"
                    );
                    tokio::time::sleep(self.config.retry_backoff * attempt).await;
                }
                Err(err) if !err.is_retryable() => {
                    // A concurrent request may have claimed the key on other
                    // accounts while this one was failing.
                    if let Some(claim) = &claim {
                        if let Some(existing) =
                            self.store.lookup_idempotency(&claim.key, Utc::now()).await?
                        {
                            return replay(fingerprint, existing);
                        }
                    }
                    return Err(err);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Convenience wrapper taking the transfer fields directly
    pub async fn create_transfer(
        &self,
        source: AccountId,
        destination: AccountId,
        amount: Decimal,
        idempotency_key: Option<&str>,
    ) -> Result<TransferRecord, LedgerError> {
        let request = TransferRequest {
            source,
            destination,
            amount,
            idempotency_key: idempotency_key.map(str::to_string),
        };
        self.execute(request).await
    }

    async fn attempt(
        &self,
        transfer: NewTransfer,
        claim: Option<IdempotencyClaim>,
    ) -> Result<CommitOutcome, LedgerError> {
        let mut unit = self
            .store
            .begin(&[transfer.source, transfer.destination])
            .await?;

        // Same-key requests queue on the same locks; the winner may have
        // committed while this one waited.
        if let Some(claim) = &claim {
            if let Some(existing) = self.store.lookup_idempotency(&claim.key, Utc::now()).await? {
                return Ok(CommitOutcome::KeyTaken(existing));
            }
        }

        unit.apply_delta(transfer.source, -transfer.amount).await?;
        unit.apply_delta(transfer.destination, transfer.amount)
            .await?;

        unit.commit(transfer, claim).await
    }
}

fn validate(request: &TransferRequest) -> Result<Decimal, LedgerError> {
    if request.source == request.destination {
        return Err(LedgerError::invalid_request(
            "source and destination accounts must differ",
        ));
    }

    let amount = normalize_amount(request.amount)?;
    if amount <= Decimal::ZERO {
        return Err(LedgerError::invalid_request(format!(
            "amount must be positive, got {}",
            amount
        )));
    }

    if let Some(key) = &request.idempotency_key {
        if key.trim().is_empty() {
            return Err(LedgerError::invalid_request(
                "idempotency key must not be blank",
            ));
        }
    }

    Ok(amount)
}

fn replay(
    fingerprint: Fingerprint,
    existing: IdempotencyRecord,
) -> Result<TransferOutcome, LedgerError> {
    if existing.fingerprint != fingerprint {
        warn!(key = %existing.key, "Idempotency key reused with a different payload");
        return Err(LedgerError::idempotency_conflict(&existing.key));
    }

    debug!(key = %existing.key, id = existing.transfer.id, "Replaying cached transfer");
    Ok(TransferOutcome {
        record: existing.transfer,
        replayed: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::{InMemoryLedger, InMemoryUnit};
    use crate::types::Account;
    use async_trait::async_trait;
    use chrono::DateTime;
    use rstest::rstest;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn dec(raw: &str) -> Decimal {
        raw.parse().unwrap()
    }

    fn test_config() -> EngineConfig {
        EngineConfig::default()
            .with_retry_backoff(Duration::from_millis(1))
            .with_lock_timeout(Duration::from_millis(200))
    }

    fn engine_with(balances: &[(AccountId, &str)]) -> TransferEngine<InMemoryLedger> {
        let config = test_config();
        let ledger = InMemoryLedger::from_config(&config);
        for (id, balance) in balances {
            ledger
                .accounts()
                .import(Account::new(*id, *id, dec(balance)))
                .unwrap();
        }
        TransferEngine::new(Arc::new(ledger), config)
    }

    async fn balance(engine: &TransferEngine<InMemoryLedger>, id: AccountId) -> Decimal {
        engine.store().accounts().balance(id).await.unwrap()
    }

    #[tokio::test]
    async fn test_transfer_moves_funds_and_conserves_total() {
        let engine = engine_with(&[(1, "100.00"), (2, "25.50")]);

        let record = engine
            .create_transfer(1, 2, dec("40.25"), None)
            .await
            .unwrap();

        assert_eq!(record.id, 1);
        assert_eq!(record.source, 1);
        assert_eq!(record.destination, 2);
        assert_eq!(record.amount.to_string(), "40.25");
        assert_eq!(balance(&engine, 1).await, dec("59.75"));
        assert_eq!(balance(&engine, 2).await, dec("65.75"));
        assert_eq!(
            balance(&engine, 1).await + balance(&engine, 2).await,
            dec("125.50")
        );
        assert_eq!(engine.store().transfers().len(), 1);
    }

    #[tokio::test]
    async fn test_transfer_of_entire_balance_leaves_zero() {
        let engine = engine_with(&[(1, "10"), (2, "0")]);

        engine.create_transfer(1, 2, dec("10"), None).await.unwrap();

        assert_eq!(balance(&engine, 1).await, Decimal::ZERO);
    }

    #[rstest]
    #[case::self_transfer(1, 1, "10")]
    #[case::zero_amount(1, 2, "0")]
    #[case::negative_amount(1, 2, "-5")]
    #[case::too_precise(1, 2, "0.001")]
    #[tokio::test]
    async fn test_invalid_requests_are_rejected(
        #[case] source: AccountId,
        #[case] destination: AccountId,
        #[case] amount: &str,
    ) {
        let engine = engine_with(&[(1, "100"), (2, "0")]);

        let err = engine
            .create_transfer(source, destination, dec(amount), None)
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::InvalidRequest { .. }));
        assert_eq!(balance(&engine, 1).await, dec("100"));
        assert!(engine.store().transfers().is_empty());
    }

    #[tokio::test]
    async fn test_self_transfer_rejected_before_store_access() {
        // Account 9 does not exist; shape validation must win.
        let engine = engine_with(&[]);

        let err = engine
            .create_transfer(9, 9, dec("10"), None)
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn test_insufficient_funds_leaves_balances_unchanged() {
        let engine = engine_with(&[(1, "100.00"), (2, "5.00")]);

        let err = engine
            .create_transfer(1, 2, dec("150.00"), None)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            LedgerError::insufficient_funds(1, dec("100.00"), dec("150.00"))
        );
        assert_eq!(balance(&engine, 1).await, dec("100.00"));
        assert_eq!(balance(&engine, 2).await, dec("5.00"));
        assert!(engine.store().transfers().is_empty());
    }

    #[rstest]
    #[case::missing_source(9, 2, 9)]
    #[case::missing_destination(1, 9, 9)]
    #[case::both_missing_reports_source(8, 9, 8)]
    #[tokio::test]
    async fn test_missing_account_mutates_nothing(
        #[case] source: AccountId,
        #[case] destination: AccountId,
        #[case] missing: AccountId,
    ) {
        let engine = engine_with(&[(1, "100"), (2, "0")]);

        let err = engine
            .create_transfer(source, destination, dec("10"), None)
            .await
            .unwrap_err();

        assert_eq!(err, LedgerError::account_not_found(missing));
        assert_eq!(balance(&engine, 1).await, dec("100"));
        assert_eq!(balance(&engine, 2).await, dec("0"));
        assert!(engine.store().transfers().is_empty());
    }

    #[tokio::test]
    async fn test_idempotent_replay_returns_identical_record() {
        let engine = engine_with(&[(1, "100"), (2, "0")]);
        let request = TransferRequest::with_idempotency_key(1, 2, dec("10"), "key-1");

        let first = engine.execute_detailed(request.clone()).await.unwrap();
        let second = engine.execute_detailed(request).await.unwrap();

        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(first.record, second.record);
        assert_eq!(engine.store().transfers().len(), 1);
        assert_eq!(balance(&engine, 1).await, dec("90"));
    }

    #[tokio::test]
    async fn test_replay_matches_equivalent_amount_scale() {
        let engine = engine_with(&[(1, "100"), (2, "0")]);

        let first = engine
            .create_transfer(1, 2, dec("10"), Some("key-1"))
            .await
            .unwrap();
        let second = engine
            .create_transfer(1, 2, dec("10.00"), Some("key-1"))
            .await
            .unwrap();

        assert_eq!(first, second);
    }

    #[rstest]
    #[case::different_amount(1, 2, "11")]
    #[case::different_destination(1, 3, "10")]
    #[case::reversed_direction(2, 1, "10")]
    #[tokio::test]
    async fn test_key_reuse_with_different_payload_conflicts(
        #[case] source: AccountId,
        #[case] destination: AccountId,
        #[case] amount: &str,
    ) {
        let engine = engine_with(&[(1, "100"), (2, "100"), (3, "0")]);
        engine
            .create_transfer(1, 2, dec("10"), Some("key-1"))
            .await
            .unwrap();

        let err = engine
            .create_transfer(source, destination, dec(amount), Some("key-1"))
            .await
            .unwrap_err();

        assert_eq!(err, LedgerError::idempotency_conflict("key-1"));
        assert_eq!(engine.store().transfers().len(), 1);
        assert_eq!(balance(&engine, 1).await, dec("90"));
    }

    #[tokio::test]
    async fn test_failed_transfer_does_not_claim_key() {
        let engine = engine_with(&[(1, "5"), (2, "0")]);

        let err = engine
            .create_transfer(1, 2, dec("10"), Some("key-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert!(engine.store().idempotency().is_empty());

        engine.store().accounts().import(Account::new(3, 3, dec("50"))).unwrap();
        engine.create_transfer(3, 1, dec("20"), None).await.unwrap();

        let record = engine
            .create_transfer(1, 2, dec("10"), Some("key-1"))
            .await
            .unwrap();
        assert_eq!(record.amount, dec("10"));
        assert_eq!(balance(&engine, 2).await, dec("10"));
    }

    #[tokio::test]
    async fn test_expired_key_executes_again() {
        let config = test_config().with_idempotency_ttl(Duration::from_millis(20));
        let ledger = InMemoryLedger::from_config(&config);
        ledger.accounts().import(Account::new(1, 1, dec("100"))).unwrap();
        ledger.accounts().import(Account::new(2, 2, dec("0"))).unwrap();
        let engine = TransferEngine::new(Arc::new(ledger), config);

        let first = engine
            .create_transfer(1, 2, dec("10"), Some("key-1"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        let second = engine
            .create_transfer(1, 2, dec("10"), Some("key-1"))
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(engine.store().transfers().len(), 2);
        assert_eq!(balance(&engine, 1).await, dec("80"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_debits_from_one_account_lose_no_update() {
        const N: u64 = 50;
        let mut balances = vec![(1, "50.00")];
        let destinations: Vec<AccountId> = (2..N + 2).collect();
        for id in &destinations {
            balances.push((*id, "0"));
        }
        let engine = engine_with(&balances);

        let tasks: Vec<_> = destinations
            .iter()
            .map(|&destination| {
                let engine = engine.clone();
                tokio::spawn(async move {
                    engine.create_transfer(1, destination, dec("1.00"), None).await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(balance(&engine, 1).await, Decimal::ZERO);
        assert_eq!(engine.store().transfers().len(), N as usize);
        for id in destinations {
            assert_eq!(balance(&engine, id).await, dec("1.00"));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_opposite_direction_transfers_do_not_deadlock() {
        let engine = engine_with(&[(1, "1000"), (2, "1000")]);

        let tasks: Vec<_> = (0..100)
            .map(|i| {
                let engine = engine.clone();
                let (source, destination) = if i % 2 == 0 { (1, 2) } else { (2, 1) };
                tokio::spawn(async move {
                    engine
                        .create_transfer(source, destination, dec("3.00"), None)
                        .await
                })
            })
            .collect();

        let all = tokio::time::timeout(Duration::from_secs(10), async {
            for task in tasks {
                task.await.unwrap().unwrap();
            }
        })
        .await;

        assert!(all.is_ok(), "opposite-direction transfers deadlocked");
        assert_eq!(balance(&engine, 1).await, dec("1000"));
        assert_eq!(balance(&engine, 2).await, dec("1000"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_same_key_materializes_once() {
        let engine = engine_with(&[(1, "100"), (2, "0")]);

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let engine = engine.clone();
                tokio::spawn(async move {
                    engine
                        .create_transfer(1, 2, dec("10"), Some("shared-key"))
                        .await
                })
            })
            .collect();

        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap().unwrap().id);
        }

        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(engine.store().transfers().len(), 1);
        assert_eq!(balance(&engine, 1).await, dec("90"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_key_waiting_on_locks_replays_when_balance_is_spent() {
        // The balance covers exactly one debit, so the request that loses the
        // lock race can only succeed by finding the winner's record.
        let engine = engine_with(&[(1, "10.00"), (2, "0")]);
        let held = engine.store().begin(&[1]).await.unwrap();

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let engine = engine.clone();
                tokio::spawn(async move {
                    engine
                        .create_transfer(1, 2, dec("10.00"), Some("spend-all"))
                        .await
                })
            })
            .collect();
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(held);

        let mut records = Vec::new();
        for task in tasks {
            records.push(task.await.unwrap().unwrap());
        }

        assert_eq!(records[0], records[1]);
        assert_eq!(engine.store().transfers().len(), 1);
        assert_eq!(balance(&engine, 1).await, Decimal::ZERO);
        assert_eq!(balance(&engine, 2).await, dec("10.00"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_key_different_payload_waiting_on_locks_conflicts() {
        let engine = engine_with(&[(1, "10.00"), (2, "0")]);
        let held = engine.store().begin(&[1]).await.unwrap();

        let tasks: Vec<_> = ["10.00", "5.00"]
            .into_iter()
            .map(|amount| {
                let engine = engine.clone();
                tokio::spawn(async move {
                    engine
                        .create_transfer(1, 2, dec(amount), Some("shared-key"))
                        .await
                })
            })
            .collect();
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(held);

        let mut results = Vec::new();
        for task in tasks {
            results.push(task.await.unwrap());
        }

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let err = results
            .into_iter()
            .find_map(Result::err)
            .expect("one request must be rejected");
        assert_eq!(err, LedgerError::idempotency_conflict("shared-key"));
        assert_eq!(engine.store().transfers().len(), 1);
    }

    /// Store double whose `begin` fails with `Transient` a set number of times
    ///
    /// It can also answer the first few idempotency lookups with a miss, the
    /// view of a request racing another one on the same key.
    struct FlakyLedger {
        inner: InMemoryLedger,
        failures_left: AtomicU32,
        begins: AtomicU32,
        stale_lookups_left: AtomicU32,
    }

    impl FlakyLedger {
        fn new(failures: u32) -> Self {
            let inner = InMemoryLedger::from_config(&test_config());
            inner.accounts().import(Account::new(1, 1, dec("100"))).unwrap();
            inner.accounts().import(Account::new(2, 2, dec("0"))).unwrap();
            Self {
                inner,
                failures_left: AtomicU32::new(failures),
                begins: AtomicU32::new(0),
                stale_lookups_left: AtomicU32::new(0),
            }
        }

        fn with_stale_lookups(self, count: u32) -> Self {
            self.stale_lookups_left.store(count, Ordering::SeqCst);
            self
        }
    }

    #[async_trait]
    impl LedgerStore for FlakyLedger {
        type Unit = InMemoryUnit;

        async fn account(&self, id: AccountId) -> Result<Account, LedgerError> {
            self.inner.account(id).await
        }

        async fn begin(&self, accounts: &[AccountId]) -> Result<InMemoryUnit, LedgerError> {
            self.begins.fetch_add(1, Ordering::SeqCst);
            let failing = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok();
            if failing {
                return Err(LedgerError::transient("simulated serialization failure"));
            }
            self.inner.begin(accounts).await
        }

        async fn lookup_idempotency(
            &self,
            key: &str,
            now: DateTime<Utc>,
        ) -> Result<Option<IdempotencyRecord>, LedgerError> {
            let stale = self
                .stale_lookups_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok();
            if stale {
                return Ok(None);
            }
            self.inner.lookup_idempotency(key, now).await
        }

        async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, LedgerError> {
            self.inner.sweep_expired(now).await
        }
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let store = Arc::new(FlakyLedger::new(2));
        let engine = TransferEngine::new(Arc::clone(&store), test_config());

        let record = engine.create_transfer(1, 2, dec("10"), None).await.unwrap();

        assert_eq!(record.id, 1);
        assert_eq!(store.begins.load(Ordering::SeqCst), 3);
        assert_eq!(store.inner.accounts().balance(1).await.unwrap(), dec("90"));
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let store = Arc::new(FlakyLedger::new(u32::MAX));
        let engine = TransferEngine::new(
            Arc::clone(&store),
            test_config().with_max_commit_retries(2),
        );

        let err = engine
            .create_transfer(1, 2, dec("10"), Some("key-1"))
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(store.begins.load(Ordering::SeqCst), 3);
        assert!(store.inner.transfers().is_empty());
        assert!(store.inner.idempotency().is_empty());
    }

    #[tokio::test]
    async fn test_business_failures_are_not_retried() {
        let store = Arc::new(FlakyLedger::new(0));
        let engine = TransferEngine::new(Arc::clone(&store), test_config());

        let err = engine
            .create_transfer(1, 2, dec("500"), None)
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert_eq!(store.begins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_business_failure_reports_key_claimed_concurrently() {
        // Both lookups before the debit miss the key; the debit then fails and
        // the key turns out to be held by a different transfer.
        let store = Arc::new(FlakyLedger::new(0).with_stale_lookups(2));
        let engine = TransferEngine::new(Arc::clone(&store), test_config());
        store
            .inner
            .idempotency()
            .register_with(
                &IdempotencyClaim::new("key-1", Fingerprint::of(1, 2, dec("10"))),
                Utc::now(),
                || store.inner.transfers().append(1, 2, dec("10"), Utc::now()),
            );

        let err = engine
            .create_transfer(2, 1, dec("10"), Some("key-1"))
            .await
            .unwrap_err();

        assert_eq!(err, LedgerError::idempotency_conflict("key-1"));
        assert_eq!(store.begins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_lock_timeout_surfaces_transient() {
        let engine = engine_with(&[(1, "100"), (2, "0")]);
        let engine = TransferEngine::new(
            Arc::clone(engine.store()),
            test_config().with_max_commit_retries(0),
        );

        let _held = engine.store().begin(&[1]).await.unwrap();
        let err = engine
            .create_transfer(1, 2, dec("10"), None)
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::Transient { .. }));
    }
}
