//! Processing strategy module for transfer files
//!
//! This module defines the Strategy pattern for complete transfer processing
//! pipelines: seeding accounts, reading transfer requests, executing them
//! through the engine and writing final balances. Strategies are selected at
//! runtime.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::cli::StrategyType;
use crate::config::EngineConfig;
use crate::core::{InMemoryLedger, LedgerStore, TransferLog, TransferOutcome};
use crate::io::{read_accounts, AccountSeed};
use crate::types::{Account, AccountId, LedgerError, TransferRecord};

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Summary of one pipeline run
#[derive(Debug, Clone, Default)]
pub struct ProcessingReport {
    /// Transfers committed by this run
    pub succeeded: usize,

    /// Requests answered from the idempotency cache
    pub replayed: usize,

    /// Requests rejected by the engine or skipped as malformed rows
    pub rejected: usize,

    /// Final account states, sorted by id
    pub accounts: Vec<Account>,

    /// Committed transfers in id order
    pub transfers: Vec<TransferRecord>,

    /// Transfer log of the run's ledger
    pub transfer_log: Arc<TransferLog>,
}

impl ProcessingReport {
    pub(crate) fn record(&mut self, result: &Result<TransferOutcome, LedgerError>) {
        match result {
            Ok(outcome) if outcome.replayed => self.replayed += 1,
            Ok(_) => self.succeeded += 1,
            Err(_) => self.rejected += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.replayed + self.rejected
    }

    /// Transfers touching `account`, newest first
    pub fn history(&self, account: AccountId, take: usize, skip: usize) -> Vec<TransferRecord> {
        self.transfer_log.history(account, take, skip)
    }

    pub(crate) fn finish(&mut self, ledger: &InMemoryLedger, accounts: Vec<Account>) {
        self.accounts = accounts;
        self.transfers = ledger.transfers().all();
        self.transfer_log = ledger.transfer_log();
    }
}

/// Processing strategy trait for complete transfer pipelines
pub trait ProcessingStrategy: Send + Sync {
    /// Seed accounts, execute transfers and write final balances
    ///
    /// # Arguments
    ///
    /// * `accounts_path` - Account seed CSV (`account,customer,balance`)
    /// * `transfers_path` - Transfers CSV (`source,destination,amount,idempotency_key`)
    /// * `output` - Writer receiving the final `account,customer,balance` CSV
    ///
    /// # Errors
    ///
    /// Returns an error if an input file cannot be opened, the runtime cannot
    /// be created, or the output cannot be written. Rejected transfers and
    /// malformed rows are logged and counted in the report instead.
    fn process(
        &self,
        accounts_path: &Path,
        transfers_path: &Path,
        output: &mut dyn Write,
    ) -> Result<ProcessingReport, LedgerError>;
}

/// Create a processing strategy based on the specified strategy type
///
/// `batch_config` is ignored by the sync strategy.
pub fn create_strategy(
    strategy_type: StrategyType,
    engine_config: EngineConfig,
    batch_config: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(engine_config)),
        StrategyType::Async => Box::new(AsyncProcessingStrategy::new(
            engine_config,
            batch_config.unwrap_or_default(),
        )),
    }
}

/// Build a ledger from the account seed file
///
/// Rows carrying an id are imported first; rows with a blank id are then
/// opened with fresh ids above every imported one. Rows that cannot be applied
/// (duplicate id, negative balance) are logged and skipped.
pub(crate) fn seed_ledger(
    accounts_path: &Path,
    config: &EngineConfig,
) -> Result<InMemoryLedger, LedgerError> {
    let ledger = InMemoryLedger::from_config(config);
    let mut to_open = Vec::new();

    for seed in read_accounts(accounts_path)? {
        match seed {
            AccountSeed::Existing(account) => {
                let id = account.id;
                if let Err(e) = ledger.accounts().import(account) {
                    warn!(account = id, error = %e, "Skipping account seed row");
                }
            }
            AccountSeed::Open {
                customer_id,
                initial_deposit,
            } => to_open.push((customer_id, initial_deposit)),
        }
    }

    for (customer_id, initial_deposit) in to_open {
        match ledger.accounts().open_account(customer_id, initial_deposit) {
            Ok(account) => info!(account = account.id, customer = customer_id, "Account opened"),
            Err(e) => warn!(customer = customer_id, error = %e, "Skipping account seed row"),
        }
    }

    Ok(ledger)
}

/// Committed state of `ids`, read through the store
pub(crate) async fn read_balances<S: LedgerStore>(
    store: &S,
    ids: &[AccountId],
) -> Result<Vec<Account>, LedgerError> {
    let mut accounts = Vec::with_capacity(ids.len());
    for &id in ids {
        accounts.push(store.account(id).await?);
    }
    Ok(accounts)
}
