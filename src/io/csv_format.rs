//! CSV format handling for transfer requests, account seeds and output
//!
//! This module centralizes all CSV format concerns, providing:
//! - `TransferCsvRecord` / `AccountCsvRecord` structures for deserialization
//! - Conversion from CSV records to domain types
//! - Account and transfer log output serialization
//!
//! All functions are pure (no file access) for easy testing.

use std::io::Write;

use chrono::SecondsFormat;
use serde::Deserialize;

use rust_decimal::Decimal;

use crate::types::{
    parse_amount, Account, AccountId, CustomerId, LedgerError, TransferRecord, TransferRequest,
};

/// Raw transfer row: `source,destination,amount,idempotency_key`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TransferCsvRecord {
    pub source: AccountId,
    pub destination: AccountId,
    pub amount: String,
    /// Blank or missing means no key
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// Raw account seed row: `account,customer,balance`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AccountCsvRecord {
    /// Blank means open a new account with the next free id
    #[serde(default)]
    pub account: Option<AccountId>,
    pub customer: CustomerId,
    pub balance: String,
}

/// Convert a transfer row into a request
///
/// The amount is parsed as a decimal string and brought to two fractional
/// digits; sign and account checks are left to the engine.
pub fn convert_transfer_record(record: TransferCsvRecord) -> Result<TransferRequest, LedgerError> {
    let amount = parse_amount(&record.amount)?;

    let idempotency_key = record
        .idempotency_key
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty());

    Ok(TransferRequest {
        source: record.source,
        destination: record.destination,
        amount,
        idempotency_key,
    })
}

/// Account seed row after parsing
#[derive(Debug, Clone, PartialEq)]
pub enum AccountSeed {
    /// Existing account carried over with its id
    Existing(Account),
    /// New account for a customer, id assigned by the store
    Open {
        customer_id: CustomerId,
        initial_deposit: Decimal,
    },
}

/// Convert an account seed row
pub fn convert_account_record(record: AccountCsvRecord) -> Result<AccountSeed, LedgerError> {
    let balance = parse_amount(&record.balance)?;

    Ok(match record.account {
        Some(id) => AccountSeed::Existing(Account::new(id, record.customer, balance)),
        None => AccountSeed::Open {
            customer_id: record.customer,
            initial_deposit: balance,
        },
    })
}

/// Write accounts as `account,customer,balance`, sorted by account id
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record(["account", "customer", "balance"])?;

    // Sort accounts by id for deterministic output
    let mut sorted_accounts = accounts.to_vec();
    sorted_accounts.sort_by_key(|account| account.id);

    for account in sorted_accounts {
        writer.write_record(&[
            account.id.to_string(),
            account.customer_id.to_string(),
            format!("{:.2}", account.balance),
        ])?;
    }

    writer.flush()?;

    Ok(())
}

/// Write the transfer log as `id,source,destination,amount,created_at`
///
/// Rows keep the order given; timestamps are RFC 3339 in UTC.
pub fn write_transfers_csv(
    transfers: &[TransferRecord],
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record(["id", "source", "destination", "amount", "created_at"])?;

    for transfer in transfers {
        writer.write_record(&[
            transfer.id.to_string(),
            transfer.source.to_string(),
            transfer.destination.to_string(),
            format!("{:.2}", transfer.amount),
            transfer
                .created_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        ])?;
    }

    writer.flush()?;

    Ok(())
}
