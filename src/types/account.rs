//! Account-related types for the transfer ledger
//!
//! This module defines the Account structure and the identifiers used to
//! reference accounts and their owning customers.

use rust_decimal::Decimal;

/// Account identifier
pub type AccountId = u64;

/// Identifier of the customer owning an account
pub type CustomerId = u64;

/// Account state
///
/// Represents a single account record as held by the account store.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// Unique account identifier
    pub id: AccountId,

    /// The customer who owns this account
    pub customer_id: CustomerId,

    /// Current balance with two fractional digits
    ///
    /// Never negative. Only mutated through a committed transfer.
    pub balance: Decimal,
}

impl Account {
    /// Create an account with the given opening balance
    ///
    /// # Arguments
    ///
    /// * `id` - The account ID
    /// * `customer_id` - The owning customer
    /// * `balance` - Opening balance
    pub fn new(id: AccountId, customer_id: CustomerId, balance: Decimal) -> Self {
        Account {
            id,
            customer_id,
            balance,
        }
    }
}
