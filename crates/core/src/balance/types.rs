//! Balance domain types: accounts, ledger records, and operation kinds.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, TransactionId};

/// Kind of balance operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    /// Adds funds to the account.
    Deposit,
    /// Removes funds from the account.
    Withdraw,
}

impl OperationType {
    /// Every supported operation, in display order.
    pub const ALL: [Self; 2] = [Self::Deposit, Self::Withdraw];

    /// Returns the wire name of the operation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deposit" => Ok(Self::Deposit),
            "withdraw" => Ok(Self::Withdraw),
            _ => Err(format!(
                "Unknown operation type: {s}. Valid values are: deposit, withdraw"
            )),
        }
    }
}

/// An account whose balance is mutated through optimistic concurrency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account ID.
    pub id: AccountId,
    /// Current balance, never negative.
    pub balance: Decimal,
    /// Balance the account was opened with.
    pub initial_balance: Decimal,
    /// Optimistic lock version, 0 at creation and +1 per applied operation.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// An immutable ledger row written once per applied balance operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    /// Record ID.
    pub id: TransactionId,
    /// Account the operation was applied to.
    pub account_id: AccountId,
    /// Operation kind.
    pub operation: OperationType,
    /// Signed change: positive for deposits, negative for withdrawals.
    pub amount_change: Decimal,
    /// Account balance after the operation.
    pub balance: Decimal,
    /// Account version after the operation.
    pub version: i64,
    /// Insertion timestamp.
    pub created_at: DateTime<Utc>,
}

/// Ledger row to be appended; the store assigns the ID and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerRecord {
    /// Account the operation was applied to.
    pub account_id: AccountId,
    /// Operation kind.
    pub operation: OperationType,
    /// Signed change.
    pub amount_change: Decimal,
    /// Account balance after the operation.
    pub balance: Decimal,
    /// Account version after the operation.
    pub version: i64,
}

/// Result of a compare-and-set balance write combined with its ledger append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The version matched; the balance moved and the ledger row was written.
    Committed(LedgerRecord),
    /// Another writer advanced the version first. Nothing was written.
    LostRace,
}
