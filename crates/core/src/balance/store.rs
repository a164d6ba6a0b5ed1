//! Account store contract.
//!
//! The coordinator never locks. Linearizability of concurrent updates rests
//! entirely on [`AccountStore::conditional_update`] being an atomic
//! compare-and-set keyed on the account version.

use async_trait::async_trait;
use rust_decimal::Decimal;
use tally_shared::types::AccountId;
use thiserror::Error;

use super::types::{Account, CommitOutcome, LedgerRecord, NewLedgerRecord};

/// Errors raised by an account store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Connectivity or other backend failure. Safe to retry.
    #[error("Store backend error: {0}")]
    Backend(String),

    /// The balance moved but its ledger row could not be written.
    ///
    /// Retrying would apply the operation a second time.
    #[error(
        "Account {account_id} advanced to version {version} but its ledger record was not written: {message}"
    )]
    LedgerAppend {
        /// Account whose balance moved.
        account_id: AccountId,
        /// Version the account advanced to.
        version: i64,
        /// Underlying append failure.
        message: String,
    },

    /// The commit was sent but its outcome is unknown, e.g. the connection
    /// dropped before the server acknowledged it.
    ///
    /// The update may have been applied, so retrying could apply it twice.
    #[error("Commit of account {account_id} at version {version} has an unknown outcome: {message}")]
    CommitUncertain {
        /// Account being updated.
        account_id: AccountId,
        /// Version the commit would advance to.
        version: i64,
        /// Underlying commit failure.
        message: String,
    },
}

impl StoreError {
    /// Returns true if the failed step can be retried from a fresh read.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}

/// Durable keyed storage for accounts and their append-only ledger.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Creates an account at version 0.
    async fn create_account(&self, initial_balance: Decimal) -> Result<Account, StoreError>;

    /// Point read of an account.
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Sets the balance and increments the version by one, only if the stored
    /// version still equals `expected_version`.
    ///
    /// Returns the number of rows affected: 1 if this writer won, 0 if another
    /// writer advanced the version first (or the account does not exist).
    async fn conditional_update(
        &self,
        id: AccountId,
        expected_version: i64,
        new_balance: Decimal,
    ) -> Result<u64, StoreError>;

    /// Appends a ledger record.
    async fn append_transaction(&self, record: NewLedgerRecord) -> Result<LedgerRecord, StoreError>;

    /// Lists an account's ledger records, oldest first.
    async fn list_transactions(&self, id: AccountId) -> Result<Vec<LedgerRecord>, StoreError>;

    /// Runs the conditional update and, if it won, appends `record`.
    ///
    /// The default implementation issues the two writes separately. A failed
    /// append after a won update is reported as [`StoreError::LedgerAppend`].
    /// Stores that can compose both writes atomically should override this.
    async fn commit_update(
        &self,
        id: AccountId,
        expected_version: i64,
        new_balance: Decimal,
        record: NewLedgerRecord,
    ) -> Result<CommitOutcome, StoreError> {
        if self.conditional_update(id, expected_version, new_balance).await? == 0 {
            return Ok(CommitOutcome::LostRace);
        }

        let version = record.version;
        match self.append_transaction(record).await {
            Ok(record) => Ok(CommitOutcome::Committed(record)),
            Err(err) => Err(StoreError::LedgerAppend {
                account_id: id,
                version,
                message: err.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(StoreError::Backend("timeout".into()), true)]
    #[case(StoreError::LedgerAppend { account_id: AccountId::new(), version: 3, message: "insert failed".into() }, false)]
    #[case(StoreError::CommitUncertain { account_id: AccountId::new(), version: 3, message: "connection reset".into() }, false)]
    fn test_only_backend_failures_are_retryable(#[case] err: StoreError, #[case] retryable: bool) {
        assert_eq!(err.is_retryable(), retryable);
    }
}
