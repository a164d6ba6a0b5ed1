//! In-memory account store.
//!
//! Backs the core tests and local experiments. Compare-and-set runs under
//! the account's `DashMap` shard lock, which makes it atomic with respect to
//! every other writer of the same account.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tally_shared::types::{AccountId, TransactionId};

use super::store::{AccountStore, StoreError};
use super::types::{Account, CommitOutcome, LedgerRecord, NewLedgerRecord};

/// `DashMap`-backed implementation of [`AccountStore`].
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: DashMap<AccountId, Account>,
    ledger: DashMap<AccountId, Vec<LedgerRecord>>,
}

impl InMemoryAccountStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of accounts held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns true if no account has been created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn push_record(&self, record: NewLedgerRecord) -> Result<LedgerRecord, StoreError> {
        let mut entries = self.ledger.entry(record.account_id).or_default();

        // Mirrors the UNIQUE(account_id, version) constraint of the SQL schema.
        if entries.iter().any(|e| e.version == record.version) {
            return Err(StoreError::Backend(format!(
                "duplicate ledger version {} for account {}",
                record.version, record.account_id
            )));
        }

        let stored = LedgerRecord {
            id: TransactionId::new(),
            account_id: record.account_id,
            operation: record.operation,
            amount_change: record.amount_change,
            balance: record.balance,
            version: record.version,
            created_at: Utc::now(),
        };
        entries.push(stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn create_account(&self, initial_balance: Decimal) -> Result<Account, StoreError> {
        let now = Utc::now();
        let account = Account {
            id: AccountId::new(),
            balance: initial_balance,
            initial_balance,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        self.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.get(&id).map(|entry| entry.value().clone()))
    }

    async fn conditional_update(
        &self,
        id: AccountId,
        expected_version: i64,
        new_balance: Decimal,
    ) -> Result<u64, StoreError> {
        let Some(mut account) = self.accounts.get_mut(&id) else {
            return Ok(0);
        };

        if account.version != expected_version {
            return Ok(0);
        }

        account.balance = new_balance;
        account.version += 1;
        account.updated_at = Utc::now();
        Ok(1)
    }

    async fn append_transaction(&self, record: NewLedgerRecord) -> Result<LedgerRecord, StoreError> {
        self.push_record(record)
    }

    async fn list_transactions(&self, id: AccountId) -> Result<Vec<LedgerRecord>, StoreError> {
        Ok(self
            .ledger
            .get(&id)
            .map(|entries| entries.value().clone())
            .unwrap_or_default())
    }

    /// Holds the account's write guard across both writes, so ledger rows
    /// are appended in version order and never missing.
    async fn commit_update(
        &self,
        id: AccountId,
        expected_version: i64,
        new_balance: Decimal,
        record: NewLedgerRecord,
    ) -> Result<CommitOutcome, StoreError> {
        let Some(mut account) = self.accounts.get_mut(&id) else {
            return Ok(CommitOutcome::LostRace);
        };

        if account.version != expected_version {
            return Ok(CommitOutcome::LostRace);
        }

        let stored = self.push_record(record)?;
        account.balance = new_balance;
        account.version += 1;
        account.updated_at = stored.created_at;
        Ok(CommitOutcome::Committed(stored))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::types::OperationType;
    use rust_decimal_macros::dec;

    fn record(account_id: AccountId, balance: Decimal, version: i64) -> NewLedgerRecord {
        NewLedgerRecord {
            account_id,
            operation: OperationType::Withdraw,
            amount_change: dec!(-10),
            balance,
            version,
        }
    }

    #[tokio::test]
    async fn test_create_starts_at_version_zero() {
        let store = InMemoryAccountStore::new();
        let account = store.create_account(dec!(1000)).await.unwrap();

        assert_eq!(account.version, 0);
        assert_eq!(account.balance, dec!(1000));
        assert_eq!(account.initial_balance, dec!(1000));
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get_account(account.id).await.unwrap(),
            Some(account)
        );
    }

    #[tokio::test]
    async fn test_get_missing_account() {
        let store = InMemoryAccountStore::new();
        assert!(store.get_account(AccountId::new()).await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_conditional_update_wins_on_matching_version() {
        let store = InMemoryAccountStore::new();
        let account = store.create_account(dec!(100)).await.unwrap();

        let affected = store
            .conditional_update(account.id, 0, dec!(90))
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let updated = store.get_account(account.id).await.unwrap().unwrap();
        assert_eq!(updated.balance, dec!(90));
        assert_eq!(updated.version, 1);
    }

    #[tokio::test]
    async fn test_conditional_update_loses_on_stale_version() {
        let store = InMemoryAccountStore::new();
        let account = store.create_account(dec!(100)).await.unwrap();
        store.conditional_update(account.id, 0, dec!(90)).await.unwrap();

        let affected = store
            .conditional_update(account.id, 0, dec!(80))
            .await
            .unwrap();
        assert_eq!(affected, 0);

        let current = store.get_account(account.id).await.unwrap().unwrap();
        assert_eq!(current.balance, dec!(90));
        assert_eq!(current.version, 1);
    }

    #[tokio::test]
    async fn test_conditional_update_on_missing_account() {
        let store = InMemoryAccountStore::new();
        let affected = store
            .conditional_update(AccountId::new(), 0, dec!(1))
            .await
            .unwrap();
        assert_eq!(affected, 0);
    }

    #[tokio::test]
    async fn test_ledger_keeps_insertion_order_and_rejects_duplicate_versions() {
        let store = InMemoryAccountStore::new();
        let account = store.create_account(dec!(100)).await.unwrap();

        store.append_transaction(record(account.id, dec!(90), 1)).await.unwrap();
        store.append_transaction(record(account.id, dec!(80), 2)).await.unwrap();
        let duplicate = store.append_transaction(record(account.id, dec!(70), 2)).await;
        assert!(matches!(duplicate, Err(StoreError::Backend(_))));

        let entries = store.list_transactions(account.id).await.unwrap();
        let versions: Vec<i64> = entries.iter().map(|e| e.version).collect();
        assert_eq!(versions, vec![1, 2]);
        assert!(store.list_transactions(AccountId::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_update_writes_balance_and_ledger_together() {
        let store = InMemoryAccountStore::new();
        let account = store.create_account(dec!(100)).await.unwrap();

        let outcome = store
            .commit_update(account.id, 0, dec!(90), record(account.id, dec!(90), 1))
            .await
            .unwrap();
        let CommitOutcome::Committed(stored) = outcome else {
            panic!("expected commit, got {outcome:?}");
        };
        assert_eq!(stored.version, 1);

        let stale = store
            .commit_update(account.id, 0, dec!(80), record(account.id, dec!(80), 1))
            .await
            .unwrap();
        assert_eq!(stale, CommitOutcome::LostRace);

        let current = store.get_account(account.id).await.unwrap().unwrap();
        assert_eq!(current.version, 1);
        assert_eq!(current.balance, dec!(90));
        assert_eq!(store.list_transactions(account.id).await.unwrap().len(), 1);
    }
}
