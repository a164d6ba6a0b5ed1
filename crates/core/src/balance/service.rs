//! Account service: the boundary operations exposed to the API layer.

use std::sync::Arc;

use rust_decimal::Decimal;
use tally_shared::types::AccountId;
use tracing::info;

use super::audit::{self, AuditReport};
use super::coordinator::BalanceUpdateCoordinator;
use super::error::LedgerError;
use super::invariant::validate_initial_balance;
use super::retry::RetryPolicy;
use super::store::AccountStore;
use super::types::{Account, LedgerRecord, OperationType};

/// Account operations over a shared store.
///
/// Cheap to clone; clones share the store and the coordinator.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    coordinator: BalanceUpdateCoordinator,
}

impl AccountService {
    /// Creates a service over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn AccountStore>, policy: RetryPolicy) -> Self {
        let coordinator = BalanceUpdateCoordinator::new(Arc::clone(&store), policy);
        Self { store, coordinator }
    }

    /// Opens an account at version 0.
    pub async fn create_account(&self, initial_balance: Decimal) -> Result<Account, LedgerError> {
        validate_initial_balance(initial_balance)?;

        let account = self.store.create_account(initial_balance).await?;
        info!(
            account_id = %account.id,
            initial_balance = %account.balance,
            "Account created"
        );
        Ok(account)
    }

    /// Reads an account. Side-effect free.
    pub async fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.store
            .get_account(id)
            .await?
            .ok_or(LedgerError::AccountNotFound(id))
    }

    /// Applies a deposit or withdrawal. See [`BalanceUpdateCoordinator::update_balance`].
    pub async fn update_balance(
        &self,
        id: AccountId,
        amount: Decimal,
        operation: OperationType,
    ) -> Result<Account, LedgerError> {
        self.coordinator.update_balance(id, amount, operation).await
    }

    /// Lists the account's ledger, oldest first.
    pub async fn list_transactions(&self, id: AccountId) -> Result<Vec<LedgerRecord>, LedgerError> {
        self.get_account(id).await?;
        Ok(self.store.list_transactions(id).await?)
    }

    /// Replays the account's ledger and reports the first inconsistency.
    pub async fn audit_account(&self, id: AccountId) -> Result<AuditReport, LedgerError> {
        let account = self.get_account(id).await?;
        let records = self.store.list_transactions(id).await?;
        Ok(audit::replay(&account, &records))
    }
}
