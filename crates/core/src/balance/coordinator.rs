//! Optimistic-concurrency balance update coordinator.
//!
//! Each call runs a bounded retry loop:
//!
//! ```text
//! Reading -> Computing -> Writing -> Succeeded
//!                                 -> Retrying -> Reading
//!   any step                      -> FailedFast (validation, not found)
//!   budget spent                  -> FailedExhausted (conflict, operational)
//! ```
//!
//! The coordinator holds no lock. A lost compare-and-set race simply means
//! the read was stale, so the next attempt starts from a fresh read and
//! re-evaluates the balance invariant against it.

use std::sync::Arc;

use rust_decimal::Decimal;
use tally_shared::types::AccountId;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, instrument, warn};

use super::error::LedgerError;
use super::invariant::{apply_operation, signed_amount, validate_amount};
use super::retry::RetryPolicy;
use super::store::{AccountStore, StoreError};
use super::types::{Account, CommitOutcome, LedgerRecord, NewLedgerRecord, OperationType};

/// Outcome of a single read-compute-write attempt.
#[derive(Debug)]
enum Attempt {
    Committed(Account),
    LostRace { seen_version: i64 },
}

/// Why an attempt failed.
#[derive(Debug)]
enum AttemptError {
    /// Retrying cannot help.
    Fatal(LedgerError),
    /// Transient store failure; counts against the retry budget.
    Store(StoreError),
}

impl From<LedgerError> for AttemptError {
    fn from(err: LedgerError) -> Self {
        Self::Fatal(err)
    }
}

impl From<StoreError> for AttemptError {
    fn from(err: StoreError) -> Self {
        if err.is_retryable() {
            Self::Store(err)
        } else {
            Self::Fatal(LedgerError::Operational(err.to_string()))
        }
    }
}

/// Applies deposits and withdrawals through version compare-and-set.
#[derive(Clone)]
pub struct BalanceUpdateCoordinator {
    store: Arc<dyn AccountStore>,
    policy: RetryPolicy,
}

impl BalanceUpdateCoordinator {
    /// Creates a coordinator over `store` with an immutable retry policy.
    #[must_use]
    pub fn new(store: Arc<dyn AccountStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Applies `amount` to the account as a deposit or withdrawal.
    ///
    /// Returns the account as read back after the winning write.
    ///
    /// # Errors
    ///
    /// - Validation errors (`ZeroAmount`, `InvalidPrecision`,
    ///   `InsufficientFunds`) and `AccountNotFound` are returned immediately.
    /// - `Conflict` when every attempt lost the version race, or the deadline
    ///   ran out.
    /// - `Operational` when the last attempt failed in the store, or when the
    ///   balance moved without its ledger record.
    #[instrument(skip_all, fields(account_id = %account_id, operation = %operation, amount = %amount))]
    pub async fn update_balance(
        &self,
        account_id: AccountId,
        amount: Decimal,
        operation: OperationType,
    ) -> Result<Account, LedgerError> {
        validate_amount(amount)?;
        let delta = signed_amount(amount, operation);

        let started = Instant::now();
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 0..max_attempts {
            let is_last = attempt + 1 == max_attempts;

            match self.attempt(account_id, operation, delta).await {
                Ok(Attempt::Committed(account)) => {
                    debug!(
                        attempt,
                        version = account.version,
                        balance = %account.balance,
                        "Balance update committed"
                    );
                    return Ok(account);
                }
                Ok(Attempt::LostRace { seen_version }) => {
                    debug!(attempt, seen_version, "Lost version race, retrying from a fresh read");
                }
                Err(AttemptError::Fatal(err)) => {
                    debug!(attempt, error = %err, "Balance update rejected");
                    return Err(err);
                }
                Err(AttemptError::Store(err)) => {
                    if is_last {
                        error!(attempt, error = %err, "Balance update failed after maximum retries");
                        return Err(LedgerError::Operational(format!(
                            "Failed operation after {max_attempts} attempts: {err}"
                        )));
                    }
                    warn!(attempt, error = %err, "Store failure during balance update, retrying");
                }
            }

            if is_last {
                break;
            }

            let delay = self.policy.backoff_delay(attempt);
            if let Some(deadline) = self.policy.deadline
                && started.elapsed() + delay >= deadline
            {
                warn!(
                    attempts = attempt + 1,
                    elapsed = ?started.elapsed(),
                    "Balance update deadline reached"
                );
                return Err(LedgerError::Conflict {
                    account_id,
                    attempts: attempt + 1,
                });
            }
            sleep(delay).await;
        }

        warn!(attempts = max_attempts, "Retries exhausted while updating balance");
        Err(LedgerError::Conflict {
            account_id,
            attempts: max_attempts,
        })
    }

    async fn attempt(
        &self,
        account_id: AccountId,
        operation: OperationType,
        delta: Decimal,
    ) -> Result<Attempt, AttemptError> {
        // Reading
        let account = self
            .store
            .get_account(account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(account_id))?;

        // Computing
        let new_balance = apply_operation(account.balance, delta)?;

        // Writing
        let record = NewLedgerRecord {
            account_id,
            operation,
            amount_change: delta,
            balance: new_balance,
            version: account.version + 1,
        };

        match self
            .store
            .commit_update(account_id, account.version, new_balance, record)
            .await?
        {
            CommitOutcome::LostRace => Ok(Attempt::LostRace {
                seen_version: account.version,
            }),
            CommitOutcome::Committed(record) => {
                Ok(Attempt::Committed(self.refresh(account, &record).await))
            }
        }
    }

    /// Reads the account back after a winning write.
    ///
    /// The write already happened, so a failed read must not send the loop
    /// around again; the post-state from the ledger record is returned instead.
    async fn refresh(&self, before: Account, record: &LedgerRecord) -> Account {
        let fallback = |before: Account| Account {
            balance: record.balance,
            version: record.version,
            updated_at: record.created_at,
            ..before
        };

        match self.store.get_account(before.id).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                warn!(account_id = %before.id, "Account vanished after a committed update");
                fallback(before)
            }
            Err(err) => {
                warn!(account_id = %before.id, error = %err, "Could not re-read account after commit");
                fallback(before)
            }
        }
    }
}
