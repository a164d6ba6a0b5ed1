//! Postgres account store.
//!
//! The compare-and-set is a single `UPDATE ... WHERE id = $1 AND version = $2`;
//! Postgres row locking makes it atomic. `commit_update` runs it together with
//! the ledger insert in one database transaction, so a balance never moves
//! without its record.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tally_core::balance::{
    Account, AccountStore, CommitOutcome, LedgerRecord, NewLedgerRecord, StoreError,
};
use tally_shared::types::{AccountId, TransactionId};
use tracing::warn;

use crate::entities::{account_transactions, accounts};

impl From<accounts::Model> for Account {
    fn from(model: accounts::Model) -> Self {
        Self {
            id: AccountId::from_uuid(model.id),
            balance: model.balance,
            initial_balance: model.initial_balance,
            version: model.version,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<account_transactions::Model> for LedgerRecord {
    fn from(model: account_transactions::Model) -> Self {
        Self {
            id: TransactionId::from_uuid(model.id),
            account_id: AccountId::from_uuid(model.account_id),
            operation: model.operation.into(),
            amount_change: model.amount_change,
            balance: model.balance,
            version: model.version,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[allow(clippy::needless_pass_by_value)]
fn backend(err: DbErr) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn commit_uncertain(account_id: AccountId, version: i64, err: &DbErr) -> StoreError {
    warn!(%account_id, version, error = %err, "Commit outcome unknown");
    StoreError::CommitUncertain {
        account_id,
        version,
        message: err.to_string(),
    }
}

/// `SeaORM` implementation of [`AccountStore`].
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn compare_and_set<C: ConnectionTrait>(
        conn: &C,
        id: AccountId,
        expected_version: i64,
        new_balance: Decimal,
    ) -> Result<u64, DbErr> {
        let result = accounts::Entity::update_many()
            .col_expr(accounts::Column::Balance, Expr::value(new_balance))
            .col_expr(
                accounts::Column::Version,
                Expr::col(accounts::Column::Version).add(1i64),
            )
            .col_expr(accounts::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(accounts::Column::Id.eq(id.into_inner()))
            .filter(accounts::Column::Version.eq(expected_version))
            .exec(conn)
            .await?;

        Ok(result.rows_affected)
    }

    async fn insert_record<C: ConnectionTrait>(
        conn: &C,
        record: NewLedgerRecord,
    ) -> Result<LedgerRecord, DbErr> {
        let model = account_transactions::ActiveModel {
            id: Set(TransactionId::new().into_inner()),
            account_id: Set(record.account_id.into_inner()),
            operation: Set(record.operation.into()),
            amount_change: Set(record.amount_change),
            balance: Set(record.balance),
            version: Set(record.version),
            created_at: Set(Utc::now().into()),
        };

        Ok(model.insert(conn).await?.into())
    }
}

#[async_trait]
impl AccountStore for AccountRepository {
    async fn create_account(&self, initial_balance: Decimal) -> Result<Account, StoreError> {
        let now = Utc::now().into();
        let account = accounts::ActiveModel {
            id: Set(AccountId::new().into_inner()),
            balance: Set(initial_balance),
            initial_balance: Set(initial_balance),
            version: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = account.insert(&self.db).await.map_err(backend)?;
        Ok(model.into())
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let model = accounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(backend)?;

        Ok(model.map(Account::from))
    }

    async fn conditional_update(
        &self,
        id: AccountId,
        expected_version: i64,
        new_balance: Decimal,
    ) -> Result<u64, StoreError> {
        Self::compare_and_set(&self.db, id, expected_version, new_balance)
            .await
            .map_err(backend)
    }

    async fn append_transaction(&self, record: NewLedgerRecord) -> Result<LedgerRecord, StoreError> {
        Self::insert_record(&self.db, record).await.map_err(backend)
    }

    async fn list_transactions(&self, id: AccountId) -> Result<Vec<LedgerRecord>, StoreError> {
        let models = account_transactions::Entity::find()
            .filter(account_transactions::Column::AccountId.eq(id.into_inner()))
            .order_by_asc(account_transactions::Column::CreatedAt)
            .order_by_asc(account_transactions::Column::Version)
            .all(&self.db)
            .await
            .map_err(backend)?;

        Ok(models.into_iter().map(LedgerRecord::from).collect())
    }

    async fn commit_update(
        &self,
        id: AccountId,
        expected_version: i64,
        new_balance: Decimal,
        record: NewLedgerRecord,
    ) -> Result<CommitOutcome, StoreError> {
        let txn = self.db.begin().await.map_err(backend)?;

        let affected = Self::compare_and_set(&txn, id, expected_version, new_balance)
            .await
            .map_err(backend)?;

        if affected == 0 {
            if let Err(err) = txn.rollback().await {
                warn!(account_id = %id, error = %err, "Rollback after lost race failed");
            }
            return Ok(CommitOutcome::LostRace);
        }

        let version = record.version;
        // Dropping `txn` on error rolls both writes back.
        let stored = Self::insert_record(&txn, record).await.map_err(backend)?;

        // Postgres may have applied the commit before the error reached us.
        txn.commit()
            .await
            .map_err(|err| commit_uncertain(id, version, &err))?;

        Ok(CommitOutcome::Committed(stored))
    }
}
