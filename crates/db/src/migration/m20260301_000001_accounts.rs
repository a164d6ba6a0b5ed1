//! Accounts and their append-only ledger.
//!
//! `accounts.version` is the compare-and-set token. The unique
//! `(account_id, version)` pair on the ledger guarantees one record per
//! committed version.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            "DROP TABLE IF EXISTS account_transactions CASCADE;
             DROP TABLE IF EXISTS accounts CASCADE;",
        )
        .await?;
        Ok(())
    }
}

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    balance NUMERIC(20, 2) NOT NULL,
    initial_balance NUMERIC(20, 2) NOT NULL,
    version BIGINT NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_accounts_balance_non_negative CHECK (balance >= 0),
    CONSTRAINT chk_accounts_initial_balance_non_negative CHECK (initial_balance >= 0),
    CONSTRAINT chk_accounts_version_non_negative CHECK (version >= 0)
);

CREATE TABLE account_transactions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    account_id UUID NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    type TEXT NOT NULL,
    amount_change NUMERIC(20, 2) NOT NULL,
    balance NUMERIC(20, 2) NOT NULL,
    version BIGINT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_account_transactions_type CHECK (type IN ('deposit', 'withdraw')),
    CONSTRAINT chk_account_transactions_amount_non_zero CHECK (amount_change <> 0),
    CONSTRAINT chk_account_transactions_balance_non_negative CHECK (balance >= 0),
    CONSTRAINT uq_account_transactions_version UNIQUE (account_id, version)
);

-- History listing: oldest first, version as tie-breaker
CREATE INDEX idx_account_transactions_history
    ON account_transactions(account_id, created_at, version);
";
