//! Active enums backed by constrained text columns.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ledger operation stored in `account_transactions.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum OperationType {
    #[sea_orm(string_value = "deposit")]
    Deposit,
    #[sea_orm(string_value = "withdraw")]
    Withdraw,
}

impl From<tally_core::balance::OperationType> for OperationType {
    fn from(op: tally_core::balance::OperationType) -> Self {
        match op {
            tally_core::balance::OperationType::Deposit => Self::Deposit,
            tally_core::balance::OperationType::Withdraw => Self::Withdraw,
        }
    }
}

impl From<OperationType> for tally_core::balance::OperationType {
    fn from(op: OperationType) -> Self {
        match op {
            OperationType::Deposit => Self::Deposit,
            OperationType::Withdraw => Self::Withdraw,
        }
    }
}
