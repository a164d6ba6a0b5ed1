//! Concurrent account balances with an append-only ledger.
//!
//! This module implements:
//! - Balance invariant rules (sign normalization, no negative balances)
//! - The account store contract and an in-memory implementation
//! - The optimistic-concurrency update coordinator and its retry policy
//! - The account service used by the API layer
//! - Ledger replay audits

pub mod audit;
pub mod coordinator;
pub mod error;
pub mod invariant;
pub mod memory;
pub mod retry;
pub mod service;
pub mod store;
pub mod types;

#[cfg(test)]
mod invariant_props;

pub use audit::{AuditReport, Discrepancy};
pub use coordinator::BalanceUpdateCoordinator;
pub use error::{ErrorKind, LedgerError};
pub use invariant::{
    MAX_BALANCE, apply_operation, signed_amount, validate_amount, validate_initial_balance,
};
pub use memory::InMemoryAccountStore;
pub use retry::RetryPolicy;
pub use service::AccountService;
pub use store::{AccountStore, StoreError};
pub use types::{Account, CommitOutcome, LedgerRecord, NewLedgerRecord, OperationType};
