//! Balance update error taxonomy.
//!
//! Callers branch on [`ErrorKind`] rather than on individual variants:
//! validation and not-found failures are returned without retrying,
//! conflicts and operational failures only surface once the retry budget
//! is spent.

use rust_decimal::Decimal;
use tally_shared::{AppError, types::AccountId};
use thiserror::Error;

use super::store::StoreError;

/// Coarse classification of a balance update failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller input or business rule violation.
    Validation,
    /// The referenced account does not exist.
    NotFound,
    /// Sustained contention exhausted the retry budget.
    Conflict,
    /// Unexpected store failure.
    Operational,
}

/// Errors that can occur during balance operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Applying the change would drive the balance negative.
    #[error("Insufficient funds. Current: {balance}, Change: {change}")]
    InsufficientFunds {
        /// Balance the operation was evaluated against.
        balance: Decimal,
        /// Signed change that was rejected.
        change: Decimal,
    },

    /// Applying the change would exceed the largest storable balance.
    #[error("Balance limit exceeded. Current: {balance}, Change: {change}")]
    BalanceOverflow {
        /// Balance the operation was evaluated against.
        balance: Decimal,
        /// Signed change that was rejected.
        change: Decimal,
    },

    /// Operation amount cannot be zero.
    #[error("Amount cannot be zero")]
    ZeroAmount,

    /// Amount carries more fractional digits than a balance can hold.
    #[error("Amount {0} has more than 2 decimal places")]
    InvalidPrecision(Decimal),

    /// Accounts cannot be opened with a negative balance.
    #[error("Initial balance cannot be negative: {0}")]
    NegativeInitialBalance(Decimal),

    // ========== Lookup Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    // ========== Concurrency Errors ==========
    /// Every attempt lost the optimistic lock race.
    #[error("Conflict updating balance of account {account_id} after {attempts} attempts")]
    Conflict {
        /// Account being updated.
        account_id: AccountId,
        /// Attempts made before giving up.
        attempts: u32,
    },

    // ========== Operational Errors ==========
    /// Store failure that retries could not absorb.
    #[error("Operation failed: {0}")]
    Operational(String),
}

impl LedgerError {
    /// Returns the coarse error classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InsufficientFunds { .. }
            | Self::BalanceOverflow { .. }
            | Self::ZeroAmount
            | Self::InvalidPrecision(_)
            | Self::NegativeInitialBalance(_) => ErrorKind::Validation,
            Self::AccountNotFound(_) => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Operational(_) => ErrorKind::Operational,
        }
    }

    /// Returns true if resubmitting the same request later may succeed.
    ///
    /// Validation and not-found failures depend only on the input and the
    /// stored state, so resubmitting them cannot help.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Conflict | ErrorKind::Operational)
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::BalanceOverflow { .. } => "BALANCE_OVERFLOW",
            Self::ZeroAmount => "ZERO_AMOUNT",
            Self::InvalidPrecision(_) => "INVALID_PRECISION",
            Self::NegativeInitialBalance(_) => "NEGATIVE_INITIAL_BALANCE",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::Conflict { .. } => "CONFLICT",
            Self::Operational(_) => "OPERATION_FAILED",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Operational => 500,
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        Self::Operational(err.to_string())
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::Conflict => Self::Conflict(message),
            ErrorKind::Operational => Self::Internal(message),
        }
    }
}
