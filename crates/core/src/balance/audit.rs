//! Ledger replay audit.
//!
//! Replays an account's ledger from its opening balance and checks that the
//! stored history is gap-free and reproduces every recorded balance.

use rust_decimal::Decimal;
use serde::Serialize;
use tally_shared::types::AccountId;

use super::types::{Account, LedgerRecord, OperationType};

/// First inconsistency found while replaying a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Discrepancy {
    /// Versions are not the contiguous sequence 1..=N.
    VersionGap {
        /// Version the replay expected next.
        expected: i64,
        /// Version actually found.
        found: i64,
    },
    /// The sign of the change does not match the operation type.
    SignMismatch {
        /// Version of the offending record.
        version: i64,
    },
    /// The recorded balance differs from the replayed one.
    BalanceMismatch {
        /// Version of the offending record.
        version: i64,
        /// Balance reproduced by replay.
        expected: Decimal,
        /// Balance stored in the record.
        recorded: Decimal,
    },
    /// Replaying the change overflows the decimal range.
    ReplayOverflow {
        /// Version of the offending record.
        version: i64,
    },
    /// A record carries a negative balance.
    NegativeBalance {
        /// Version of the offending record.
        version: i64,
        /// Recorded balance.
        balance: Decimal,
    },
    /// The replay ends on a different balance than the account holds.
    FinalBalanceMismatch {
        /// Balance reproduced by replay.
        replayed: Decimal,
        /// Balance stored on the account.
        account: Decimal,
    },
    /// The ledger length differs from the account version.
    FinalVersionMismatch {
        /// Last version seen in the ledger.
        replayed: i64,
        /// Version stored on the account.
        account: i64,
    },
}

/// Outcome of replaying one account's ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    /// Audited account.
    pub account_id: AccountId,
    /// Number of ledger records replayed.
    pub entries: usize,
    /// Balance reached by the replay (up to the first discrepancy).
    pub replayed_balance: Decimal,
    /// True when no discrepancy was found.
    pub consistent: bool,
    /// First discrepancy, if any.
    pub discrepancy: Option<Discrepancy>,
}

/// Replays `records` (oldest first) from the account's opening balance.
#[must_use]
pub fn replay(account: &Account, records: &[LedgerRecord]) -> AuditReport {
    let mut balance = account.initial_balance;
    let mut version = 0_i64;

    let discrepancy = check(account, records, &mut balance, &mut version);

    AuditReport {
        account_id: account.id,
        entries: records.len(),
        replayed_balance: balance,
        consistent: discrepancy.is_none(),
        discrepancy,
    }
}

fn check(
    account: &Account,
    records: &[LedgerRecord],
    balance: &mut Decimal,
    version: &mut i64,
) -> Option<Discrepancy> {
    for record in records {
        let expected = *version + 1;
        if record.version != expected {
            return Some(Discrepancy::VersionGap {
                expected,
                found: record.version,
            });
        }

        let sign_ok = match record.operation {
            OperationType::Deposit => record.amount_change > Decimal::ZERO,
            OperationType::Withdraw => record.amount_change < Decimal::ZERO,
        };
        if !sign_ok {
            return Some(Discrepancy::SignMismatch {
                version: record.version,
            });
        }

        let Some(next) = balance.checked_add(record.amount_change) else {
            return Some(Discrepancy::ReplayOverflow {
                version: record.version,
            });
        };
        if next != record.balance {
            return Some(Discrepancy::BalanceMismatch {
                version: record.version,
                expected: next,
                recorded: record.balance,
            });
        }
        if next < Decimal::ZERO {
            return Some(Discrepancy::NegativeBalance {
                version: record.version,
                balance: next,
            });
        }

        *balance = next;
        *version = record.version;
    }

    if *balance != account.balance {
        return Some(Discrepancy::FinalBalanceMismatch {
            replayed: *balance,
            account: account.balance,
        });
    }
    if *version != account.version {
        return Some(Discrepancy::FinalVersionMismatch {
            replayed: *version,
            account: account.version,
        });
    }

    None
}
