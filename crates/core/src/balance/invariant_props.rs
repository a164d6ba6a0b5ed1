//! Property-based tests for the balance invariant and serial ledger replay.

use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::invariant::{apply_operation, signed_amount};
use super::memory::InMemoryAccountStore;
use super::retry::RetryPolicy;
use super::service::AccountService;
use super::types::OperationType;

/// Strategy to generate positive amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate non-zero amounts of either sign.
fn any_sign_amount() -> impl Strategy<Value = Decimal> {
    (positive_amount(), any::<bool>()).prop_map(|(amount, negate)| if negate { -amount } else { amount })
}

/// Strategy to generate non-negative balances (0.00 to 10,000.00).
fn balance() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn operation() -> impl Strategy<Value = OperationType> {
    prop_oneof![Just(OperationType::Deposit), Just(OperationType::Withdraw)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Deposits add |x| and withdrawals subtract |x| whatever the input sign.
    #[test]
    fn prop_signed_amount_normalizes_sign(amount in any_sign_amount()) {
        prop_assert_eq!(signed_amount(amount, OperationType::Deposit), amount.abs());
        prop_assert_eq!(signed_amount(amount, OperationType::Withdraw), -amount.abs());
    }

    /// apply_operation fails iff the result would be negative, and is exact otherwise.
    #[test]
    fn prop_apply_fails_iff_negative(current in balance(), delta in any_sign_amount()) {
        match apply_operation(current, delta) {
            Ok(new_balance) => {
                prop_assert!(current + delta >= Decimal::ZERO);
                prop_assert_eq!(new_balance, current + delta);
            }
            Err(LedgerError::InsufficientFunds { balance, change }) => {
                prop_assert!(current + delta < Decimal::ZERO);
                prop_assert_eq!(balance, current);
                prop_assert_eq!(change, delta);
            }
            Err(other) => prop_assert!(false, "unexpected error {other:?}"),
        }
    }

    /// Serially applied operations end at initial + sum(applied deltas), never below zero.
    #[test]
    fn prop_serial_sequence_preserves_invariant(
        initial in balance(),
        ops in prop::collection::vec((positive_amount(), operation()), 0..60),
    ) {
        let mut current = initial;
        let mut applied = Decimal::ZERO;

        for (amount, op) in ops {
            let delta = signed_amount(amount, op);
            if let Ok(next) = apply_operation(current, delta) {
                applied += delta;
                current = next;
            }
            prop_assert!(current >= Decimal::ZERO);
        }

        prop_assert_eq!(current, initial + applied);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Replaying the stored ledger reproduces every stored balance and the final account.
    #[test]
    fn prop_ledger_replays_to_account_balance(
        initial in balance(),
        ops in prop::collection::vec((positive_amount(), operation()), 1..25),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        let (report, expected_successes, records_len, final_balance, expected_balance) =
            runtime.block_on(async {
                let service =
                    AccountService::new(Arc::new(InMemoryAccountStore::new()), RetryPolicy::default());
                let account = service.create_account(initial).await.unwrap();

                let mut successes = 0usize;
                let mut expected_balance = initial;
                for (amount, op) in ops {
                    match service.update_balance(account.id, amount, op).await {
                        Ok(updated) => {
                            successes += 1;
                            expected_balance += signed_amount(amount, op);
                            assert_eq!(updated.balance, expected_balance);
                        }
                        Err(LedgerError::InsufficientFunds { .. }) => {}
                        Err(other) => panic!("unexpected error {other:?}"),
                    }
                }

                let records = service.list_transactions(account.id).await.unwrap();
                let report = service.audit_account(account.id).await.unwrap();
                let final_account = service.get_account(account.id).await.unwrap();
                (report, successes, records.len(), final_account.balance, expected_balance)
            });

        prop_assert!(report.consistent, "{:?}", report.discrepancy);
        prop_assert_eq!(records_len, expected_successes);
        prop_assert_eq!(report.replayed_balance, final_balance);
        prop_assert_eq!(final_balance, expected_balance);
    }
}
