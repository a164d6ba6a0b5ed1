//! Balance invariant rules.
//!
//! Pure functions: no I/O, no shared state. The coordinator calls these on
//! every attempt against the freshly read balance.

use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::OperationType;

/// Number of fractional digits a balance can hold.
pub const BALANCE_SCALE: u32 = 2;

/// Largest balance a `NUMERIC(20, 2)` column holds: 999,999,999,999,999,999.99.
pub const MAX_BALANCE: Decimal = Decimal::from_parts(0x630f_ffff, 0x6bc7_5e2d, 0x5, false, 2);

/// Returns the signed delta for an operation.
///
/// The sign of `amount` is ignored: deposits always add `|amount|` and
/// withdrawals always subtract it.
#[must_use]
pub fn signed_amount(amount: Decimal, operation: OperationType) -> Decimal {
    let absolute = amount.abs();
    match operation {
        OperationType::Deposit => absolute,
        OperationType::Withdraw => -absolute,
    }
}

/// Applies a signed delta to a balance.
///
/// Reaching exactly zero is allowed.
///
/// # Errors
///
/// - `LedgerError::InsufficientFunds` when the result would be negative.
/// - `LedgerError::BalanceOverflow` when the result would exceed [`MAX_BALANCE`].
pub fn apply_operation(current_balance: Decimal, delta: Decimal) -> Result<Decimal, LedgerError> {
    let overflow = || LedgerError::BalanceOverflow {
        balance: current_balance,
        change: delta,
    };
    let new_balance = current_balance.checked_add(delta).ok_or_else(overflow)?;

    if new_balance > MAX_BALANCE {
        return Err(overflow());
    }
    if new_balance < Decimal::ZERO {
        return Err(LedgerError::InsufficientFunds {
            balance: current_balance,
            change: delta,
        });
    }

    Ok(new_balance)
}

/// Validates an operation amount: non-zero with at most two decimal places.
pub fn validate_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount.is_zero() {
        return Err(LedgerError::ZeroAmount);
    }
    validate_precision(amount)
}

/// Validates the balance an account is opened with.
pub fn validate_initial_balance(balance: Decimal) -> Result<(), LedgerError> {
    if balance < Decimal::ZERO {
        return Err(LedgerError::NegativeInitialBalance(balance));
    }
    if balance > MAX_BALANCE {
        return Err(LedgerError::BalanceOverflow {
            balance: Decimal::ZERO,
            change: balance,
        });
    }
    validate_precision(balance)
}

fn validate_precision(value: Decimal) -> Result<(), LedgerError> {
    // 10.50 and 10.5 are the same amount; only significant digits count.
    if value.normalize().scale() > BALANCE_SCALE {
        return Err(LedgerError::InvalidPrecision(value));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(100), OperationType::Deposit, dec!(100))]
    #[case(dec!(-100), OperationType::Deposit, dec!(100))]
    #[case(dec!(100), OperationType::Withdraw, dec!(-100))]
    #[case(dec!(-100), OperationType::Withdraw, dec!(-100))]
    #[case(dec!(0.01), OperationType::Withdraw, dec!(-0.01))]
    fn test_signed_amount(
        #[case] amount: Decimal,
        #[case] operation: OperationType,
        #[case] expected: Decimal,
    ) {
        assert_eq!(signed_amount(amount, operation), expected);
    }

    #[test]
    fn test_apply_deposit() {
        assert_eq!(apply_operation(dec!(100), dec!(50)).unwrap(), dec!(150));
    }

    #[test]
    fn test_apply_valid_withdrawal() {
        assert_eq!(apply_operation(dec!(100), dec!(-40)).unwrap(), dec!(60));
    }

    #[test]
    fn test_apply_allows_zero_balance() {
        assert_eq!(apply_operation(dec!(10), dec!(-10)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_apply_rejects_negative_result() {
        let err = apply_operation(dec!(50), dec!(-60)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                balance: dec!(50),
                change: dec!(-60),
            }
        );
    }

    #[test]
    fn test_apply_rejects_one_cent_short() {
        assert!(apply_operation(dec!(9.99), dec!(-10.00)).is_err());
    }

    #[rstest]
    #[case::decimal_range(dec!(1), Decimal::MAX)]
    #[case::column_range(MAX_BALANCE, dec!(0.01))]
    #[case::large_deposit(dec!(1), dec!(79228162514264337593543950335))]
    fn test_apply_rejects_overflow(#[case] current: Decimal, #[case] delta: Decimal) {
        assert_eq!(
            apply_operation(current, delta),
            Err(LedgerError::BalanceOverflow {
                balance: current,
                change: delta,
            })
        );
    }

    #[test]
    fn test_apply_allows_column_maximum() {
        assert_eq!(
            apply_operation(MAX_BALANCE - dec!(0.01), dec!(0.01)).unwrap(),
            MAX_BALANCE
        );
        assert_eq!(MAX_BALANCE, dec!(999999999999999999.99));
    }

    #[test]
    fn test_apply_huge_withdrawal_is_insufficient_funds() {
        assert!(matches!(
            apply_operation(dec!(10), -Decimal::MAX),
            Err(LedgerError::InsufficientFunds { .. })
        ));
    }

    #[rstest]
    #[case(dec!(10))]
    #[case(dec!(10.5))]
    #[case(dec!(10.50))]
    #[case(dec!(10.500))]
    #[case(dec!(-0.01))]
    fn test_validate_amount_accepts(#[case] amount: Decimal) {
        assert!(validate_amount(amount).is_ok());
    }

    #[test]
    fn test_validate_amount_rejects_zero() {
        assert_eq!(validate_amount(dec!(0)), Err(LedgerError::ZeroAmount));
        assert_eq!(validate_amount(dec!(0.00)), Err(LedgerError::ZeroAmount));
    }

    #[test]
    fn test_validate_amount_rejects_sub_cent() {
        assert_eq!(
            validate_amount(dec!(0.001)),
            Err(LedgerError::InvalidPrecision(dec!(0.001)))
        );
    }

    #[test]
    fn test_validate_initial_balance() {
        assert!(validate_initial_balance(dec!(0)).is_ok());
        assert!(validate_initial_balance(dec!(1000)).is_ok());
        assert_eq!(
            validate_initial_balance(dec!(-5)),
            Err(LedgerError::NegativeInitialBalance(dec!(-5)))
        );
        assert!(matches!(
            validate_initial_balance(dec!(1.234)),
            Err(LedgerError::InvalidPrecision(_))
        ));
        assert!(validate_initial_balance(MAX_BALANCE).is_ok());
        assert!(matches!(
            validate_initial_balance(MAX_BALANCE + dec!(0.01)),
            Err(LedgerError::BalanceOverflow { .. })
        ));
    }
}
