use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_core::money::TOLERANCE;
use tally_core::{AccountId, AssignmentStatus, CategoryId, Statement, StatementError};

fn cents(c: i64) -> Decimal {
    Decimal::new(c, 2)
}

fn signed(c: i64, negative: bool) -> Decimal {
    if negative {
        cents(-c)
    } else {
        cents(c)
    }
}

proptest! {
    #[test]
    fn assign_to_category_covers_everything(
        value in 1i64..10_000_000,
        negative in any::<bool>(),
        partial in 0i64..100,
    ) {
        let mut s = Statement::new(signed(value, negative), "EUR");
        let first = value * partial / 100;
        if first > 0 {
            s.assign_amount(signed(first, negative), CategoryId(1)).unwrap();
        }
        s.assign_to_category(CategoryId(2));
        prop_assert!(s.residual_amount().is_zero());
        prop_assert!(s.is_assigned());
        prop_assert_eq!(s.assignment_status(), AssignmentStatus::FullyAssigned);
    }

    #[test]
    fn exact_partial_splits_end_fully_assigned(
        parts in prop::collection::vec(1i64..100_000, 1..8),
        negative in any::<bool>(),
    ) {
        let total: i64 = parts.iter().sum();
        let mut s = Statement::new(signed(total, negative), "EUR");
        for (i, part) in parts.iter().enumerate() {
            prop_assert!(!s.is_assigned());
            s.assign_amount(signed(*part, negative), CategoryId(i as i64 + 1)).unwrap();
        }
        prop_assert!(s.is_assigned());
        prop_assert!(s.residual_amount().is_zero());
    }

    #[test]
    fn over_assignment_is_rejected(
        value in 2i64..1_000_000,
        taken_pct in 0i64..100,
        excess in 1i64..10_000,
        negative in any::<bool>(),
    ) {
        let mut s = Statement::new(signed(value, negative), "EUR");
        let taken = value * taken_pct / 100;
        if taken > 0 {
            s.assign_amount(signed(taken, negative), CategoryId(1)).unwrap();
        }
        let before = s.clone();
        let request = signed(value - taken + excess, negative);
        let is_invalid_amount = matches!(
            s.assign_amount(request, CategoryId(2)),
            Err(StatementError::InvalidAmount { .. })
        );
        prop_assert!(is_invalid_amount);
        prop_assert_eq!(s, before);
    }

    #[test]
    fn booked_total_never_exceeds_value_plus_tolerance(
        value in 1i64..10_000,
        negative in any::<bool>(),
        steps in prop::collection::vec(1i64..2_000, 1..40),
    ) {
        // Steps in tenths of a cent, so sub-cent requests are common.
        let mut s = Statement::new(signed(value, negative), "EUR");
        for step in steps {
            let mills = Decimal::new(if negative { -step } else { step }, 3);
            let _ = s.assign_amount(mills, CategoryId(1));
            prop_assert!(s.assigned_total().abs() <= s.value().abs() + TOLERANCE);
        }
    }

    #[test]
    fn residual_plus_assigned_is_value(
        value in 1i64..1_000_000,
        taken_pct in 0i64..=100,
    ) {
        let mut s = Statement::new(cents(-value), "EUR");
        let taken = value * taken_pct / 100;
        if taken > 0 {
            s.assign_amount(cents(-taken), CategoryId(1)).unwrap();
        }
        prop_assert_eq!(s.residual_amount() + s.assigned_total(), s.value());
        prop_assert_eq!(s.bank_assignment().amount, s.residual_amount());
    }
}

#[test]
fn groceries_and_household_scenario() {
    let mut s = Statement::new(cents(-5000), "EUR");
    assert_eq!(s.residual_amount(), cents(-5000));
    assert!(!s.has_assignment());

    s.assign_amount(cents(-3000), CategoryId(1)).unwrap();
    assert_eq!(s.residual_amount(), cents(-2000));
    assert!(!s.is_assigned());

    s.assign_amount(cents(-2000), CategoryId(2)).unwrap();
    assert_eq!(s.residual_amount(), cents(0));
    assert!(s.is_assigned());
}

#[test]
fn value_increase_reopens_fully_assigned_statement() {
    let mut s = Statement::new(cents(-5000), "EUR");
    s.assign_to_category(CategoryId(1));
    s.change_value_to(cents(-7500));
    assert!(!s.is_assigned());
    assert_eq!(s.residual_amount(), cents(-2500));
    assert_eq!(s.assignments()[0].amount, cents(-5000));
    assert_eq!(s.nass_value(), cents(-2500));

    let mut income = Statement::new(cents(1000), "EUR");
    income.assign_to_category(CategoryId(1));
    income.change_value_to(cents(1250));
    assert_eq!(income.residual_amount(), cents(250));
}

#[test]
fn binding_twice_to_same_account_is_noop() {
    let mut s = Statement::new(cents(100), "EUR");
    s.add_to_account(AccountId(3)).unwrap();
    let snapshot = s.clone();
    s.add_to_account(AccountId(3)).unwrap();
    assert_eq!(s, snapshot);
}
