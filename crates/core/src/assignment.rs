use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::category::CategoryId;
use crate::error::{Result, StatementError};
use crate::money::{round_to_currency, within_tolerance, TOLERANCE};
use crate::statement::{Statement, StatementId};

/// Part of a statement's value booked to one category. Holds identifiers
/// only; neither the statement nor the category is owned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub statement: Option<StatementId>,
    pub category: CategoryId,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentStatus {
    Unassigned,
    PartiallyAssigned,
    FullyAssigned,
}

impl Statement {
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Direct access for editing amounts. Call [`Statement::update_assigned`]
    /// afterwards.
    pub fn assignments_mut(&mut self) -> &mut [Assignment] {
        &mut self.assignments
    }

    pub fn assigned_total(&self) -> Decimal {
        self.assignments.iter().map(|a| a.amount).sum()
    }

    /// `value - sum(assignments)`, sign preserved, rounded to the currency's
    /// minor unit.
    pub fn residual_amount(&self) -> Decimal {
        round_to_currency(self.value - self.assigned_total(), &self.currency)
    }

    pub fn has_assignment(&self) -> bool {
        self.assignments.iter().any(|a| !a.amount.is_zero())
    }

    pub fn assignment_status(&self) -> AssignmentStatus {
        if self.is_assigned {
            AssignmentStatus::FullyAssigned
        } else if self.has_assignment() {
            AssignmentStatus::PartiallyAssigned
        } else {
            AssignmentStatus::Unassigned
        }
    }

    /// Recomputes `is_assigned` and `nass_value` from the current
    /// assignments. Zero-amount assignments are dropped.
    pub fn update_assigned(&mut self) {
        self.assignments.retain(|a| !a.amount.is_zero());
        self.is_assigned = within_tolerance(self.assigned_total(), self.value);
        self.nass_value = self.residual_amount();
    }

    /// Books whatever is still unassigned to `category`.
    pub fn assign_to_category(&mut self, category: CategoryId) {
        let residual = self.residual_amount();
        if !residual.is_zero() {
            self.book(category, residual);
        }
        self.update_assigned();
    }

    /// Books exactly `amount` to `category`. The amount must carry the sign
    /// of the statement value, and the unrounded total booked afterwards may
    /// exceed `|value|` by at most [`TOLERANCE`].
    pub fn assign_amount(&mut self, amount: Decimal, category: CategoryId) -> Result<()> {
        let invalid = || StatementError::InvalidAmount {
            requested: amount,
            residual: self.residual_amount(),
        };
        if amount.is_zero() || amount.is_sign_negative() != self.value.is_sign_negative() {
            return Err(invalid());
        }
        if (self.assigned_total() + amount).abs() > self.value.abs() + TOLERANCE {
            return Err(invalid());
        }
        self.book(category, amount);
        self.update_assigned();
        Ok(())
    }

    pub fn remove_assignment(&mut self, category: CategoryId) -> Option<Assignment> {
        let pos = self.assignments.iter().position(|a| a.category == category)?;
        let removed = self.assignments.remove(pos);
        self.update_assigned();
        Some(removed)
    }

    /// The synthetic remainder bucket, pointing at the reserved
    /// [`CategoryId::UNASSIGNED`]. Built on demand, never stored.
    pub fn bank_assignment(&self) -> Assignment {
        Assignment {
            statement: self.id(),
            category: CategoryId::UNASSIGNED,
            amount: self.residual_amount(),
        }
    }

    /// Corrects the statement value. Existing assignments keep their amounts;
    /// any gap or excess shows up in the residual.
    pub fn change_value_to(&mut self, value: Decimal) {
        self.value = value;
        self.update_assigned();
    }

    fn book(&mut self, category: CategoryId, amount: Decimal) {
        if let Some(existing) = self.assignments.iter_mut().find(|a| a.category == category) {
            existing.amount += amount;
            return;
        }
        let statement = self.id();
        self.assignments.push(Assignment {
            statement,
            category,
            amount,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const GROCERIES: CategoryId = CategoryId(10);
    const HOUSEHOLD: CategoryId = CategoryId(11);

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn stat(value: &str) -> Statement {
        Statement::new(d(value), "EUR")
    }

    #[test]
    fn split_across_two_categories() {
        let mut s = stat("-50.00");
        assert_eq!(s.residual_amount(), d("-50.00"));
        assert!(!s.has_assignment());
        assert_eq!(s.assignment_status(), AssignmentStatus::Unassigned);

        s.assign_amount(d("-30.00"), GROCERIES).unwrap();
        assert_eq!(s.residual_amount(), d("-20.00"));
        assert!(!s.is_assigned());
        assert_eq!(s.assignment_status(), AssignmentStatus::PartiallyAssigned);

        s.assign_amount(d("-20.00"), HOUSEHOLD).unwrap();
        assert_eq!(s.residual_amount(), d("0.00"));
        assert!(s.is_assigned());
        assert_eq!(s.assignment_status(), AssignmentStatus::FullyAssigned);
        assert_eq!(s.nass_value(), Decimal::ZERO);
    }

    #[test]
    fn assign_to_category_takes_the_residual() {
        let mut s = stat("-50.00");
        s.assign_amount(d("-12.50"), GROCERIES).unwrap();
        s.assign_to_category(HOUSEHOLD);
        assert!(s.residual_amount().is_zero());
        assert!(s.is_assigned());
        let household = s.assignments().iter().find(|a| a.category == HOUSEHOLD).unwrap();
        assert_eq!(household.amount, d("-37.50"));
    }

    #[test]
    fn assign_to_category_merges_into_existing_assignment() {
        let mut s = stat("100.00");
        s.assign_amount(d("40.00"), GROCERIES).unwrap();
        s.assign_to_category(GROCERIES);
        assert_eq!(s.assignments().len(), 1);
        assert_eq!(s.assignments()[0].amount, d("100.00"));
    }

    #[test]
    fn assign_to_category_on_covered_statement_is_noop() {
        let mut s = stat("-5.00");
        s.assign_to_category(GROCERIES);
        s.assign_to_category(HOUSEHOLD);
        assert_eq!(s.assignments().len(), 1);
        assert!(s.is_assigned());
    }

    #[test]
    fn assign_amount_rejects_more_than_residual() {
        let mut s = stat("-50.00");
        s.assign_amount(d("-30.00"), GROCERIES).unwrap();
        let err = s.assign_amount(d("-20.01"), HOUSEHOLD).unwrap_err();
        assert_eq!(
            err,
            StatementError::InvalidAmount {
                requested: d("-20.01"),
                residual: d("-20.00"),
            }
        );
        assert_eq!(s.residual_amount(), d("-20.00"));
    }

    #[test]
    fn assign_amount_accepts_within_tolerance() {
        let mut s = stat("-10.00");
        s.assign_amount(d("-10.004"), GROCERIES).unwrap();
        assert!(s.is_assigned());
    }

    #[test]
    fn tolerance_is_not_granted_twice() {
        let mut s = stat("-10.00");
        s.assign_amount(d("-10.005"), GROCERIES).unwrap();
        for _ in 0..10 {
            assert!(s.assign_amount(d("-0.005"), HOUSEHOLD).is_err());
        }
        assert_eq!(s.assigned_total(), d("-10.005"));
    }

    #[test]
    fn sub_cent_steps_fill_up_to_the_limit() {
        let mut s = stat("-0.02");
        for _ in 0..5 {
            s.assign_amount(d("-0.005"), GROCERIES).unwrap();
        }
        assert!(s.assign_amount(d("-0.005"), GROCERIES).is_err());
        assert_eq!(s.assigned_total(), d("-0.025"));
        assert!(s.is_assigned());
    }

    #[test]
    fn assign_amount_rejects_sign_mismatch() {
        let mut s = stat("-50.00");
        assert!(matches!(
            s.assign_amount(d("10.00"), GROCERIES),
            Err(StatementError::InvalidAmount { .. })
        ));
        assert!(!s.has_assignment());
    }

    #[test]
    fn assign_amount_rejects_zero() {
        let mut s = stat("-50.00");
        assert!(s.assign_amount(Decimal::ZERO, GROCERIES).is_err());
    }

    #[test]
    fn over_assigned_statement_has_no_room() {
        let mut s = stat("-50.00");
        s.assign_to_category(GROCERIES);
        s.change_value_to(d("-40.00"));
        assert_eq!(s.residual_amount(), d("10.00"));
        assert!(s.assign_amount(d("-1.00"), HOUSEHOLD).is_err());
    }

    #[test]
    fn change_value_to_exposes_new_residual() {
        let mut s = stat("-50.00");
        s.assign_to_category(GROCERIES);
        assert!(s.is_assigned());

        s.change_value_to(d("-65.00"));
        assert!(!s.is_assigned());
        assert_eq!(s.residual_amount(), d("-15.00"));
        assert_eq!(s.assignments()[0].amount, d("-50.00"));
        assert_eq!(s.assignment_status(), AssignmentStatus::PartiallyAssigned);

        s.assign_to_category(HOUSEHOLD);
        assert!(s.is_assigned());
    }

    #[test]
    fn external_edit_needs_update_assigned() {
        let mut s = stat("-50.00");
        s.assign_to_category(GROCERIES);
        s.assignments_mut()[0].amount = d("-45.00");
        assert!(s.is_assigned());
        s.update_assigned();
        assert!(!s.is_assigned());
        assert_eq!(s.nass_value(), d("-5.00"));
    }

    #[test]
    fn update_assigned_drops_zero_assignments() {
        let mut s = stat("-50.00");
        s.assign_amount(d("-10.00"), GROCERIES).unwrap();
        s.assignments_mut()[0].amount = Decimal::ZERO;
        s.update_assigned();
        assert!(s.assignments().is_empty());
        assert!(!s.has_assignment());
    }

    #[test]
    fn remove_assignment_recomputes() {
        let mut s = stat("-50.00");
        s.assign_to_category(GROCERIES);
        let removed = s.remove_assignment(GROCERIES).unwrap();
        assert_eq!(removed.amount, d("-50.00"));
        assert!(!s.is_assigned());
        assert!(s.remove_assignment(GROCERIES).is_none());
    }

    #[test]
    fn bank_assignment_reflects_residual() {
        let mut s = stat("-50.00");
        s.set_id(StatementId(4));
        s.assign_amount(d("-30.00"), GROCERIES).unwrap();
        let bank = s.bank_assignment();
        assert_eq!(bank.category, CategoryId::UNASSIGNED);
        assert_eq!(bank.amount, d("-20.00"));
        assert_eq!(bank.statement, Some(StatementId(4)));
        assert_eq!(s.assignments().len(), 1);
    }

    #[test]
    fn residual_rounds_to_currency() {
        let mut s = Statement::new(d("1000"), "JPY");
        s.assign_amount(d("333.4"), GROCERIES).unwrap();
        assert_eq!(s.residual_amount(), d("667"));
    }

    #[test]
    fn categories_description_lists_names() {
        let mut s = stat("-50.00");
        s.assign_amount(d("-30.00"), GROCERIES).unwrap();
        s.assign_amount(d("-20.00"), HOUSEHOLD).unwrap();
        let names = |id: CategoryId| match id.0 {
            10 => Some("Groceries"),
            11 => Some("Household"),
            _ => None,
        };
        assert_eq!(s.categories_description(names), "Groceries, Household");
    }
}
