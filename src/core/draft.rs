use crate::core::allocation::{Breakdown, compute_breakdown};
use crate::core::errors::FundError;
use crate::core::models::money::checked_total;
use crate::core::models::{Employee, Expense, Money};
use crate::core::roster::default_participants;
use std::collections::BTreeSet;
use tracing::debug;

/// Ids a catalog refresh removed from the selection because the underlying
/// rows disappeared from the ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DraftRefresh {
    pub dropped_expenses: Vec<String>,
    pub dropped_participants: Vec<String>,
}

impl DraftRefresh {
    pub fn is_clean(&self) -> bool {
        self.dropped_expenses.is_empty() && self.dropped_participants.is_empty()
    }
}

/// Session-local selection of a bill sharing before it is created.
///
/// The draft computes its breakdown from its own snapshot of expenses and
/// employees; ledger updates reach it only through `refresh_catalog`.
#[derive(Clone, Debug)]
pub struct AllocationDraft {
    expenses: Vec<Expense>,
    employees: Vec<Employee>,
    selected_expenses: BTreeSet<String>,
    participants: BTreeSet<String>,
    honorees: BTreeSet<String>,
}

impl AllocationDraft {
    pub fn new(expenses: Vec<Expense>, employees: Vec<Employee>) -> Self {
        let participants = default_participants(&employees);
        AllocationDraft {
            expenses,
            employees,
            selected_expenses: BTreeSet::new(),
            participants,
            honorees: BTreeSet::new(),
        }
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn employees(&self) -> &[Employee] {
        &self.employees
    }

    pub fn selected_expenses(&self) -> &BTreeSet<String> {
        &self.selected_expenses
    }

    pub fn participants(&self) -> &BTreeSet<String> {
        &self.participants
    }

    pub fn honorees(&self) -> &BTreeSet<String> {
        &self.honorees
    }

    /// Returns whether the expense is selected afterwards.
    pub fn toggle_expense(&mut self, expense_id: &str) -> bool {
        if !self.expenses.iter().any(|e| e.id == expense_id) {
            return false;
        }
        if !self.selected_expenses.remove(expense_id) {
            self.selected_expenses.insert(expense_id.to_string());
            return true;
        }
        false
    }

    /// Deselecting a participant also clears their honoree mark.
    pub fn toggle_participant(&mut self, employee_id: &str) -> bool {
        if !self.employees.iter().any(|e| e.id == employee_id) {
            return false;
        }
        if self.participants.remove(employee_id) {
            self.honorees.remove(employee_id);
            return false;
        }
        self.participants.insert(employee_id.to_string());
        true
    }

    /// Only selected participants can be honoured; other ids are ignored.
    pub fn toggle_honoree(&mut self, employee_id: &str) -> bool {
        if !self.participants.contains(employee_id) {
            return false;
        }
        if self.honorees.remove(employee_id) {
            return false;
        }
        self.honorees.insert(employee_id.to_string());
        true
    }

    pub fn selected_total(&self) -> Result<Money, FundError> {
        checked_total(
            self.expenses
                .iter()
                .filter(|e| self.selected_expenses.contains(&e.id))
                .map(|e| e.amount),
        )
    }

    pub fn can_submit(&self) -> bool {
        !self.selected_expenses.is_empty() && !self.participants.is_empty()
    }

    /// Live preview of the split for the current selection.
    pub fn breakdown(&self, scale: u32) -> Result<Breakdown, FundError> {
        compute_breakdown(
            self.selected_total()?,
            &self.participants,
            &self.honorees,
            |id| {
                self.employees
                    .iter()
                    .find(|e| e.id == id)
                    .map(|e| e.participates_in_fund)
                    .unwrap_or(true)
            },
            scale,
        )
    }

    /// Swaps in freshly fetched lists while keeping the user's selection.
    pub fn refresh_catalog(&mut self, expenses: Vec<Expense>, employees: Vec<Employee>) -> DraftRefresh {
        let mut refresh = DraftRefresh::default();

        self.selected_expenses.retain(|id| {
            let keep = expenses.iter().any(|e| &e.id == id);
            if !keep {
                refresh.dropped_expenses.push(id.clone());
            }
            keep
        });
        self.participants.retain(|id| {
            let keep = employees.iter().any(|e| &e.id == id);
            if !keep {
                refresh.dropped_participants.push(id.clone());
            }
            keep
        });
        let participants = &self.participants;
        self.honorees.retain(|id| participants.contains(id));

        self.expenses = expenses;
        self.employees = employees;

        if !refresh.is_clean() {
            debug!("Draft refresh dropped selections: {:?}", refresh);
        }
        refresh
    }

    /// Clears every selection, as after a successful submit.
    pub fn reset(&mut self) {
        self.selected_expenses.clear();
        self.participants.clear();
        self.honorees.clear();
    }
}
