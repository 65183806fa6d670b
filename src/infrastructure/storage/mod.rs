use crate::core::errors::FundError;
use crate::core::models::{
    BillSharing, BillSharingDetail, BillSharingExpense, BillSharingParticipant, Employee, Expense, FundPayment,
    PaymentStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::broadcast;

pub mod in_memory;
pub mod sqlite;

/// Capacity of the change-notification channel. Slow subscribers lag and
/// simply re-fetch.
pub const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Which table group changed, so subscribers know what to re-fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerChange {
    Employees,
    Expenses,
    FundPayments,
    BillSharing(String),
}

/// Durable home of employees, expenses, fund payments and bill sharings.
///
/// `call_finalize`, `call_rollback_delete` and `delete_pending_sharing_cascade`
/// touch several tables and must be applied as one unit of work.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn list_employees(&self) -> Result<Vec<Employee>, FundError>;
    async fn get_employee(&self, employee_id: &str) -> Result<Option<Employee>, FundError>;
    async fn insert_employee(&self, employee: Employee) -> Result<(), FundError>;
    async fn update_employee(&self, employee: Employee) -> Result<(), FundError>;
    /// Refuses with `EmployeeInUse` while fund payments or participant rows
    /// reference the employee.
    async fn delete_employee(&self, employee_id: &str) -> Result<(), FundError>;

    async fn list_expenses(&self) -> Result<Vec<Expense>, FundError>;
    async fn get_expense(&self, expense_id: &str) -> Result<Option<Expense>, FundError>;
    async fn insert_expense(&self, expense: Expense) -> Result<(), FundError>;
    /// Keeps the stored reimbursement state and returns the updated row.
    /// Refuses with `ExpenseInUse` when the amount changes while a bill
    /// sharing links the expense.
    async fn update_expense(&self, expense: Expense) -> Result<Expense, FundError>;
    /// Refuses with `ExpenseInUse` while a bill sharing links the expense.
    async fn delete_expense(&self, expense_id: &str) -> Result<(), FundError>;

    async fn list_fund_payments(&self) -> Result<Vec<FundPayment>, FundError>;
    async fn insert_fund_payment(&self, payment: FundPayment) -> Result<(), FundError>;

    /// Newest first.
    async fn get_bill_sharing_history(&self) -> Result<Vec<BillSharingDetail>, FundError>;
    async fn get_bill_sharing(&self, sharing_id: &str) -> Result<Option<BillSharingDetail>, FundError>;
    async fn get_participant(&self, participant_id: &str) -> Result<Option<BillSharingParticipant>, FundError>;

    async fn insert_bill_sharing(&self, sharing: BillSharing) -> Result<(), FundError>;
    /// Also marks the linked, not yet reimbursed expenses as shared.
    async fn insert_bill_sharing_expenses(&self, rows: Vec<BillSharingExpense>) -> Result<(), FundError>;
    async fn insert_bill_sharing_participants(&self, rows: Vec<BillSharingParticipant>) -> Result<(), FundError>;
    async fn update_participant_status(
        &self,
        participant_id: &str,
        status: PaymentStatus,
        payment_date: Option<DateTime<Utc>>,
    ) -> Result<BillSharingParticipant, FundError>;

    /// Applies the reimbursement of a pending sharing and marks it finalized.
    /// Returns `false` without touching anything when it was already finalized.
    async fn call_finalize(&self, sharing_id: &str) -> Result<bool, FundError>;
    /// Reverts a finalized sharing's reimbursement and removes all of its rows.
    async fn call_rollback_delete(&self, sharing_id: &str) -> Result<(), FundError>;
    /// Removes a pending sharing with its participants and expense links.
    async fn delete_pending_sharing_cascade(&self, sharing_id: &str) -> Result<(), FundError>;

    fn subscribe(&self) -> broadcast::Receiver<LedgerChange>;
}

/// Backend chosen at startup from configuration.
pub type SharedLedger = Arc<dyn LedgerStore>;

#[async_trait]
impl<T: LedgerStore + ?Sized> LedgerStore for Arc<T> {
    async fn list_employees(&self) -> Result<Vec<Employee>, FundError> {
        (**self).list_employees().await
    }

    async fn get_employee(&self, employee_id: &str) -> Result<Option<Employee>, FundError> {
        (**self).get_employee(employee_id).await
    }

    async fn insert_employee(&self, employee: Employee) -> Result<(), FundError> {
        (**self).insert_employee(employee).await
    }

    async fn update_employee(&self, employee: Employee) -> Result<(), FundError> {
        (**self).update_employee(employee).await
    }

    async fn delete_employee(&self, employee_id: &str) -> Result<(), FundError> {
        (**self).delete_employee(employee_id).await
    }

    async fn list_expenses(&self) -> Result<Vec<Expense>, FundError> {
        (**self).list_expenses().await
    }

    async fn get_expense(&self, expense_id: &str) -> Result<Option<Expense>, FundError> {
        (**self).get_expense(expense_id).await
    }

    async fn insert_expense(&self, expense: Expense) -> Result<(), FundError> {
        (**self).insert_expense(expense).await
    }

    async fn update_expense(&self, expense: Expense) -> Result<Expense, FundError> {
        (**self).update_expense(expense).await
    }

    async fn delete_expense(&self, expense_id: &str) -> Result<(), FundError> {
        (**self).delete_expense(expense_id).await
    }

    async fn list_fund_payments(&self) -> Result<Vec<FundPayment>, FundError> {
        (**self).list_fund_payments().await
    }

    async fn insert_fund_payment(&self, payment: FundPayment) -> Result<(), FundError> {
        (**self).insert_fund_payment(payment).await
    }

    async fn get_bill_sharing_history(&self) -> Result<Vec<BillSharingDetail>, FundError> {
        (**self).get_bill_sharing_history().await
    }

    async fn get_bill_sharing(&self, sharing_id: &str) -> Result<Option<BillSharingDetail>, FundError> {
        (**self).get_bill_sharing(sharing_id).await
    }

    async fn get_participant(&self, participant_id: &str) -> Result<Option<BillSharingParticipant>, FundError> {
        (**self).get_participant(participant_id).await
    }

    async fn insert_bill_sharing(&self, sharing: BillSharing) -> Result<(), FundError> {
        (**self).insert_bill_sharing(sharing).await
    }

    async fn insert_bill_sharing_expenses(&self, rows: Vec<BillSharingExpense>) -> Result<(), FundError> {
        (**self).insert_bill_sharing_expenses(rows).await
    }

    async fn insert_bill_sharing_participants(&self, rows: Vec<BillSharingParticipant>) -> Result<(), FundError> {
        (**self).insert_bill_sharing_participants(rows).await
    }

    async fn update_participant_status(
        &self,
        participant_id: &str,
        status: PaymentStatus,
        payment_date: Option<DateTime<Utc>>,
    ) -> Result<BillSharingParticipant, FundError> {
        (**self)
            .update_participant_status(participant_id, status, payment_date)
            .await
    }

    async fn call_finalize(&self, sharing_id: &str) -> Result<bool, FundError> {
        (**self).call_finalize(sharing_id).await
    }

    async fn call_rollback_delete(&self, sharing_id: &str) -> Result<(), FundError> {
        (**self).call_rollback_delete(sharing_id).await
    }

    async fn delete_pending_sharing_cascade(&self, sharing_id: &str) -> Result<(), FundError> {
        (**self).delete_pending_sharing_cascade(sharing_id).await
    }

    fn subscribe(&self) -> broadcast::Receiver<LedgerChange> {
        (**self).subscribe()
    }
}
