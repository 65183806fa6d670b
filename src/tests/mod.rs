mod allocation_props;
mod contribution_tests;
mod settlement_tests;

use crate::core::errors::FundError;
use crate::core::models::{
    AppLog, BillSharing, BillSharingDetail, BillSharingExpense, BillSharingParticipant, Employee, EmployeeStatus, Expense,
    ExpenseCategory, FundPayment, Money, PaymentStatus, SharingStatus,
};
use crate::core::services::FundService;
use crate::infrastructure::logging::LoggingService;
use crate::infrastructure::logging::in_memory::InMemoryLogging;
use crate::infrastructure::storage::in_memory::InMemoryLedger;
use crate::infrastructure::storage::{LedgerChange, LedgerStore};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

pub fn create_test_service() -> FundService<InMemoryLogging, InMemoryLedger> {
    let storage = InMemoryLedger::new();
    let logging = InMemoryLogging::new();
    FundService::new(storage, logging, 0, dec!(100000))
}

pub fn ids(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn employee(id: &str, name: &str, participates_in_fund: bool) -> Employee {
    Employee {
        id: id.to_string(),
        name: name.to_string(),
        department: None,
        participates_in_fund,
        status: EmployeeStatus::Active,
        join_date: Some(date(2024, 1, 1)),
        leave_date: None,
        monthly_contribution: dec!(100000),
    }
}

pub fn expense(id: &str, amount: Money) -> Expense {
    Expense {
        id: id.to_string(),
        amount,
        expense_date: date(2025, 3, 1),
        description: format!("Expense {}", id),
        category: ExpenseCategory::Events,
        notes: None,
        amount_reimbursed: Decimal::ZERO,
        sharing_status: SharingStatus::NotShared,
    }
}

pub async fn seed<L: LoggingService, S: LedgerStore>(
    service: &FundService<L, S>,
    employees: Vec<Employee>,
    expenses: Vec<Expense>,
) {
    for e in employees {
        service.add_employee(e, None).await.unwrap();
    }
    for e in expenses {
        service.record_expense(e, None).await.unwrap();
    }
}

/// In-memory ledger whose individual operations can be switched to fail.
#[derive(Clone, Default)]
pub struct FlakyLedger {
    pub inner: InMemoryLedger,
    pub fail_links: Arc<AtomicBool>,
    pub fail_participants: Arc<AtomicBool>,
    pub fail_status_update: Arc<AtomicBool>,
    pub fail_finalize: Arc<AtomicBool>,
}

impl FlakyLedger {
    fn check(flag: &AtomicBool, op: &str) -> Result<(), FundError> {
        if flag.load(Ordering::SeqCst) {
            return Err(FundError::DatabaseError(format!("injected failure in {}", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for FlakyLedger {
    async fn list_employees(&self) -> Result<Vec<Employee>, FundError> {
        self.inner.list_employees().await
    }

    async fn get_employee(&self, employee_id: &str) -> Result<Option<Employee>, FundError> {
        self.inner.get_employee(employee_id).await
    }

    async fn insert_employee(&self, employee: Employee) -> Result<(), FundError> {
        self.inner.insert_employee(employee).await
    }

    async fn update_employee(&self, employee: Employee) -> Result<(), FundError> {
        self.inner.update_employee(employee).await
    }

    async fn delete_employee(&self, employee_id: &str) -> Result<(), FundError> {
        self.inner.delete_employee(employee_id).await
    }

    async fn list_expenses(&self) -> Result<Vec<Expense>, FundError> {
        self.inner.list_expenses().await
    }

    async fn get_expense(&self, expense_id: &str) -> Result<Option<Expense>, FundError> {
        self.inner.get_expense(expense_id).await
    }

    async fn insert_expense(&self, expense: Expense) -> Result<(), FundError> {
        self.inner.insert_expense(expense).await
    }

    async fn update_expense(&self, expense: Expense) -> Result<Expense, FundError> {
        self.inner.update_expense(expense).await
    }

    async fn delete_expense(&self, expense_id: &str) -> Result<(), FundError> {
        self.inner.delete_expense(expense_id).await
    }

    async fn list_fund_payments(&self) -> Result<Vec<FundPayment>, FundError> {
        self.inner.list_fund_payments().await
    }

    async fn insert_fund_payment(&self, payment: FundPayment) -> Result<(), FundError> {
        self.inner.insert_fund_payment(payment).await
    }

    async fn get_bill_sharing_history(&self) -> Result<Vec<BillSharingDetail>, FundError> {
        self.inner.get_bill_sharing_history().await
    }

    async fn get_bill_sharing(&self, sharing_id: &str) -> Result<Option<BillSharingDetail>, FundError> {
        self.inner.get_bill_sharing(sharing_id).await
    }

    async fn get_participant(&self, participant_id: &str) -> Result<Option<BillSharingParticipant>, FundError> {
        self.inner.get_participant(participant_id).await
    }

    async fn insert_bill_sharing(&self, sharing: BillSharing) -> Result<(), FundError> {
        self.inner.insert_bill_sharing(sharing).await
    }

    async fn insert_bill_sharing_expenses(&self, rows: Vec<BillSharingExpense>) -> Result<(), FundError> {
        Self::check(&self.fail_links, "insert_bill_sharing_expenses")?;
        self.inner.insert_bill_sharing_expenses(rows).await
    }

    async fn insert_bill_sharing_participants(&self, rows: Vec<BillSharingParticipant>) -> Result<(), FundError> {
        Self::check(&self.fail_participants, "insert_bill_sharing_participants")?;
        self.inner.insert_bill_sharing_participants(rows).await
    }

    async fn update_participant_status(
        &self,
        participant_id: &str,
        status: PaymentStatus,
        payment_date: Option<DateTime<Utc>>,
    ) -> Result<BillSharingParticipant, FundError> {
        Self::check(&self.fail_status_update, "update_participant_status")?;
        self.inner
            .update_participant_status(participant_id, status, payment_date)
            .await
    }

    async fn call_finalize(&self, sharing_id: &str) -> Result<bool, FundError> {
        Self::check(&self.fail_finalize, "call_finalize")?;
        self.inner.call_finalize(sharing_id).await
    }

    async fn call_rollback_delete(&self, sharing_id: &str) -> Result<(), FundError> {
        self.inner.call_rollback_delete(sharing_id).await
    }

    async fn delete_pending_sharing_cascade(&self, sharing_id: &str) -> Result<(), FundError> {
        self.inner.delete_pending_sharing_cascade(sharing_id).await
    }

    fn subscribe(&self) -> broadcast::Receiver<LedgerChange> {
        self.inner.subscribe()
    }
}

pub fn create_flaky_service() -> (FundService<InMemoryLogging, FlakyLedger>, FlakyLedger) {
    let ledger = FlakyLedger::default();
    let service = FundService::new(ledger.clone(), InMemoryLogging::new(), 0, dec!(100000));
    (service, ledger)
}

/// Audit trail that rejects every entry.
pub struct FailingLogging;

#[async_trait]
impl LoggingService for FailingLogging {
    async fn log_action(&self, action: &str, _details: serde_json::Value, _actor: Option<&str>) -> Result<(), FundError> {
        Err(FundError::LoggingError(format!("audit trail unavailable for {}", action)))
    }

    async fn get_logs(&self) -> Result<Vec<AppLog>, FundError> {
        Ok(vec![])
    }
}

pub fn create_unaudited_service() -> FundService<FailingLogging, InMemoryLedger> {
    FundService::new(InMemoryLedger::new(), FailingLogging, 0, dec!(100000))
}
