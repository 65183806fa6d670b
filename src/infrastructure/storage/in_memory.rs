use crate::core::errors::FundError;
use crate::core::models::{
    BillSharing, BillSharingDetail, BillSharingExpense, BillSharingParticipant, Employee, EmployeeStatus, Expense,
    ExpenseCategory, FundPayment, FundPaymentMethod, PaymentStatus, SharingState, SharingStatus,
};
use crate::infrastructure::storage::{CHANGE_CHANNEL_CAPACITY, LedgerChange, LedgerStore};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Default)]
struct LedgerTables {
    employees: HashMap<String, Employee>,
    expenses: HashMap<String, Expense>,
    fund_payments: Vec<FundPayment>,
    sharings: HashMap<String, BillSharing>,
    sharing_expenses: Vec<BillSharingExpense>,
    participants: HashMap<String, BillSharingParticipant>,
}

impl LedgerTables {
    fn detail(&self, sharing: &BillSharing) -> BillSharingDetail {
        let mut participants: Vec<BillSharingParticipant> = self
            .participants
            .values()
            .filter(|p| p.bill_sharing_id == sharing.id)
            .cloned()
            .collect();
        participants.sort_by(|a, b| a.employee_id.cmp(&b.employee_id));
        BillSharingDetail {
            sharing: sharing.clone(),
            participants,
            expenses: self
                .sharing_expenses
                .iter()
                .filter(|l| l.bill_sharing_id == sharing.id)
                .cloned()
                .collect(),
        }
    }

    fn is_linked(&self, expense_id: &str) -> bool {
        self.sharing_expenses.iter().any(|l| l.expense_id == expense_id)
    }

    /// Drops a sharing with its participants and links, returning the links.
    fn remove_sharing_rows(&mut self, sharing_id: &str) -> Vec<BillSharingExpense> {
        self.participants.retain(|_, p| p.bill_sharing_id != sharing_id);
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.sharing_expenses)
            .into_iter()
            .partition(|l| l.bill_sharing_id == sharing_id);
        self.sharing_expenses = kept;
        self.sharings.remove(sharing_id);
        removed
    }

    fn sharing_state(&self, sharing_id: &str) -> Result<SharingState, FundError> {
        self.sharings
            .get(sharing_id)
            .map(|s| s.status)
            .ok_or_else(|| FundError::BillSharingNotFound(sharing_id.to_string()))
    }
}

/// Ledger kept in process memory. Every multi-table operation runs under a
/// single write lock, which makes it atomic for readers.
#[derive(Clone)]
pub struct InMemoryLedger {
    tables: Arc<RwLock<LedgerTables>>,
    changes: broadcast::Sender<LedgerChange>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::from_tables(LedgerTables::default())
    }

    /// Ledger prefilled with a small office, used in development mode.
    pub fn with_demo_data() -> Self {
        let mut tables = LedgerTables::default();
        for employee in demo_employees() {
            if employee.participates_in_fund {
                tables.fund_payments.push(FundPayment {
                    id: Uuid::new_v4().to_string(),
                    employee_id: employee.id.clone(),
                    amount: dec!(100000),
                    payment_date: demo_date(2025, 1, 5),
                    months_covered: vec!["2025-01".to_string()],
                    payment_method: FundPaymentMethod::Cash,
                    notes: None,
                });
            }
            tables.employees.insert(employee.id.clone(), employee);
        }
        for expense in demo_expenses() {
            tables.expenses.insert(expense.id.clone(), expense);
        }
        Self::from_tables(tables)
    }

    fn from_tables(tables: LedgerTables) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        InMemoryLedger {
            tables: Arc::new(RwLock::new(tables)),
            changes,
        }
    }

    fn notify(&self, change: LedgerChange) {
        // No subscribers is fine.
        let _ = self.changes.send(change);
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn list_employees(&self) -> Result<Vec<Employee>, FundError> {
        let tables = self.tables.read().await;
        let mut employees: Vec<Employee> = tables.employees.values().cloned().collect();
        employees.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(employees)
    }

    async fn get_employee(&self, employee_id: &str) -> Result<Option<Employee>, FundError> {
        let tables = self.tables.read().await;
        Ok(tables.employees.get(employee_id).cloned())
    }

    async fn insert_employee(&self, employee: Employee) -> Result<(), FundError> {
        let mut tables = self.tables.write().await;
        tables.employees.insert(employee.id.clone(), employee);
        drop(tables);
        self.notify(LedgerChange::Employees);
        Ok(())
    }

    async fn update_employee(&self, employee: Employee) -> Result<(), FundError> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .employees
            .get_mut(&employee.id)
            .ok_or_else(|| FundError::EmployeeNotFound(employee.id.clone()))?;
        *stored = employee;
        drop(tables);
        self.notify(LedgerChange::Employees);
        Ok(())
    }

    async fn delete_employee(&self, employee_id: &str) -> Result<(), FundError> {
        let mut tables = self.tables.write().await;
        if !tables.employees.contains_key(employee_id) {
            return Err(FundError::EmployeeNotFound(employee_id.to_string()));
        }
        let referenced = tables.fund_payments.iter().any(|p| p.employee_id == employee_id)
            || tables.participants.values().any(|p| p.employee_id == employee_id);
        if referenced {
            return Err(FundError::EmployeeInUse(employee_id.to_string()));
        }
        tables.employees.remove(employee_id);
        drop(tables);
        self.notify(LedgerChange::Employees);
        Ok(())
    }

    async fn list_expenses(&self) -> Result<Vec<Expense>, FundError> {
        let tables = self.tables.read().await;
        let mut expenses: Vec<Expense> = tables.expenses.values().cloned().collect();
        expenses.sort_by(|a, b| b.expense_date.cmp(&a.expense_date).then_with(|| a.id.cmp(&b.id)));
        Ok(expenses)
    }

    async fn get_expense(&self, expense_id: &str) -> Result<Option<Expense>, FundError> {
        let tables = self.tables.read().await;
        Ok(tables.expenses.get(expense_id).cloned())
    }

    async fn insert_expense(&self, expense: Expense) -> Result<(), FundError> {
        let mut tables = self.tables.write().await;
        tables.expenses.insert(expense.id.clone(), expense);
        drop(tables);
        self.notify(LedgerChange::Expenses);
        Ok(())
    }

    async fn update_expense(&self, expense: Expense) -> Result<Expense, FundError> {
        let mut tables = self.tables.write().await;
        let linked = tables.is_linked(&expense.id);
        let stored = tables
            .expenses
            .get_mut(&expense.id)
            .ok_or_else(|| FundError::ExpenseNotFound(expense.id.clone()))?;
        if linked && stored.amount != expense.amount {
            return Err(FundError::ExpenseInUse(expense.id));
        }
        *stored = Expense {
            amount_reimbursed: stored.amount_reimbursed,
            sharing_status: stored.sharing_status,
            ..expense
        };
        let updated = stored.clone();
        drop(tables);
        self.notify(LedgerChange::Expenses);
        Ok(updated)
    }

    async fn delete_expense(&self, expense_id: &str) -> Result<(), FundError> {
        let mut tables = self.tables.write().await;
        if !tables.expenses.contains_key(expense_id) {
            return Err(FundError::ExpenseNotFound(expense_id.to_string()));
        }
        if tables.is_linked(expense_id) {
            return Err(FundError::ExpenseInUse(expense_id.to_string()));
        }
        tables.expenses.remove(expense_id);
        drop(tables);
        self.notify(LedgerChange::Expenses);
        Ok(())
    }

    async fn list_fund_payments(&self) -> Result<Vec<FundPayment>, FundError> {
        let tables = self.tables.read().await;
        let mut payments = tables.fund_payments.clone();
        payments.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));
        Ok(payments)
    }

    async fn insert_fund_payment(&self, payment: FundPayment) -> Result<(), FundError> {
        let mut tables = self.tables.write().await;
        if !tables.employees.contains_key(&payment.employee_id) {
            return Err(FundError::EmployeeNotFound(payment.employee_id));
        }
        tables.fund_payments.push(payment);
        drop(tables);
        self.notify(LedgerChange::FundPayments);
        Ok(())
    }

    async fn get_bill_sharing_history(&self) -> Result<Vec<BillSharingDetail>, FundError> {
        let tables = self.tables.read().await;
        let mut sharings: Vec<&BillSharing> = tables.sharings.values().collect();
        sharings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sharings.into_iter().map(|s| tables.detail(s)).collect())
    }

    async fn get_bill_sharing(&self, sharing_id: &str) -> Result<Option<BillSharingDetail>, FundError> {
        let tables = self.tables.read().await;
        Ok(tables.sharings.get(sharing_id).map(|s| tables.detail(s)))
    }

    async fn get_participant(&self, participant_id: &str) -> Result<Option<BillSharingParticipant>, FundError> {
        let tables = self.tables.read().await;
        Ok(tables.participants.get(participant_id).cloned())
    }

    async fn insert_bill_sharing(&self, sharing: BillSharing) -> Result<(), FundError> {
        let mut tables = self.tables.write().await;
        if tables.sharings.contains_key(&sharing.id) {
            return Err(FundError::StorageError(format!(
                "bill sharing {} already exists",
                sharing.id
            )));
        }
        let sharing_id = sharing.id.clone();
        tables.sharings.insert(sharing.id.clone(), sharing);
        drop(tables);
        self.notify(LedgerChange::BillSharing(sharing_id));
        Ok(())
    }

    async fn insert_bill_sharing_expenses(&self, rows: Vec<BillSharingExpense>) -> Result<(), FundError> {
        let mut tables = self.tables.write().await;
        for row in &rows {
            if !tables.sharings.contains_key(&row.bill_sharing_id) {
                return Err(FundError::BillSharingNotFound(row.bill_sharing_id.clone()));
            }
            if !tables.expenses.contains_key(&row.expense_id) {
                return Err(FundError::ExpenseNotFound(row.expense_id.clone()));
            }
        }
        let mut touched = HashSet::new();
        for row in rows {
            if let Some(expense) = tables.expenses.get_mut(&row.expense_id) {
                if expense.sharing_status == SharingStatus::NotShared {
                    expense.sharing_status = SharingStatus::Shared;
                }
            }
            touched.insert(row.bill_sharing_id.clone());
            tables.sharing_expenses.push(row);
        }
        drop(tables);
        self.notify(LedgerChange::Expenses);
        for sharing_id in touched {
            self.notify(LedgerChange::BillSharing(sharing_id));
        }
        Ok(())
    }

    async fn insert_bill_sharing_participants(&self, rows: Vec<BillSharingParticipant>) -> Result<(), FundError> {
        let mut tables = self.tables.write().await;
        for row in &rows {
            if !tables.sharings.contains_key(&row.bill_sharing_id) {
                return Err(FundError::BillSharingNotFound(row.bill_sharing_id.clone()));
            }
        }
        let mut touched = HashSet::new();
        for row in rows {
            touched.insert(row.bill_sharing_id.clone());
            tables.participants.insert(row.id.clone(), row);
        }
        drop(tables);
        for sharing_id in touched {
            self.notify(LedgerChange::BillSharing(sharing_id));
        }
        Ok(())
    }

    async fn update_participant_status(
        &self,
        participant_id: &str,
        status: PaymentStatus,
        payment_date: Option<DateTime<Utc>>,
    ) -> Result<BillSharingParticipant, FundError> {
        let mut tables = self.tables.write().await;
        let participant = tables
            .participants
            .get_mut(participant_id)
            .ok_or_else(|| FundError::ParticipantNotFound(participant_id.to_string()))?;
        participant.payment_status = status;
        participant.payment_date = payment_date;
        let updated = participant.clone();
        drop(tables);
        self.notify(LedgerChange::BillSharing(updated.bill_sharing_id.clone()));
        Ok(updated)
    }

    async fn call_finalize(&self, sharing_id: &str) -> Result<bool, FundError> {
        let mut tables = self.tables.write().await;
        if tables.sharing_state(sharing_id)? == SharingState::Finalized {
            debug!("Bill sharing {} already finalized, skipping", sharing_id);
            return Ok(false);
        }

        let links: Vec<BillSharingExpense> = tables
            .sharing_expenses
            .iter()
            .filter(|l| l.bill_sharing_id == sharing_id)
            .cloned()
            .collect();
        for link in &links {
            match tables.expenses.get_mut(&link.expense_id) {
                Some(expense) => expense.apply_reimbursement(link.amount, true),
                None => warn!("Expense {} linked from {} is gone", link.expense_id, sharing_id),
            }
        }
        if let Some(sharing) = tables.sharings.get_mut(sharing_id) {
            sharing.status = SharingState::Finalized;
        }
        drop(tables);

        self.notify(LedgerChange::Expenses);
        self.notify(LedgerChange::BillSharing(sharing_id.to_string()));
        Ok(true)
    }

    async fn call_rollback_delete(&self, sharing_id: &str) -> Result<(), FundError> {
        let mut tables = self.tables.write().await;
        if tables.sharing_state(sharing_id)? != SharingState::Finalized {
            return Err(FundError::SharingNotFinalized(sharing_id.to_string()));
        }

        let links = tables.remove_sharing_rows(sharing_id);
        for link in &links {
            let linked = tables.is_linked(&link.expense_id);
            if let Some(expense) = tables.expenses.get_mut(&link.expense_id) {
                expense.apply_reimbursement(-link.amount, linked);
            }
        }
        drop(tables);

        self.notify(LedgerChange::Expenses);
        self.notify(LedgerChange::BillSharing(sharing_id.to_string()));
        Ok(())
    }

    async fn delete_pending_sharing_cascade(&self, sharing_id: &str) -> Result<(), FundError> {
        let mut tables = self.tables.write().await;
        if tables.sharing_state(sharing_id)? != SharingState::Pending {
            return Err(FundError::SharingNotPending(sharing_id.to_string()));
        }

        let links = tables.remove_sharing_rows(sharing_id);
        for link in &links {
            let linked = tables.is_linked(&link.expense_id);
            if let Some(expense) = tables.expenses.get_mut(&link.expense_id) {
                expense.refresh_sharing_status(linked);
            }
        }
        drop(tables);

        self.notify(LedgerChange::Expenses);
        self.notify(LedgerChange::BillSharing(sharing_id.to_string()));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<LedgerChange> {
        self.changes.subscribe()
    }
}

fn demo_date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn demo_employees() -> Vec<Employee> {
    [
        ("Nguyễn Văn A", "IT", true),
        ("Trần Thị B", "HR", true),
        ("Lê Văn C", "Finance", false),
        ("Phạm Thị D", "Sales", false),
    ]
    .into_iter()
    .map(|(name, department, participates_in_fund)| Employee {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        department: Some(department.to_string()),
        participates_in_fund,
        status: EmployeeStatus::Active,
        join_date: Some(demo_date(2024, 1, 1)),
        leave_date: None,
        monthly_contribution: dec!(100000),
    })
    .collect()
}

fn demo_expenses() -> Vec<Expense> {
    [
        ("Birthday cake", ExpenseCategory::Events, dec!(400000), 10),
        ("Flowers", ExpenseCategory::Gifts, dec!(200000), 12),
    ]
    .into_iter()
    .map(|(description, category, amount, day)| Expense {
        id: Uuid::new_v4().to_string(),
        amount,
        expense_date: demo_date(2025, 1, day),
        description: description.to_string(),
        category,
        notes: None,
        amount_reimbursed: Decimal::ZERO,
        sharing_status: SharingStatus::NotShared,
    })
    .collect()
}
