use crate::constants::{
    BILL_SHARING_CREATED, BILL_SHARING_DELETED, BILL_SHARING_FINALIZED, EMPLOYEE_ADDED, EMPLOYEE_DELETED,
    EMPLOYEE_UPDATED, EXPENSE_DELETED, EXPENSE_RECORDED, EXPENSE_UPDATED, FUND_PAYMENT_RECORDED, MAX_AMOUNT,
    MAX_DESCRIPTION_LENGTH, MAX_NAME_LENGTH, PAYMENT_STATUS_CHANGED,
};
use crate::core::allocation::{Breakdown, compute_breakdown};
use crate::core::contribution::ContributionStatus;
use crate::core::draft::{AllocationDraft, DraftRefresh};
use crate::core::errors::{FieldError, FundError};
use crate::core::models::money::checked_total;
use crate::core::models::{
    AppLog, BillSharing, BillSharingDetail, BillSharingExpense, BillSharingParticipant, Employee, Expense,
    FundPayment, Money, PaymentStatus, SharingState, SharingStatus,
};
use crate::core::reconciliation::ReconciliationReport;
use crate::core::roster::{ParticipantFilter, filter_employees};
use crate::core::summary::FundSummary;
use crate::infrastructure::logging::LoggingService;
use crate::infrastructure::storage::{LedgerChange, LedgerStore};
use chrono::{NaiveDate, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// What the auto-finalize check did after a sharing was created or a payment toggled.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AutoFinalize {
    Finalized,
    AlreadyFinalized,
    Outstanding {
        #[schema(value_type = String)]
        remaining: Money,
    },
    /// The status change is committed but finalization failed; carries the reason.
    Failed(String),
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinalizeOutcome {
    Finalized,
    AlreadyFinalized,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct PaymentStatusChange {
    pub participant: BillSharingParticipant,
    pub previous: PaymentStatus,
    pub finalization: AutoFinalize,
}

/// A payment status update that did not reach the store. `previous` is the
/// status the caller displayed before its optimistic flip.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Payment status update for participant {participant_id} failed: {source}")]
pub struct StatusRollback {
    pub participant_id: String,
    pub previous: PaymentStatus,
    pub source: FundError,
}

impl From<StatusRollback> for FundError {
    fn from(rollback: StatusRollback) -> Self {
        rollback.source
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct SharingHistoryEntry {
    pub detail: BillSharingDetail,
    pub report: ReconciliationReport,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct CreatedSharing {
    pub entry: SharingHistoryEntry,
    pub finalization: AutoFinalize,
}

pub struct FundService<L: LoggingService, S: LedgerStore> {
    storage: S,
    logging: L,
    scale: u32,
    default_contribution: Money,
}

impl<L: LoggingService, S: LedgerStore> FundService<L, S> {
    pub fn new(storage: S, logging: L, scale: u32, default_contribution: Money) -> Self {
        FundService {
            storage,
            logging,
            scale,
            default_contribution,
        }
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn default_contribution(&self) -> Money {
        self.default_contribution
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerChange> {
        self.storage.subscribe()
    }

    async fn log_and_audit(
        &self,
        action: &str,
        log_details: serde_json::Value,
        actor: Option<&str>,
    ) -> Result<(), FundError> {
        info!(action, actor = actor.unwrap_or("system"), "{}", log_details);
        self.logging.log_action(action, log_details, actor).await
    }

    /// Audits a change the ledger already committed. The change stands even
    /// when the audit trail rejects the entry.
    async fn audit_committed(&self, action: &str, log_details: serde_json::Value, actor: Option<&str>) {
        if let Err(e) = self.log_and_audit(action, log_details, actor).await {
            warn!("{} committed but audit failed: {}", action, e);
        }
    }

    fn validate_string_input(&self, field: &str, value: &str, max_length: usize) -> Result<(), FundError> {
        if value.trim().is_empty() {
            return Err(FundError::InvalidInput(
                field.to_string(),
                FieldError::new(field, format!("Invalid {}", field), format!("{} cannot be empty", field)),
            ));
        }
        if value.chars().count() > max_length {
            return Err(FundError::InvalidInput(
                field.to_string(),
                FieldError::new(
                    field,
                    format!("{} Too Long", field),
                    format!("{} cannot exceed {} characters", field, max_length),
                ),
            ));
        }
        if value.chars().any(|c| c.is_control()) {
            return Err(FundError::InvalidInput(
                field.to_string(),
                FieldError::new(
                    field,
                    format!("Invalid {}", field),
                    format!("{} contains invalid characters", field),
                ),
            ));
        }
        Ok(())
    }

    fn validate_amount_input(&self, field: &str, amount: Money, allow_zero: bool) -> Result<(), FundError> {
        if amount < Decimal::ZERO {
            return Err(FundError::NegativeAmount);
        }
        if amount.is_zero() && !allow_zero {
            return Err(FundError::InvalidInput(
                field.to_string(),
                FieldError::new(field, "Invalid Amount", "Amount must be greater than 0"),
            ));
        }
        if amount > MAX_AMOUNT {
            return Err(FundError::InvalidInput(
                field.to_string(),
                FieldError::new(field, "Amount Too Large", format!("Amount cannot exceed {}", MAX_AMOUNT)),
            ));
        }
        if amount.normalize().scale() > self.scale {
            return Err(FundError::InvalidInput(
                field.to_string(),
                FieldError::new(
                    field,
                    "Invalid Amount",
                    format!("Amount cannot have more than {} decimal places", self.scale),
                ),
            ));
        }
        Ok(())
    }

    async fn require_sharing(&self, sharing_id: &str) -> Result<BillSharingDetail, FundError> {
        self.storage
            .get_bill_sharing(sharing_id)
            .await?
            .ok_or_else(|| FundError::BillSharingNotFound(sharing_id.to_string()))
    }

    // ---- Allocation ----

    /// Breakdown for the given selection, computed from the ledger's current rows.
    pub async fn preview_breakdown(
        &self,
        expense_ids: &[String],
        participant_ids: &BTreeSet<String>,
        honoree_ids: &BTreeSet<String>,
    ) -> Result<Breakdown, FundError> {
        let selected: BTreeSet<&String> = expense_ids.iter().collect();
        let mut amounts = Vec::with_capacity(selected.len());
        for expense_id in selected {
            let expense = self
                .storage
                .get_expense(expense_id)
                .await?
                .ok_or_else(|| FundError::ExpenseNotFound(expense_id.clone()))?;
            amounts.push(expense.amount);
        }
        let total = checked_total(amounts)?;

        let employees = self.storage.list_employees().await?;
        let fund_flags: HashMap<&str, bool> = employees
            .iter()
            .map(|e| (e.id.as_str(), e.participates_in_fund))
            .collect();
        if let Some(unknown) = participant_ids.iter().find(|id| !fund_flags.contains_key(id.as_str())) {
            return Err(FundError::EmployeeNotFound(unknown.clone()));
        }

        compute_breakdown(
            total,
            participant_ids,
            honoree_ids,
            |id| fund_flags.get(id).copied().unwrap_or(true),
            self.scale,
        )
    }

    /// A fresh draft over the current expenses and employees.
    pub async fn new_draft(&self) -> Result<AllocationDraft, FundError> {
        let expenses = self.storage.list_expenses().await?;
        let employees = self.storage.list_employees().await?;
        Ok(AllocationDraft::new(expenses, employees))
    }

    pub async fn refresh_draft(&self, draft: &mut AllocationDraft) -> Result<DraftRefresh, FundError> {
        let expenses = self.storage.list_expenses().await?;
        let employees = self.storage.list_employees().await?;
        Ok(draft.refresh_catalog(expenses, employees))
    }

    // ---- Settlement lifecycle ----

    /// Stores a bill sharing for the breakdown the caller confirmed.
    ///
    /// The split is recomputed from the ledger and must equal `breakdown`; the
    /// recomputed one is what gets stored. Once the rows are committed the call
    /// succeeds, and a failed auto-finalize is reported in `finalization`.
    pub async fn create_bill_sharing(
        &self,
        expense_ids: &[String],
        breakdown: &Breakdown,
        actor: Option<&str>,
    ) -> Result<CreatedSharing, FundError> {
        let selected: BTreeSet<&String> = expense_ids.iter().collect();
        if selected.is_empty() {
            return Err(FundError::NoExpensesSelected);
        }

        let mut expenses = Vec::with_capacity(selected.len());
        for expense_id in selected {
            let expense = self
                .storage
                .get_expense(expense_id)
                .await?
                .ok_or_else(|| FundError::ExpenseNotFound(expense_id.clone()))?;
            expenses.push(expense);
        }
        let actual = checked_total(expenses.iter().map(|e| e.amount))?;
        if actual != breakdown.total_amount {
            return Err(FundError::StaleDraft {
                expected: breakdown.total_amount,
                actual,
            });
        }

        let participant_ids: BTreeSet<String> = breakdown.shares.keys().cloned().collect();
        let honoree_ids = breakdown.honoree_ids();
        let mut fund_flags = HashMap::with_capacity(participant_ids.len());
        for employee_id in &participant_ids {
            let employee = self
                .storage
                .get_employee(employee_id)
                .await?
                .ok_or_else(|| FundError::EmployeeNotFound(employee_id.clone()))?;
            fund_flags.insert(employee.id, employee.participates_in_fund);
        }
        let confirmed = compute_breakdown(
            actual,
            &participant_ids,
            &honoree_ids,
            |id| fund_flags.get(id).copied().unwrap_or(true),
            self.scale,
        )?;
        if let Some(diverging) = diverging_share(&confirmed, breakdown) {
            return Err(FundError::InvalidInput(
                "breakdown".to_string(),
                FieldError::new(
                    "breakdown",
                    "Breakdown Mismatch",
                    format!("The split for {} no longer matches the ledger, preview it again", diverging),
                ),
            ));
        }

        let owed = confirmed.owed_sum()?;
        if owed > actual {
            warn!(
                "Breakdown collects {} for a total of {} ({} participants, {} honorees)",
                owed,
                actual,
                participant_ids.len(),
                honoree_ids.len()
            );
        }

        let now = Utc::now().trunc_subsecs(6);
        let mut sharing = BillSharing {
            id: Uuid::new_v4().to_string(),
            total_amount: actual,
            sharing_date: now.date_naive(),
            status: SharingState::Pending,
            created_at: now,
        };
        let sharing_id = sharing.id.clone();
        self.storage.insert_bill_sharing(sharing.clone()).await?;

        let links: Vec<BillSharingExpense> = expenses
            .iter()
            .map(|e| BillSharingExpense {
                id: Uuid::new_v4().to_string(),
                bill_sharing_id: sharing_id.clone(),
                expense_id: e.id.clone(),
                amount: e.amount,
            })
            .collect();
        if let Err(cause) = self.storage.insert_bill_sharing_expenses(links.clone()).await {
            return Err(self.discard_partial_sharing(&sharing_id, cause).await);
        }

        let participants: Vec<BillSharingParticipant> = confirmed
            .direct_payers()
            .map(|s| BillSharingParticipant {
                id: Uuid::new_v4().to_string(),
                bill_sharing_id: sharing_id.clone(),
                employee_id: s.employee_id.clone(),
                amount_owed: s.amount_owed,
                is_birthday_person: s.is_honoree,
                payment_method: s.payment_method,
                payment_status: PaymentStatus::Pending,
                payment_date: None,
            })
            .collect();
        if !participants.is_empty() {
            if let Err(cause) = self.storage.insert_bill_sharing_participants(participants.clone()).await {
                return Err(self.discard_partial_sharing(&sharing_id, cause).await);
            }
        }

        self.audit_committed(
            BILL_SHARING_CREATED,
            json!({
                "bill_sharing_id": sharing_id,
                "total_amount": actual,
                "expense_ids": expenses.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
                "participants": participant_ids.len(),
                "direct_payers": participants.len(),
                "honorees": honoree_ids,
            }),
            actor,
        )
        .await;

        let finalization = self.auto_finalize_reporting_failure(&sharing_id).await;
        if matches!(finalization, AutoFinalize::Finalized | AutoFinalize::AlreadyFinalized) {
            sharing.status = SharingState::Finalized;
        }
        let detail = BillSharingDetail {
            sharing,
            participants,
            expenses: links,
        };
        let report = ReconciliationReport::from_detail(&detail);
        Ok(CreatedSharing {
            entry: SharingHistoryEntry { detail, report },
            finalization,
        })
    }

    async fn discard_partial_sharing(&self, sharing_id: &str, cause: FundError) -> FundError {
        warn!("Creating bill sharing {} failed, discarding it: {}", sharing_id, cause);
        if let Err(cleanup) = self.storage.delete_pending_sharing_cascade(sharing_id).await {
            error!("Could not discard partial bill sharing {}: {}", sharing_id, cleanup);
        }
        cause
    }

    /// Flips a participant's payment status relative to `current_status`, the
    /// status the caller is displaying. Concurrent toggles are last-writer-wins.
    pub async fn toggle_payment_status(
        &self,
        participant_id: &str,
        current_status: PaymentStatus,
        actor: Option<&str>,
    ) -> Result<PaymentStatusChange, StatusRollback> {
        let next = current_status.toggled();
        let payment_date = (next == PaymentStatus::Paid).then(Utc::now);

        let participant = self
            .storage
            .update_participant_status(participant_id, next, payment_date)
            .await
            .map_err(|source| {
                warn!("Reverting payment status of {} to {}: {}", participant_id, current_status, source);
                StatusRollback {
                    participant_id: participant_id.to_string(),
                    previous: current_status,
                    source,
                }
            })?;

        self.audit_committed(
            PAYMENT_STATUS_CHANGED,
            json!({
                "participant_id": participant.id,
                "bill_sharing_id": participant.bill_sharing_id,
                "employee_id": participant.employee_id,
                "from": current_status,
                "to": next,
            }),
            actor,
        )
        .await;

        let finalization = self.auto_finalize_reporting_failure(&participant.bill_sharing_id).await;

        Ok(PaymentStatusChange {
            participant,
            previous: current_status,
            finalization,
        })
    }

    /// Finalizes the sharing once nothing is left to collect directly.
    pub async fn auto_finalize_if_eligible(&self, sharing_id: &str) -> Result<AutoFinalize, FundError> {
        let detail = self.require_sharing(sharing_id).await?;
        if detail.is_finalized() {
            return Ok(AutoFinalize::AlreadyFinalized);
        }
        let report = ReconciliationReport::from_detail(&detail);
        if !report.is_fully_collected() {
            return Ok(AutoFinalize::Outstanding {
                remaining: report.direct_outstanding,
            });
        }
        Ok(match self.finalize(sharing_id, None).await? {
            FinalizeOutcome::Finalized => AutoFinalize::Finalized,
            FinalizeOutcome::AlreadyFinalized => AutoFinalize::AlreadyFinalized,
        })
    }

    async fn auto_finalize_reporting_failure(&self, sharing_id: &str) -> AutoFinalize {
        match self.auto_finalize_if_eligible(sharing_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Auto-finalize of {} failed: {}", sharing_id, e);
                AutoFinalize::Failed(e.to_string())
            }
        }
    }

    pub async fn finalize(&self, sharing_id: &str, actor: Option<&str>) -> Result<FinalizeOutcome, FundError> {
        if !self.storage.call_finalize(sharing_id).await? {
            return Ok(FinalizeOutcome::AlreadyFinalized);
        }
        self.audit_committed(BILL_SHARING_FINALIZED, json!({ "bill_sharing_id": sharing_id }), actor)
            .await;
        Ok(FinalizeOutcome::Finalized)
    }

    /// Removes a sharing. A finalized one has its reimbursement reverted first.
    /// Returns whether a rollback happened.
    pub async fn delete_bill_sharing(&self, sharing_id: &str, actor: Option<&str>) -> Result<bool, FundError> {
        let detail = self.require_sharing(sharing_id).await?;
        let rolled_back = detail.is_finalized();
        if rolled_back {
            self.storage.call_rollback_delete(sharing_id).await?;
        } else {
            self.storage.delete_pending_sharing_cascade(sharing_id).await?;
        }

        self.audit_committed(
            BILL_SHARING_DELETED,
            json!({
                "bill_sharing_id": sharing_id,
                "total_amount": detail.sharing.total_amount,
                "rolled_back": rolled_back,
            }),
            actor,
        )
        .await;
        Ok(rolled_back)
    }

    pub async fn get_bill_sharing(&self, sharing_id: &str) -> Result<SharingHistoryEntry, FundError> {
        let detail = self.require_sharing(sharing_id).await?;
        let report = ReconciliationReport::from_detail(&detail);
        Ok(SharingHistoryEntry { detail, report })
    }

    /// Newest first.
    pub async fn bill_sharing_history(&self) -> Result<Vec<SharingHistoryEntry>, FundError> {
        let history = self.storage.get_bill_sharing_history().await?;
        Ok(history
            .into_iter()
            .map(|detail| {
                let report = ReconciliationReport::from_detail(&detail);
                SharingHistoryEntry { detail, report }
            })
            .collect())
    }

    // ---- Ledger ----

    pub async fn list_employees(&self, filter: ParticipantFilter) -> Result<Vec<Employee>, FundError> {
        let employees = self.storage.list_employees().await?;
        Ok(filter_employees(&employees, filter))
    }

    fn validate_employee(&self, employee: &mut Employee) -> Result<(), FundError> {
        self.validate_string_input("name", &employee.name, MAX_NAME_LENGTH)?;
        self.validate_amount_input("monthly_contribution", employee.monthly_contribution, true)?;
        if let (Some(joined), Some(left)) = (employee.join_date, employee.leave_date) {
            if left < joined {
                return Err(FundError::InvalidInput(
                    "leave_date".to_string(),
                    FieldError::new("leave_date", "Invalid Leave Date", "Leave date cannot precede join date"),
                ));
            }
        }
        employee.name = employee.name.trim().to_string();
        Ok(())
    }

    pub async fn add_employee(&self, mut employee: Employee, actor: Option<&str>) -> Result<Employee, FundError> {
        self.validate_employee(&mut employee)?;
        if employee.id.trim().is_empty() {
            employee.id = Uuid::new_v4().to_string();
        }

        self.storage.insert_employee(employee.clone()).await?;
        self.audit_committed(
            EMPLOYEE_ADDED,
            json!({
                "employee_id": employee.id,
                "name": employee.name,
                "participates_in_fund": employee.participates_in_fund,
            }),
            actor,
        )
        .await;
        Ok(employee)
    }

    /// Replaces the stored record with the same id. Existing shares keep the
    /// fund flag they were computed with.
    pub async fn update_employee(&self, mut employee: Employee, actor: Option<&str>) -> Result<Employee, FundError> {
        self.validate_employee(&mut employee)?;
        self.storage.update_employee(employee.clone()).await?;
        self.audit_committed(
            EMPLOYEE_UPDATED,
            json!({
                "employee_id": employee.id,
                "name": employee.name,
                "status": employee.status,
                "participates_in_fund": employee.participates_in_fund,
            }),
            actor,
        )
        .await;
        Ok(employee)
    }

    /// Employees with fund payments or bill sharing shares are kept; mark them
    /// inactive instead.
    pub async fn delete_employee(&self, employee_id: &str, actor: Option<&str>) -> Result<(), FundError> {
        self.storage.delete_employee(employee_id).await?;
        self.audit_committed(EMPLOYEE_DELETED, json!({ "employee_id": employee_id }), actor)
            .await;
        Ok(())
    }

    /// Where every employee stands with their monthly contribution today.
    pub async fn contribution_statuses(&self) -> Result<Vec<ContributionStatus>, FundError> {
        let employees = self.storage.list_employees().await?;
        let payments = self.storage.list_fund_payments().await?;
        let today = Utc::now().date_naive();
        employees
            .iter()
            .map(|employee| ContributionStatus::compute(employee, &payments, today))
            .collect()
    }

    pub async fn list_expenses(&self) -> Result<Vec<Expense>, FundError> {
        self.storage.list_expenses().await
    }

    fn validate_expense(&self, expense: &Expense) -> Result<(), FundError> {
        self.validate_amount_input("amount", expense.amount, true)?;
        self.validate_string_input("description", &expense.description, MAX_DESCRIPTION_LENGTH)
    }

    /// New expenses start unshared and unreimbursed regardless of the input.
    pub async fn record_expense(&self, mut expense: Expense, actor: Option<&str>) -> Result<Expense, FundError> {
        self.validate_expense(&expense)?;
        if expense.id.trim().is_empty() {
            expense.id = Uuid::new_v4().to_string();
        }
        expense.amount_reimbursed = Decimal::ZERO;
        expense.sharing_status = SharingStatus::NotShared;

        self.storage.insert_expense(expense.clone()).await?;
        self.audit_committed(
            EXPENSE_RECORDED,
            json!({
                "expense_id": expense.id,
                "amount": expense.amount,
                "category": expense.category,
                "description": expense.description,
            }),
            actor,
        )
        .await;
        Ok(expense)
    }

    /// Edits the descriptive fields of an expense. The store keeps its
    /// reimbursement state and refuses a new amount while a bill sharing
    /// links the expense.
    pub async fn update_expense(&self, expense: Expense, actor: Option<&str>) -> Result<Expense, FundError> {
        self.validate_expense(&expense)?;
        let stored = self.storage.update_expense(expense).await?;
        self.audit_committed(
            EXPENSE_UPDATED,
            json!({
                "expense_id": stored.id,
                "amount": stored.amount,
                "category": stored.category,
                "description": stored.description,
            }),
            actor,
        )
        .await;
        Ok(stored)
    }

    pub async fn delete_expense(&self, expense_id: &str, actor: Option<&str>) -> Result<(), FundError> {
        self.storage.delete_expense(expense_id).await?;
        self.audit_committed(EXPENSE_DELETED, json!({ "expense_id": expense_id }), actor)
            .await;
        Ok(())
    }

    pub async fn list_fund_payments(&self) -> Result<Vec<FundPayment>, FundError> {
        self.storage.list_fund_payments().await
    }

    /// `months_covered` entries are `YYYY-MM`; they are stored sorted and deduplicated.
    pub async fn record_fund_payment(
        &self,
        mut payment: FundPayment,
        actor: Option<&str>,
    ) -> Result<FundPayment, FundError> {
        self.validate_amount_input("amount", payment.amount, false)?;
        let months: BTreeSet<String> = payment.months_covered.iter().map(|m| m.trim().to_string()).collect();
        if months.is_empty() {
            return Err(FundError::InvalidInput(
                "months_covered".to_string(),
                FieldError::new("months_covered", "Invalid Months", "At least one month must be covered"),
            ));
        }
        if let Some(bad) = months
            .iter()
            .find(|m| m.len() != 7 || NaiveDate::parse_from_str(&format!("{}-01", m), "%Y-%m-%d").is_err())
        {
            return Err(FundError::InvalidInput(
                "months_covered".to_string(),
                FieldError::new(
                    "months_covered",
                    "Invalid Month",
                    format!("`{}` is not a month in YYYY-MM form", bad),
                ),
            ));
        }
        if self.storage.get_employee(&payment.employee_id).await?.is_none() {
            return Err(FundError::EmployeeNotFound(payment.employee_id));
        }
        if payment.id.trim().is_empty() {
            payment.id = Uuid::new_v4().to_string();
        }
        payment.months_covered = months.into_iter().collect();

        self.storage.insert_fund_payment(payment.clone()).await?;
        self.audit_committed(
            FUND_PAYMENT_RECORDED,
            json!({
                "fund_payment_id": payment.id,
                "employee_id": payment.employee_id,
                "amount": payment.amount,
                "months_covered": payment.months_covered,
            }),
            actor,
        )
        .await;
        Ok(payment)
    }

    pub async fn fund_summary(&self) -> Result<FundSummary, FundError> {
        let employees = self.storage.list_employees().await?;
        let expenses = self.storage.list_expenses().await?;
        let payments = self.storage.list_fund_payments().await?;
        Ok(FundSummary::compute(&employees, &expenses, &payments))
    }

    pub async fn get_app_logs(&self) -> Result<Vec<AppLog>, FundError> {
        self.logging.get_logs().await
    }
}

/// First participant whose submitted share differs from the recomputed one,
/// or `totals` when only the aggregate figures differ.
fn diverging_share(expected: &Breakdown, submitted: &Breakdown) -> Option<String> {
    if let Some(id) = submitted
        .shares
        .iter()
        .find(|(id, share)| expected.shares.get(*id) != Some(*share))
        .map(|(id, _)| id.clone())
    {
        return Some(id);
    }
    (expected != submitted).then(|| "totals".to_string())
}
