use crate::{
    api::models::*,
    core::{
        allocation::Breakdown,
        contribution::ContributionStatus,
        models::{AppLog, Employee, EmployeeStatus, Expense, FundPayment, SharingStatus},
        services::{CreatedSharing, FinalizeOutcome, FundService, PaymentStatusChange, SharingHistoryEntry},
        summary::FundSummary,
    },
    infrastructure::{logging::in_memory::InMemoryLogging, storage::SharedLedger},
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::sync::Arc;

pub type AppService = FundService<InMemoryLogging, SharedLedger>;

// Define API routes
pub fn api_routes(service: Arc<AppService>) -> Router {
    Router::new()
        .route("/bill-sharings", get(get_bill_sharing_history).post(create_bill_sharing))
        .route("/bill-sharings/preview", post(preview_breakdown))
        .route(
            "/bill-sharings/{sharing_id}",
            get(get_bill_sharing).delete(delete_bill_sharing),
        )
        .route("/bill-sharings/{sharing_id}/finalize", post(finalize_bill_sharing))
        .route("/participants/{participant_id}/toggle", post(toggle_payment_status))
        .route("/employees", get(list_employees).post(add_employee))
        .route(
            "/employees/{employee_id}",
            put(update_employee).delete(delete_employee),
        )
        .route("/contributions", get(list_contributions))
        .route("/expenses", get(list_expenses).post(record_expense))
        .route("/expenses/{expense_id}", put(update_expense).delete(delete_expense))
        .route("/fund-payments", get(list_fund_payments).post(record_fund_payment))
        .route("/summary", get(get_fund_summary))
        .route("/logs", get(get_app_logs))
        .with_state(service)
}

#[utoipa::path(
    post,
    path = "/api/bill-sharings/preview",
    request_body = PreviewBreakdownRequest,
    responses(
        (status = 200, description = "Breakdown computed", body = Breakdown),
        (status = 400, description = "Invalid selection", body = ErrorResponse),
        (status = 404, description = "Expense or employee not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn preview_breakdown(
    State(service): State<Arc<AppService>>,
    Json(req): Json<PreviewBreakdownRequest>,
) -> Result<Json<Breakdown>, ApiError> {
    let participants: BTreeSet<String> = req.participant_ids.into_iter().collect();
    let honorees: BTreeSet<String> = req.honoree_ids.into_iter().collect();
    let breakdown = service
        .preview_breakdown(&req.expense_ids, &participants, &honorees)
        .await?;
    Ok(Json(breakdown))
}

#[utoipa::path(
    post,
    path = "/api/bill-sharings",
    request_body = CreateBillSharingRequest,
    responses(
        (status = 201, description = "Bill sharing created", body = CreatedSharing),
        (status = 400, description = "Invalid, stale or altered breakdown", body = ErrorResponse),
        (status = 404, description = "Expense or employee not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn create_bill_sharing(
    State(service): State<Arc<AppService>>,
    Json(req): Json<CreateBillSharingRequest>,
) -> Result<(StatusCode, Json<CreatedSharing>), ApiError> {
    let created = service
        .create_bill_sharing(&req.expense_ids, &req.breakdown, req.actor_id.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/bill-sharings",
    responses(
        (status = 200, description = "Bill sharings, newest first", body = Vec<SharingHistoryEntry>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn get_bill_sharing_history(
    State(service): State<Arc<AppService>>,
) -> Result<Json<Vec<SharingHistoryEntry>>, ApiError> {
    let history = service.bill_sharing_history().await?;
    Ok(Json(history))
}

#[utoipa::path(
    get,
    path = "/api/bill-sharings/{sharing_id}",
    params(
        ("sharing_id" = String, Path, description = "ID of the bill sharing")
    ),
    responses(
        (status = 200, description = "Bill sharing with its collection report", body = SharingHistoryEntry),
        (status = 404, description = "Bill sharing not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn get_bill_sharing(
    State(service): State<Arc<AppService>>,
    Path(sharing_id): Path<String>,
) -> Result<Json<SharingHistoryEntry>, ApiError> {
    let entry = service.get_bill_sharing(&sharing_id).await?;
    Ok(Json(entry))
}

#[utoipa::path(
    post,
    path = "/api/bill-sharings/{sharing_id}/finalize",
    params(
        ("sharing_id" = String, Path, description = "ID of the bill sharing")
    ),
    request_body = ActorRequest,
    responses(
        (status = 200, description = "Bill sharing finalized, or already was", body = FinalizeOutcome),
        (status = 404, description = "Bill sharing not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn finalize_bill_sharing(
    State(service): State<Arc<AppService>>,
    Path(sharing_id): Path<String>,
    Json(req): Json<ActorRequest>,
) -> Result<Json<FinalizeOutcome>, ApiError> {
    let outcome = service.finalize(&sharing_id, req.actor_id.as_deref()).await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    delete,
    path = "/api/bill-sharings/{sharing_id}",
    params(
        ("sharing_id" = String, Path, description = "ID of the bill sharing"),
        ("actor_id" = Option<String>, Query, description = "Who performs the deletion")
    ),
    responses(
        (status = 200, description = "Bill sharing deleted", body = DeleteBillSharingResponse),
        (status = 404, description = "Bill sharing not found", body = ErrorResponse),
        (status = 409, description = "Bill sharing changed state meanwhile, retry", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn delete_bill_sharing(
    State(service): State<Arc<AppService>>,
    Path(sharing_id): Path<String>,
    Query(req): Query<ActorRequest>,
) -> Result<Json<DeleteBillSharingResponse>, ApiError> {
    let rolled_back = service
        .delete_bill_sharing(&sharing_id, req.actor_id.as_deref())
        .await?;
    Ok(Json(DeleteBillSharingResponse {
        bill_sharing_id: sharing_id,
        rolled_back,
    }))
}

#[utoipa::path(
    post,
    path = "/api/participants/{participant_id}/toggle",
    params(
        ("participant_id" = String, Path, description = "ID of the bill sharing participant")
    ),
    request_body = TogglePaymentRequest,
    responses(
        (status = 200, description = "Payment status flipped", body = PaymentStatusChange),
        (status = 404, description = "Participant not found", body = ToggleFailedResponse),
        (status = 500, description = "Status could not be stored", body = ToggleFailedResponse)
    )
)]
async fn toggle_payment_status(
    State(service): State<Arc<AppService>>,
    Path(participant_id): Path<String>,
    Json(req): Json<TogglePaymentRequest>,
) -> Result<Json<PaymentStatusChange>, ToggleError> {
    let change = service
        .toggle_payment_status(&participant_id, req.current_status, req.actor_id.as_deref())
        .await
        .map_err(ToggleError)?;
    Ok(Json(change))
}

#[utoipa::path(
    get,
    path = "/api/employees",
    params(
        ("filter" = Option<String>, Query, description = "all, fund, direct or active (default)")
    ),
    responses(
        (status = 200, description = "Employees matching the filter", body = Vec<Employee>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn list_employees(
    State(service): State<Arc<AppService>>,
    Query(query): Query<EmployeeQuery>,
) -> Result<Json<Vec<Employee>>, ApiError> {
    let employees = service.list_employees(query.filter.unwrap_or_default()).await?;
    Ok(Json(employees))
}

#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = CreateEmployeeRequest,
    responses(
        (status = 201, description = "Employee added", body = Employee),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn add_employee(
    State(service): State<Arc<AppService>>,
    Json(req): Json<CreateEmployeeRequest>,
) -> Result<(StatusCode, Json<Employee>), ApiError> {
    let employee = Employee {
        id: req.id.unwrap_or_default(),
        name: req.name,
        department: req.department,
        participates_in_fund: req.participates_in_fund,
        status: EmployeeStatus::Active,
        join_date: req.join_date.or_else(|| Some(Utc::now().date_naive())),
        leave_date: None,
        monthly_contribution: req
            .monthly_contribution
            .unwrap_or_else(|| service.default_contribution()),
    };
    let employee = service.add_employee(employee, req.actor_id.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(employee)))
}

#[utoipa::path(
    put,
    path = "/api/employees/{employee_id}",
    params(
        ("employee_id" = String, Path, description = "ID of the employee")
    ),
    request_body = UpdateEmployeeRequest,
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 404, description = "Employee not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn update_employee(
    State(service): State<Arc<AppService>>,
    Path(employee_id): Path<String>,
    Json(req): Json<UpdateEmployeeRequest>,
) -> Result<Json<Employee>, ApiError> {
    let employee = Employee {
        id: employee_id,
        name: req.name,
        department: req.department,
        participates_in_fund: req.participates_in_fund,
        status: req.status,
        join_date: req.join_date,
        leave_date: req.leave_date,
        monthly_contribution: req.monthly_contribution,
    };
    let employee = service.update_employee(employee, req.actor_id.as_deref()).await?;
    Ok(Json(employee))
}

#[utoipa::path(
    delete,
    path = "/api/employees/{employee_id}",
    params(
        ("employee_id" = String, Path, description = "ID of the employee"),
        ("actor_id" = Option<String>, Query, description = "Who performs the deletion")
    ),
    responses(
        (status = 204, description = "Employee deleted"),
        (status = 404, description = "Employee not found", body = ErrorResponse),
        (status = 409, description = "Employee has fund payments or bill sharings", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn delete_employee(
    State(service): State<Arc<AppService>>,
    Path(employee_id): Path<String>,
    Query(req): Query<ActorRequest>,
) -> Result<StatusCode, ApiError> {
    service.delete_employee(&employee_id, req.actor_id.as_deref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/contributions",
    responses(
        (status = 200, description = "Contribution standing of every employee", body = Vec<ContributionStatus>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn list_contributions(
    State(service): State<Arc<AppService>>,
) -> Result<Json<Vec<ContributionStatus>>, ApiError> {
    let statuses = service.contribution_statuses().await?;
    Ok(Json(statuses))
}

#[utoipa::path(
    get,
    path = "/api/expenses",
    responses(
        (status = 200, description = "Expenses, most recent first", body = Vec<Expense>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn list_expenses(State(service): State<Arc<AppService>>) -> Result<Json<Vec<Expense>>, ApiError> {
    let expenses = service.list_expenses().await?;
    Ok(Json(expenses))
}

#[utoipa::path(
    post,
    path = "/api/expenses",
    request_body = RecordExpenseRequest,
    responses(
        (status = 201, description = "Expense recorded", body = Expense),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn record_expense(
    State(service): State<Arc<AppService>>,
    Json(req): Json<RecordExpenseRequest>,
) -> Result<(StatusCode, Json<Expense>), ApiError> {
    let expense = Expense {
        id: String::new(),
        amount: req.amount,
        expense_date: req.expense_date.unwrap_or_else(|| Utc::now().date_naive()),
        description: req.description,
        category: req.category,
        notes: req.notes,
        amount_reimbursed: Decimal::ZERO,
        sharing_status: SharingStatus::NotShared,
    };
    let expense = service.record_expense(expense, req.actor_id.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

#[utoipa::path(
    put,
    path = "/api/expenses/{expense_id}",
    params(
        ("expense_id" = String, Path, description = "ID of the expense")
    ),
    request_body = UpdateExpenseRequest,
    responses(
        (status = 200, description = "Expense updated", body = Expense),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 404, description = "Expense not found", body = ErrorResponse),
        (status = 409, description = "Amount cannot change while the expense is shared", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn update_expense(
    State(service): State<Arc<AppService>>,
    Path(expense_id): Path<String>,
    Json(req): Json<UpdateExpenseRequest>,
) -> Result<Json<Expense>, ApiError> {
    let expense = Expense {
        id: expense_id,
        amount: req.amount,
        expense_date: req.expense_date,
        description: req.description,
        category: req.category,
        notes: req.notes,
        amount_reimbursed: Decimal::ZERO,
        sharing_status: SharingStatus::NotShared,
    };
    let expense = service.update_expense(expense, req.actor_id.as_deref()).await?;
    Ok(Json(expense))
}

#[utoipa::path(
    delete,
    path = "/api/expenses/{expense_id}",
    params(
        ("expense_id" = String, Path, description = "ID of the expense"),
        ("actor_id" = Option<String>, Query, description = "Who performs the deletion")
    ),
    responses(
        (status = 204, description = "Expense deleted"),
        (status = 404, description = "Expense not found", body = ErrorResponse),
        (status = 409, description = "Expense is part of a bill sharing", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn delete_expense(
    State(service): State<Arc<AppService>>,
    Path(expense_id): Path<String>,
    Query(req): Query<ActorRequest>,
) -> Result<StatusCode, ApiError> {
    service.delete_expense(&expense_id, req.actor_id.as_deref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/fund-payments",
    responses(
        (status = 200, description = "Fund payments, most recent first", body = Vec<FundPayment>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn list_fund_payments(State(service): State<Arc<AppService>>) -> Result<Json<Vec<FundPayment>>, ApiError> {
    let payments = service.list_fund_payments().await?;
    Ok(Json(payments))
}

#[utoipa::path(
    post,
    path = "/api/fund-payments",
    request_body = RecordFundPaymentRequest,
    responses(
        (status = 201, description = "Fund payment recorded", body = FundPayment),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 404, description = "Employee not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn record_fund_payment(
    State(service): State<Arc<AppService>>,
    Json(req): Json<RecordFundPaymentRequest>,
) -> Result<(StatusCode, Json<FundPayment>), ApiError> {
    let payment = FundPayment {
        id: String::new(),
        employee_id: req.employee_id,
        amount: req.amount,
        payment_date: req.payment_date.unwrap_or_else(|| Utc::now().date_naive()),
        months_covered: req.months_covered,
        payment_method: req.payment_method,
        notes: req.notes,
    };
    let payment = service.record_fund_payment(payment, req.actor_id.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

#[utoipa::path(
    get,
    path = "/api/summary",
    responses(
        (status = 200, description = "Fund balance and spending totals", body = FundSummary),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn get_fund_summary(State(service): State<Arc<AppService>>) -> Result<Json<FundSummary>, ApiError> {
    let summary = service.fund_summary().await?;
    Ok(Json(summary))
}

#[utoipa::path(
    get,
    path = "/api/logs",
    responses(
        (status = 200, description = "Audit log entries", body = Vec<AppLog>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn get_app_logs(State(service): State<Arc<AppService>>) -> Result<Json<Vec<AppLog>>, ApiError> {
    let logs = service.get_app_logs().await?;
    Ok(Json(logs))
}
