use utoipa::OpenApi;

use crate::{
    api::models::{
        ActorRequest, CreateBillSharingRequest, CreateEmployeeRequest, DeleteBillSharingResponse, EmployeeQuery,
        ErrorResponse, PreviewBreakdownRequest, RecordExpenseRequest, RecordFundPaymentRequest, TogglePaymentRequest,
        ToggleFailedResponse, UpdateEmployeeRequest, UpdateExpenseRequest,
    },
    core::{
        allocation::{Breakdown, ParticipantShare},
        contribution::{ContributionState, ContributionStatus},
        models::{
            AppLog, BillSharing, BillSharingDetail, BillSharingExpense, BillSharingParticipant, Employee,
            EmployeeStatus, Expense, ExpenseCategory, FundPayment, FundPaymentMethod, PaymentMethod, PaymentStatus,
            SharingState, SharingStatus,
        },
        reconciliation::ReconciliationReport,
        roster::ParticipantFilter,
        services::{AutoFinalize, CreatedSharing, FinalizeOutcome, PaymentStatusChange, SharingHistoryEntry},
        summary::FundSummary,
    },
};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::handlers::preview_breakdown,
        super::handlers::create_bill_sharing,
        super::handlers::get_bill_sharing_history,
        super::handlers::get_bill_sharing,
        super::handlers::finalize_bill_sharing,
        super::handlers::delete_bill_sharing,
        super::handlers::toggle_payment_status,
        super::handlers::list_employees,
        super::handlers::add_employee,
        super::handlers::update_employee,
        super::handlers::delete_employee,
        super::handlers::list_contributions,
        super::handlers::list_expenses,
        super::handlers::record_expense,
        super::handlers::update_expense,
        super::handlers::delete_expense,
        super::handlers::list_fund_payments,
        super::handlers::record_fund_payment,
        super::handlers::get_fund_summary,
        super::handlers::get_app_logs
    ),
    components(schemas(
        PreviewBreakdownRequest,
        CreateBillSharingRequest,
        TogglePaymentRequest,
        ActorRequest,
        EmployeeQuery,
        CreateEmployeeRequest,
        UpdateEmployeeRequest,
        RecordExpenseRequest,
        UpdateExpenseRequest,
        RecordFundPaymentRequest,
        DeleteBillSharingResponse,
        ErrorResponse,
        ToggleFailedResponse,
        Breakdown,
        ParticipantShare,
        BillSharing,
        BillSharingDetail,
        BillSharingExpense,
        BillSharingParticipant,
        ReconciliationReport,
        SharingHistoryEntry,
        CreatedSharing,
        AutoFinalize,
        FinalizeOutcome,
        PaymentStatusChange,
        Employee,
        EmployeeStatus,
        ParticipantFilter,
        Expense,
        ExpenseCategory,
        SharingStatus,
        FundPayment,
        FundPaymentMethod,
        PaymentMethod,
        PaymentStatus,
        SharingState,
        FundSummary,
        ContributionStatus,
        ContributionState,
        AppLog
    )),
    info(
        title = "Fundbook API",
        description = "Company fund bookkeeping and bill sharing",
        version = "0.1.0"
    )
)]
pub struct ApiDoc;
