use axum::{Json, http::StatusCode, response::IntoResponse};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core::allocation::Breakdown;
use crate::core::errors::FundError;
use crate::core::models::{EmployeeStatus, ExpenseCategory, FundPaymentMethod, Money, PaymentStatus};
use crate::core::roster::ParticipantFilter;
use crate::core::services::StatusRollback;

// Request structs for JSON payloads
#[derive(Deserialize, ToSchema)]
pub struct PreviewBreakdownRequest {
    pub expense_ids: Vec<String>,
    pub participant_ids: Vec<String>,
    #[serde(default)]
    pub honoree_ids: Vec<String>,
}

/// `breakdown` is the preview the caller confirmed; it is rejected when the
/// selected expenses changed since.
#[derive(Deserialize, ToSchema)]
pub struct CreateBillSharingRequest {
    pub expense_ids: Vec<String>,
    pub breakdown: Breakdown,
    pub actor_id: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct TogglePaymentRequest {
    pub current_status: PaymentStatus,
    pub actor_id: Option<String>,
}

#[derive(Deserialize, ToSchema, Default)]
pub struct ActorRequest {
    pub actor_id: Option<String>,
}

#[derive(Deserialize, ToSchema, Default)]
pub struct EmployeeQuery {
    pub filter: Option<ParticipantFilter>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateEmployeeRequest {
    pub id: Option<String>,
    pub name: String,
    pub department: Option<String>,
    #[serde(default = "default_true")]
    pub participates_in_fund: bool,
    pub join_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>)]
    pub monthly_contribution: Option<Money>,
    pub actor_id: Option<String>,
}

/// Full replacement of an employee record.
#[derive(Deserialize, ToSchema)]
pub struct UpdateEmployeeRequest {
    pub name: String,
    pub department: Option<String>,
    pub participates_in_fund: bool,
    pub status: EmployeeStatus,
    pub join_date: Option<NaiveDate>,
    pub leave_date: Option<NaiveDate>,
    #[schema(value_type = String)]
    pub monthly_contribution: Money,
    pub actor_id: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct RecordExpenseRequest {
    #[schema(value_type = String)]
    pub amount: Money,
    pub expense_date: Option<NaiveDate>,
    pub description: String,
    #[serde(default)]
    pub category: ExpenseCategory,
    pub notes: Option<String>,
    pub actor_id: Option<String>,
}

/// Reimbursement state is not editable and stays as stored.
#[derive(Deserialize, ToSchema)]
pub struct UpdateExpenseRequest {
    #[schema(value_type = String)]
    pub amount: Money,
    pub expense_date: NaiveDate,
    pub description: String,
    #[serde(default)]
    pub category: ExpenseCategory,
    pub notes: Option<String>,
    pub actor_id: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct RecordFundPaymentRequest {
    pub employee_id: String,
    #[schema(value_type = String)]
    pub amount: Money,
    pub payment_date: Option<NaiveDate>,
    pub months_covered: Vec<String>,
    #[serde(default)]
    pub payment_method: FundPaymentMethod,
    pub notes: Option<String>,
    pub actor_id: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DeleteBillSharingResponse {
    pub bill_sharing_id: String,
    pub rolled_back: bool,
}

// Error response struct
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Body returned when a payment toggle could not be stored; the client puts
/// `previous_status` back on screen.
#[derive(Serialize, ToSchema)]
pub struct ToggleFailedResponse {
    pub error: String,
    pub participant_id: String,
    pub previous_status: PaymentStatus,
}

fn status_code(err: &FundError) -> StatusCode {
    match err {
        FundError::EmployeeNotFound(_)
        | FundError::ExpenseNotFound(_)
        | FundError::BillSharingNotFound(_)
        | FundError::ParticipantNotFound(_) => StatusCode::NOT_FOUND,
        FundError::SharingNotPending(_)
        | FundError::SharingNotFinalized(_)
        | FundError::EmployeeInUse(_)
        | FundError::ExpenseInUse(_) => StatusCode::CONFLICT,
        FundError::InvalidInput(..)
        | FundError::NegativeAmount
        | FundError::AmountOutOfRange
        | FundError::StaleDraft { .. }
        | FundError::HonoreeNotParticipant(_)
        | FundError::NoExpensesSelected => StatusCode::BAD_REQUEST,
        FundError::StorageError(_) | FundError::DatabaseError(_) | FundError::LoggingError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

// Newtype wrapper for FundError to implement IntoResponse
pub struct ApiError(pub FundError);

impl From<FundError> for ApiError {
    fn from(err: FundError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = status_code(&self.0);
        let error = match self.0 {
            FundError::InvalidInput(_, detail) => format!("{}: {}", detail.title, detail.description),
            other => other.to_string(),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

pub struct ToggleError(pub StatusRollback);

impl IntoResponse for ToggleError {
    fn into_response(self) -> axum::response::Response {
        let rollback = self.0;
        (
            status_code(&rollback.source),
            Json(ToggleFailedResponse {
                error: rollback.source.to_string(),
                participant_id: rollback.participant_id,
                previous_status: rollback.previous,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_error_class() {
        assert_eq!(status_code(&FundError::NoExpensesSelected), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_code(&FundError::BillSharingNotFound("bs".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_code(&FundError::SharingNotPending("bs".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_code(&FundError::ExpenseInUse("x1".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(status_code(&FundError::AmountOutOfRange), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_code(&FundError::DatabaseError("disk full".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
