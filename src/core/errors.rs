use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub title: String,
    pub description: String,
}

impl FieldError {
    pub fn new(field: &str, title: impl Into<String>, description: impl Into<String>) -> Self {
        FieldError {
            field: field.to_string(),
            title: title.into(),
            description: description.into(),
        }
    }
}

#[derive(Error, Debug, Clone, Serialize, PartialEq, Eq)]
pub enum FundError {
    /// Generic input validation error with detailed field information
    #[error("Invalid input for field `{0}`: {1:?}")]
    InvalidInput(String, FieldError),

    #[error("Amount must not be negative")]
    NegativeAmount,

    /// Arithmetic on the given amounts would leave the decimal range
    #[error("Amount is out of the supported range")]
    AmountOutOfRange,

    /// Honorees must be chosen among the selected participants
    #[error("Honoree {0} is not a selected participant")]
    HonoreeNotParticipant(String),

    #[error("No expenses selected")]
    NoExpensesSelected,

    /// The breakdown was computed against expense amounts that have since changed
    #[error("Draft total {expected} does not match selected expenses total {actual}")]
    StaleDraft { expected: Decimal, actual: Decimal },

    #[error("Employee {0} not found")]
    EmployeeNotFound(String),

    #[error("Expense {0} not found")]
    ExpenseNotFound(String),

    #[error("Bill sharing {0} not found")]
    BillSharingNotFound(String),

    #[error("Participant {0} not found")]
    ParticipantNotFound(String),

    /// Raised by the pending-only cascade delete when the sharing got finalized meanwhile
    #[error("Bill sharing {0} is not pending")]
    SharingNotPending(String),

    #[error("Bill sharing {0} is not finalized")]
    SharingNotFinalized(String),

    /// Fund payments or bill sharings still reference the employee
    #[error("Employee {0} has fund payments or bill sharings and cannot be deleted")]
    EmployeeInUse(String),

    /// A bill sharing links the expense, so its amount and existence are frozen
    #[error("Expense {0} is part of a bill sharing")]
    ExpenseInUse(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Logging error: {0}")]
    LoggingError(String),
}

impl FundError {
    /// Input problems detected before anything is written.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            FundError::InvalidInput(..)
                | FundError::NegativeAmount
                | FundError::AmountOutOfRange
                | FundError::HonoreeNotParticipant(_)
                | FundError::NoExpensesSelected
                | FundError::StaleDraft { .. }
                | FundError::EmployeeNotFound(_)
                | FundError::ExpenseNotFound(_)
        )
    }

    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            FundError::StorageError(_) | FundError::DatabaseError(_) | FundError::LoggingError(_)
        )
    }
}

impl From<rusqlite::Error> for FundError {
    fn from(err: rusqlite::Error) -> Self {
        FundError::DatabaseError(err.to_string())
    }
}
