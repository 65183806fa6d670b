use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// Audit action names recorded through `LoggingService::log_action`.
pub const BILL_SHARING_CREATED: &str = "BILL_SHARING_CREATED";
pub const PAYMENT_STATUS_CHANGED: &str = "PAYMENT_STATUS_CHANGED";
pub const BILL_SHARING_FINALIZED: &str = "BILL_SHARING_FINALIZED";
pub const BILL_SHARING_DELETED: &str = "BILL_SHARING_DELETED";
pub const EXPENSE_RECORDED: &str = "EXPENSE_RECORDED";
pub const EMPLOYEE_ADDED: &str = "EMPLOYEE_ADDED";
pub const FUND_PAYMENT_RECORDED: &str = "FUND_PAYMENT_RECORDED";
pub const EMPLOYEE_UPDATED: &str = "EMPLOYEE_UPDATED";
pub const EMPLOYEE_DELETED: &str = "EMPLOYEE_DELETED";
pub const EXPENSE_UPDATED: &str = "EXPENSE_UPDATED";
pub const EXPENSE_DELETED: &str = "EXPENSE_DELETED";

pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 500;
/// Largest single amount accepted on input.
pub const MAX_AMOUNT: Decimal = dec!(1000000000000000);

/// Days without a payment after which an active member counts as overdue.
pub const OVERDUE_AFTER_DAYS: i64 = 45;
