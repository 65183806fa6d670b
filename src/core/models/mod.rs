pub mod audit;
pub mod bill_sharing;
pub mod employee;
pub mod expense;
pub mod fund_payment;
pub mod money;

pub use audit::AppLog;
pub use bill_sharing::{
    BillSharing, BillSharingDetail, BillSharingExpense, BillSharingParticipant, PaymentMethod, PaymentStatus,
    SharingState,
};
pub use employee::{Employee, EmployeeStatus};
pub use expense::{Expense, ExpenseCategory, SharingStatus};
pub use fund_payment::{FundPayment, FundPaymentMethod};
pub use money::Money;
