use super::{date, employee};
use crate::core::contribution::{ContributionState, ContributionStatus};
use crate::core::models::{EmployeeStatus, FundPayment, FundPaymentMethod};
use chrono::NaiveDate;
use rust_decimal_macros::dec;

fn paid(employee_id: &str, on: NaiveDate, months: &[&str]) -> FundPayment {
    FundPayment {
        id: format!("fp-{}-{}", employee_id, on),
        employee_id: employee_id.to_string(),
        amount: dec!(100000),
        payment_date: on,
        months_covered: months.iter().map(|m| m.to_string()).collect(),
        payment_method: FundPaymentMethod::BankTransfer,
        notes: None,
    }
}

#[test]
fn test_payment_this_month_counts_as_paid() {
    let today = date(2025, 6, 18);
    let payments = vec![
        paid("e1", date(2025, 5, 2), &["2025-05"]),
        paid("e1", date(2025, 6, 3), &["2025-06"]),
        paid("e2", date(2025, 6, 3), &["2025-06"]),
    ];

    let status = ContributionStatus::compute(&employee("e1", "An", true), &payments, today).unwrap();
    assert_eq!(status.current_month_status, ContributionState::Paid);
    assert_eq!(status.total_paid, dec!(200000));
    assert_eq!(status.months_paid, 2);
    assert_eq!(status.last_payment_date, Some(date(2025, 6, 3)));
}

#[test]
fn test_prepaid_month_counts_as_paid() {
    let today = date(2025, 7, 10);
    let payments = vec![paid("e1", date(2025, 6, 28), &["2025-06", "2025-07"])];

    let status = ContributionStatus::compute(&employee("e1", "An", true), &payments, today).unwrap();
    assert_eq!(status.current_month_status, ContributionState::Paid);
}

#[test]
fn test_pending_until_overdue_after_45_days() {
    let payments = vec![paid("e1", date(2025, 4, 30), &["2025-04"])];
    let an = employee("e1", "An", true);

    let pending = ContributionStatus::compute(&an, &payments, date(2025, 6, 14)).unwrap();
    assert_eq!(pending.current_month_status, ContributionState::Pending);

    let overdue = ContributionStatus::compute(&an, &payments, date(2025, 6, 15)).unwrap();
    assert_eq!(overdue.current_month_status, ContributionState::Overdue);
}

#[test]
fn test_no_payments_is_pending() {
    let status = ContributionStatus::compute(&employee("e1", "An", true), &[], date(2025, 6, 1)).unwrap();
    assert_eq!(status.current_month_status, ContributionState::Pending);
    assert_eq!(status.total_paid, dec!(0));
    assert_eq!(status.months_paid, 0);
    assert!(status.last_payment_date.is_none());
}

#[test]
fn test_inactive_employee_overrides_payments() {
    let mut gone = employee("e1", "An", true);
    gone.status = EmployeeStatus::Inactive;
    let payments = vec![paid("e1", date(2025, 6, 1), &["2025-06"])];

    let status = ContributionStatus::compute(&gone, &payments, date(2025, 6, 2)).unwrap();
    assert_eq!(status.current_month_status, ContributionState::Inactive);
    assert_eq!(status.total_paid, dec!(100000));
}

#[test]
fn test_months_paid_rounds_half_up() {
    let mut part_time = employee("e1", "An", true);
    part_time.monthly_contribution = dec!(40000);
    let payments = vec![paid("e1", date(2025, 1, 5), &["2025-01"])];

    // 100000 / 40000 = 2.5
    let status = ContributionStatus::compute(&part_time, &payments, date(2025, 1, 20)).unwrap();
    assert_eq!(status.months_paid, 3);

    part_time.monthly_contribution = dec!(0);
    let status = ContributionStatus::compute(&part_time, &payments, date(2025, 1, 20)).unwrap();
    assert_eq!(status.months_paid, 0);
}
