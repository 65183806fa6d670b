use crate::constants::OVERDUE_AFTER_DAYS;
use crate::core::errors::FundError;
use crate::core::models::money::{checked_total, round_money};
use crate::core::models::{Employee, EmployeeStatus, FundPayment, Money};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContributionState {
    Paid,
    Pending,
    /// No payment this month and the latest one is more than
    /// `OVERDUE_AFTER_DAYS` old.
    Overdue,
    Inactive,
}

/// One employee's standing with the monthly fund contribution.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ContributionStatus {
    pub employee_id: String,
    pub name: String,
    #[schema(value_type = String)]
    pub total_paid: Money,
    /// `total_paid` in units of the monthly contribution, rounded half-up.
    pub months_paid: u32,
    pub last_payment_date: Option<NaiveDate>,
    pub current_month_status: ContributionState,
}

impl ContributionStatus {
    /// Standing of `employee` on `today`. `payments` may hold everyone's
    /// payments; only the employee's own count.
    pub fn compute(employee: &Employee, payments: &[FundPayment], today: NaiveDate) -> Result<Self, FundError> {
        let own: Vec<&FundPayment> = payments.iter().filter(|p| p.employee_id == employee.id).collect();
        let total_paid = checked_total(own.iter().map(|p| p.amount))?;

        let months_paid = if employee.monthly_contribution > Decimal::ZERO {
            let months = total_paid
                .checked_div(employee.monthly_contribution)
                .ok_or(FundError::AmountOutOfRange)?;
            round_money(months, 0).to_u32().unwrap_or(u32::MAX)
        } else {
            0
        };

        let last_payment_date = own.iter().map(|p| p.payment_date).max();
        let month_key = today.format("%Y-%m").to_string();
        let paid_this_month = own.iter().any(|p| {
            (p.payment_date.year(), p.payment_date.month()) == (today.year(), today.month())
                || p.covers_month(&month_key)
        });

        let current_month_status = if employee.status == EmployeeStatus::Inactive {
            ContributionState::Inactive
        } else if paid_this_month {
            ContributionState::Paid
        } else {
            match last_payment_date {
                // recorded ahead of time
                Some(last) if last > today => ContributionState::Paid,
                Some(last) if (today - last).num_days() > OVERDUE_AFTER_DAYS => ContributionState::Overdue,
                _ => ContributionState::Pending,
            }
        };

        Ok(ContributionStatus {
            employee_id: employee.id.clone(),
            name: employee.name.clone(),
            total_paid,
            months_paid,
            last_payment_date,
            current_month_status,
        })
    }
}
