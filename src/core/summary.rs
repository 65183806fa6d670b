use crate::core::models::{Employee, Expense, ExpenseCategory, FundPayment, Money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Dashboard totals of the fund.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct FundSummary {
    #[schema(value_type = String)]
    pub total_collected: Money,
    /// Expenses net of bill-sharing reimbursements.
    #[schema(value_type = String)]
    pub total_spent_net: Money,
    #[schema(value_type = String)]
    pub current_balance: Money,
    #[schema(value_type = Object)]
    pub spent_by_category: BTreeMap<ExpenseCategory, Money>,
    pub active_employees: usize,
    #[schema(value_type = String)]
    pub expected_monthly: Money,
}

impl FundSummary {
    pub fn compute(employees: &[Employee], expenses: &[Expense], payments: &[FundPayment]) -> Self {
        let total_collected: Money = payments.iter().map(|p| p.amount).sum();

        let mut spent_by_category = BTreeMap::new();
        let mut total_spent_net = Decimal::ZERO;
        for expense in expenses {
            let net = expense.net_amount();
            total_spent_net += net;
            *spent_by_category.entry(expense.category).or_insert(Decimal::ZERO) += net;
        }

        let active: Vec<&Employee> = employees.iter().filter(|e| e.is_active_member()).collect();

        FundSummary {
            total_collected,
            total_spent_net,
            current_balance: total_collected - total_spent_net,
            spent_by_category,
            active_employees: active.len(),
            expected_monthly: active.iter().map(|e| e.monthly_contribution).sum(),
        }
    }
}
