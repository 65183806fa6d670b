use super::money::Money;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    #[default]
    Events,
    Gifts,
    OfficeSupplies,
    Other,
}

impl ExpenseCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Events => "events",
            ExpenseCategory::Gifts => "gifts",
            ExpenseCategory::OfficeSupplies => "office_supplies",
            ExpenseCategory::Other => "other",
        }
    }
}

impl FromStr for ExpenseCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "events" => Ok(ExpenseCategory::Events),
            "gifts" => Ok(ExpenseCategory::Gifts),
            "office_supplies" => Ok(ExpenseCategory::OfficeSupplies),
            "other" => Ok(ExpenseCategory::Other),
            other => Err(format!("unknown expense category `{}`", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SharingStatus {
    #[default]
    NotShared,
    Shared,
    PartiallyReimbursed,
    FullyReimbursed,
}

impl SharingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SharingStatus::NotShared => "not_shared",
            SharingStatus::Shared => "shared",
            SharingStatus::PartiallyReimbursed => "partially_reimbursed",
            SharingStatus::FullyReimbursed => "fully_reimbursed",
        }
    }
}

impl FromStr for SharingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_shared" => Ok(SharingStatus::NotShared),
            "shared" => Ok(SharingStatus::Shared),
            "partially_reimbursed" => Ok(SharingStatus::PartiallyReimbursed),
            "fully_reimbursed" => Ok(SharingStatus::FullyReimbursed),
            other => Err(format!("unknown sharing status `{}`", other)),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Expense {
    pub id: String,
    #[schema(value_type = String)]
    pub amount: Money,
    pub expense_date: NaiveDate,
    pub description: String,
    pub category: ExpenseCategory,
    pub notes: Option<String>,
    /// Running total credited back by finalized bill sharings.
    #[schema(value_type = String)]
    pub amount_reimbursed: Money,
    pub sharing_status: SharingStatus,
}

impl Expense {
    pub fn net_amount(&self) -> Money {
        (self.amount - self.amount_reimbursed).max(Decimal::ZERO)
    }

    /// Re-derives `sharing_status` from the reimbursed total. `linked` tells whether
    /// a bill sharing still references the expense.
    pub fn refresh_sharing_status(&mut self, linked: bool) {
        self.sharing_status = if self.amount_reimbursed <= Decimal::ZERO {
            if linked {
                SharingStatus::Shared
            } else {
                SharingStatus::NotShared
            }
        } else if self.amount_reimbursed < self.amount {
            SharingStatus::PartiallyReimbursed
        } else {
            SharingStatus::FullyReimbursed
        };
    }

    /// Applies a reimbursement delta (negative on rollback).
    pub fn apply_reimbursement(&mut self, delta: Money, linked: bool) {
        self.amount_reimbursed += delta;
        if self.amount_reimbursed < Decimal::ZERO {
            self.amount_reimbursed = Decimal::ZERO;
        }
        self.refresh_sharing_status(linked);
    }
}
