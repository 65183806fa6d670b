use super::money::Money;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
    #[default]
    Active,
    Inactive,
}

impl EmployeeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmployeeStatus::Active => "active",
            EmployeeStatus::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for EmployeeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EmployeeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(EmployeeStatus::Active),
            "inactive" => Ok(EmployeeStatus::Inactive),
            other => Err(format!("unknown employee status `{}`", other)),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub department: Option<String>,
    /// `true` when the employee pays monthly dues into the fund, `false` when
    /// their share of a shared bill is collected from them directly.
    pub participates_in_fund: bool,
    pub status: EmployeeStatus,
    pub join_date: Option<NaiveDate>,
    pub leave_date: Option<NaiveDate>,
    #[schema(value_type = String)]
    pub monthly_contribution: Money,
}

impl Employee {
    /// Active and not on their way out: the default bill-sharing roster.
    pub fn is_active_member(&self) -> bool {
        self.status == EmployeeStatus::Active && self.leave_date.is_none()
    }
}
