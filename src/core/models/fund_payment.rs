use super::money::Money;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FundPaymentMethod {
    #[default]
    Cash,
    BankTransfer,
    Other,
}

impl FundPaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FundPaymentMethod::Cash => "cash",
            FundPaymentMethod::BankTransfer => "bank_transfer",
            FundPaymentMethod::Other => "other",
        }
    }
}

impl FromStr for FundPaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(FundPaymentMethod::Cash),
            "bank_transfer" => Ok(FundPaymentMethod::BankTransfer),
            "other" => Ok(FundPaymentMethod::Other),
            other => Err(format!("unknown payment method `{}`", other)),
        }
    }
}

/// Monthly dues paid into the fund.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct FundPayment {
    pub id: String,
    pub employee_id: String,
    #[schema(value_type = String)]
    pub amount: Money,
    pub payment_date: NaiveDate,
    /// `YYYY-MM` keys, sorted.
    pub months_covered: Vec<String>,
    pub payment_method: FundPaymentMethod,
    pub notes: Option<String>,
}

impl FundPayment {
    pub fn covers_month(&self, month_key: &str) -> bool {
        self.months_covered.iter().any(|m| m == month_key)
    }
}
