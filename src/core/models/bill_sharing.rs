use super::money::Money;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

/// Persisted lifecycle of a bill sharing. Drafts live on the client only and a
/// deleted sharing has no row left, so neither is represented here.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SharingState {
    Pending,
    Finalized,
}

impl SharingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SharingState::Pending => "pending",
            SharingState::Finalized => "finalized",
        }
    }
}

impl std::fmt::Display for SharingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SharingState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SharingState::Pending),
            "finalized" => Ok(SharingState::Finalized),
            other => Err(format!("unknown sharing state `{}`", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Fund,
    Direct,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Fund => "fund",
            PaymentMethod::Direct => "direct",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fund" => Ok(PaymentMethod::Fund),
            "direct" => Ok(PaymentMethod::Direct),
            other => Err(format!("unknown payment method `{}`", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            PaymentStatus::Pending => PaymentStatus::Paid,
            PaymentStatus::Paid => PaymentStatus::Pending,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            other => Err(format!("unknown payment status `{}`", other)),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct BillSharing {
    pub id: String,
    /// Sum of the linked expense snapshots at creation time. Never recomputed.
    #[schema(value_type = String)]
    pub total_amount: Money,
    pub sharing_date: NaiveDate,
    pub status: SharingState,
    pub created_at: DateTime<Utc>,
}

/// Link between a sharing and one expense, with the expense amount frozen at link time.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct BillSharingExpense {
    pub id: String,
    pub bill_sharing_id: String,
    pub expense_id: String,
    #[schema(value_type = String)]
    pub amount: Money,
}

/// A direct payer of a sharing. Fund-covered participants are never stored.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct BillSharingParticipant {
    pub id: String,
    pub bill_sharing_id: String,
    pub employee_id: String,
    #[schema(value_type = String)]
    pub amount_owed: Money,
    pub is_birthday_person: bool,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub payment_date: Option<DateTime<Utc>>,
}

impl BillSharingParticipant {
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct BillSharingDetail {
    pub sharing: BillSharing,
    pub participants: Vec<BillSharingParticipant>,
    pub expenses: Vec<BillSharingExpense>,
}

impl BillSharingDetail {
    pub fn is_finalized(&self) -> bool {
        self.sharing.status == SharingState::Finalized
    }
}
