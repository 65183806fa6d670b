use crate::core::models::{BillSharingDetail, Money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Collection progress of one bill sharing, derived from its stored rows.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub bill_sharing_id: String,
    #[schema(value_type = String)]
    pub total_amount: Money,
    #[schema(value_type = String)]
    pub direct_total_owed: Money,
    #[schema(value_type = String)]
    pub direct_collected: Money,
    #[schema(value_type = String)]
    pub fund_covered: Money,
    #[schema(value_type = String)]
    pub direct_outstanding: Money,
    #[schema(value_type = String)]
    pub collection_progress_percent: Decimal,
    pub paid_count: usize,
    pub pending_count: usize,
}

impl ReconciliationReport {
    pub fn from_detail(detail: &BillSharingDetail) -> Self {
        let direct_total_owed: Money = detail.participants.iter().map(|p| p.amount_owed).sum();
        let direct_collected: Money = detail
            .participants
            .iter()
            .filter(|p| p.is_paid())
            .map(|p| p.amount_owed)
            .sum();
        let paid_count = detail.participants.iter().filter(|p| p.is_paid()).count();

        let total_amount = detail.sharing.total_amount;
        let fund_covered = (total_amount - direct_total_owed).max(Decimal::ZERO);
        let direct_outstanding = (direct_total_owed - direct_collected).max(Decimal::ZERO);

        // Nothing to collect means fully collected.
        let collection_progress_percent = if direct_total_owed.is_zero() {
            Decimal::ONE_HUNDRED
        } else {
            (direct_collected / direct_total_owed * Decimal::ONE_HUNDRED).round_dp(2)
        };

        ReconciliationReport {
            bill_sharing_id: detail.sharing.id.clone(),
            total_amount,
            direct_total_owed,
            direct_collected,
            fund_covered,
            direct_outstanding,
            collection_progress_percent,
            paid_count,
            pending_count: detail.participants.len() - paid_count,
        }
    }

    /// The auto-finalize predicate.
    pub fn is_fully_collected(&self) -> bool {
        self.direct_outstanding.is_zero()
    }
}
