//! Cost-splitting rules for bill sharing.
//!
//! With `N` participants of whom `B` are honorees (e.g. the birthday people):
//!
//! * nothing to split (`total == 0` or `N == 0`): everybody owes zero;
//! * a single participant owes the whole bill, or nothing when honoured;
//! * `B == 0` or `B == N`: even split, `total / N`;
//! * otherwise every non-honoree owes `share = total / (N - B)` and every
//!   honoree owes the discounted `share * (B - 1) / B`, which is zero for a
//!   single honoree.
//!
//! Amounts are computed on the exact decimal quotient and rounded once per
//! participant, half-up to the currency's minor unit. The rounded shares may
//! therefore miss the total by up to one minor unit per participant.

use crate::core::errors::FundError;
use crate::core::models::money::{checked_total, round_money};
use crate::core::models::{Money, PaymentMethod};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ParticipantShare {
    pub employee_id: String,
    #[schema(value_type = String)]
    pub amount_owed: Money,
    pub payment_method: PaymentMethod,
    pub is_honoree: bool,
}

impl ParticipantShare {
    /// Direct payers with something to pay become tracked participant rows.
    pub fn needs_collection(&self) -> bool {
        self.payment_method == PaymentMethod::Direct && self.amount_owed > Decimal::ZERO
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Breakdown {
    #[schema(value_type = String)]
    pub total_amount: Money,
    #[schema(value_type = String)]
    pub amount_per_person: Money,
    #[schema(value_type = String)]
    pub fund_total: Money,
    #[schema(value_type = String)]
    pub direct_total: Money,
    pub shares: BTreeMap<String, ParticipantShare>,
}

impl Breakdown {
    pub fn share_of(&self, employee_id: &str) -> Option<&ParticipantShare> {
        self.shares.get(employee_id)
    }

    pub fn direct_payers(&self) -> impl Iterator<Item = &ParticipantShare> {
        self.shares.values().filter(|s| s.needs_collection())
    }

    pub fn owed_sum(&self) -> Result<Money, FundError> {
        checked_total(self.shares.values().map(|s| s.amount_owed))
    }

    pub fn honoree_ids(&self) -> BTreeSet<String> {
        self.shares
            .values()
            .filter(|s| s.is_honoree)
            .map(|s| s.employee_id.clone())
            .collect()
    }
}

fn divide(amount: Money, parts: usize) -> Result<Money, FundError> {
    amount
        .checked_div(Decimal::from(parts as u64))
        .ok_or(FundError::AmountOutOfRange)
}

/// Splits `total_amount` across `participant_ids`.
///
/// `participates_in_fund` decides per employee whether the share is drawn from
/// the fund or collected directly. `scale` is the number of minor-unit decimal
/// places of the currency (0 for VND).
pub fn compute_breakdown<F>(
    total_amount: Money,
    participant_ids: &BTreeSet<String>,
    honoree_ids: &BTreeSet<String>,
    participates_in_fund: F,
    scale: u32,
) -> Result<Breakdown, FundError>
where
    F: Fn(&str) -> bool,
{
    if total_amount < Decimal::ZERO {
        return Err(FundError::NegativeAmount);
    }
    if let Some(stray) = honoree_ids.iter().find(|id| !participant_ids.contains(*id)) {
        return Err(FundError::HonoreeNotParticipant(stray.clone()));
    }

    let n = participant_ids.len();
    let b = honoree_ids.len();

    let (payer_share, honoree_share) = if total_amount.is_zero() || n == 0 {
        (Decimal::ZERO, Decimal::ZERO)
    } else if n == 1 {
        (total_amount, Decimal::ZERO)
    } else if b == 0 || b == n {
        let even = divide(total_amount, n)?;
        (even, even)
    } else {
        let share = divide(total_amount, n - b)?;
        let discounted = share
            .checked_mul(Decimal::from((b - 1) as u64))
            .ok_or(FundError::AmountOutOfRange)?;
        (share, divide(discounted, b)?)
    };

    let amount_per_person = if n == 1 && b == 1 {
        Decimal::ZERO
    } else {
        round_money(payer_share, scale)
    };

    let mut shares = BTreeMap::new();
    let mut fund_total = Decimal::ZERO;
    let mut direct_total = Decimal::ZERO;

    for employee_id in participant_ids {
        let is_honoree = honoree_ids.contains(employee_id);
        let amount_owed = round_money(if is_honoree { honoree_share } else { payer_share }, scale);
        let payment_method = if participates_in_fund(employee_id) {
            fund_total = fund_total.checked_add(amount_owed).ok_or(FundError::AmountOutOfRange)?;
            PaymentMethod::Fund
        } else {
            direct_total = direct_total.checked_add(amount_owed).ok_or(FundError::AmountOutOfRange)?;
            PaymentMethod::Direct
        };
        shares.insert(
            employee_id.clone(),
            ParticipantShare {
                employee_id: employee_id.clone(),
                amount_owed,
                payment_method,
                is_honoree,
            },
        );
    }

    debug!(
        "Computed breakdown: total={} participants={} honorees={} fund={} direct={}",
        total_amount, n, b, fund_total, direct_total
    );

    Ok(Breakdown {
        total_amount,
        amount_per_person,
        fund_total,
        direct_total,
        shares,
    })
}
