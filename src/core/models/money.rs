use crate::core::errors::FundError;
use rust_decimal::{Decimal, RoundingStrategy};

/// Monetary amount in the fund's currency.
pub type Money = Decimal;

/// Rounds half-up (midpoint away from zero) to `scale` minor-unit places.
pub fn round_money(amount: Money, scale: u32) -> Money {
    amount.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
}

/// Sums amounts, failing instead of overflowing.
pub fn checked_total<I>(amounts: I) -> Result<Money, FundError>
where
    I: IntoIterator<Item = Money>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))
        .ok_or(FundError::AmountOutOfRange)
}
