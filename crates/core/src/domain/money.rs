//! Checked `Decimal` arithmetic for amounts derived from caller input.

use rust_decimal::Decimal;

use crate::errors::DomainError;

pub fn mul(left: Decimal, right: Decimal, context: &str) -> Result<Decimal, DomainError> {
    left.checked_mul(right).ok_or_else(|| overflow(context))
}

pub fn add(left: Decimal, right: Decimal, context: &str) -> Result<Decimal, DomainError> {
    left.checked_add(right).ok_or_else(|| overflow(context))
}

pub fn sum<I>(amounts: I, context: &str) -> Result<Decimal, DomainError>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts.into_iter().try_fold(Decimal::ZERO, |total, amount| add(total, amount, context))
}

fn overflow(context: &str) -> DomainError {
    DomainError::AmountOverflow(context.to_string())
}
