//! Turns a transaction total and a requested count into installment values.

use rust_decimal::Decimal;

use crate::money::split_equally;

/// Produce the ordered installment values for a transaction total.
///
/// The values sum to `total` exactly. A count below one is treated as one.
pub(crate) fn plan_installments(total: Decimal, count: u32) -> Vec<Decimal> {
    split_equally(total, count.max(1))
}
