//! Monetary amount splitting with an exact-sum guarantee.
//!
//! All money in this crate is [Decimal] at two decimal places. Splitting a
//! total into parts truncates every part except the last, which absorbs the
//! rounding remainder so the parts always sum back to the total cent-exact.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round a monetary value to two decimal places, half away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Split `total` into `count` parts that sum back to `total` exactly.
///
/// Every part except the last is `total / count` truncated to two decimal
/// places; the last part is `total` minus the sum of the others, so it absorbs
/// the rounding remainder. A `count` of zero is treated as one.
///
/// `total` is expected to be a positive amount at two decimal places; the
/// request boundary normalizes values before they reach this function.
pub fn split_equally(total: Decimal, count: u32) -> Vec<Decimal> {
    if count <= 1 {
        return vec![total];
    }

    let base = (total / Decimal::from(count)).round_dp_with_strategy(2, RoundingStrategy::ToZero);
    let mut parts = vec![base; count as usize];

    let all_but_last = base * Decimal::from(count - 1);
    parts[count as usize - 1] = total - all_but_last;

    parts
}

/// Apply `ratio` to `value` and round the result to two decimal places.
///
/// Used to prorate a requested allocation across installments by each
/// installment's share of the transaction total. Scaled parts are rounded
/// independently, so they do not carry the exact-sum guarantee of
/// [split_equally]; the few cents of drift this can leave are accepted.
pub fn scale(value: Decimal, ratio: Decimal) -> Decimal {
    round_money(value * ratio)
}
