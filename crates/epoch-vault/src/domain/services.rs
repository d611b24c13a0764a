//! # Domain Services
//!
//! Pure arithmetic used by every accounting component. All intermediate
//! products are computed in 512 bits so `a * b / d` never overflows before the
//! division.

use crate::domain::invariants::InvariantViolation;
use crate::domain::value_objects::{Rounding, BPS_DENOMINATOR, U256};
use primitive_types::U512;

/// Computes `a * b / denominator` with the requested rounding.
///
/// # Errors
///
/// `ArithmeticOverflow` if `denominator` is zero or the result does not fit
/// in 256 bits.
pub fn mul_div(
    a: U256,
    b: U256,
    denominator: U256,
    rounding: Rounding,
) -> Result<U256, InvariantViolation> {
    if denominator.is_zero() {
        return Err(InvariantViolation::ArithmeticOverflow("division by zero"));
    }
    let product: U512 = a.full_mul(b);
    let (quotient, remainder) = product.div_mod(U512::from(denominator));
    let quotient = if rounding == Rounding::Ceil && !remainder.is_zero() {
        quotient + U512::one()
    } else {
        quotient
    };
    U256::try_from(quotient).map_err(|_| InvariantViolation::ArithmeticOverflow("mul_div"))
}

/// `floor(value * bps / 10_000)`.
///
/// # Errors
///
/// `ArithmeticOverflow` on a result wider than 256 bits.
pub fn bps_mul_floor(value: U256, bps: u64) -> Result<U256, InvariantViolation> {
    mul_div(
        value,
        U256::from(bps),
        U256::from(BPS_DENOMINATOR),
        Rounding::Floor,
    )
}

/// Checked addition mapped onto the invariant channel.
pub(crate) fn add(a: U256, b: U256, what: &'static str) -> Result<U256, InvariantViolation> {
    a.checked_add(b)
        .ok_or(InvariantViolation::ArithmeticOverflow(what))
}

/// Checked subtraction mapped onto the invariant channel.
pub(crate) fn sub(a: U256, b: U256, what: &'static str) -> Result<U256, InvariantViolation> {
    a.checked_sub(b)
        .ok_or(InvariantViolation::ArithmeticOverflow(what))
}
