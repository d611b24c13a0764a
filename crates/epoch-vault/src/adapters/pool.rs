//! Wrapped pool with a fixed conversion rate.

use crate::domain::services::mul_div;
use crate::domain::value_objects::{Rounding, U256};
use crate::errors::PoolError;
use crate::ports::outbound::WrappedPool;

/// Converts pool shares at `numerator / denominator`, rounding down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedRatePool {
    numerator: U256,
    denominator: U256,
}

impl FixedRatePool {
    /// One pool share per underlying asset.
    #[must_use]
    pub fn one_to_one() -> Self {
        Self::new(U256::one(), U256::one())
    }

    /// `numerator` assets per `denominator` shares. A zero denominator yields
    /// a pool whose conversion query always fails.
    #[must_use]
    pub fn new(numerator: U256, denominator: U256) -> Self {
        Self {
            numerator,
            denominator,
        }
    }
}

impl Default for FixedRatePool {
    fn default() -> Self {
        Self::one_to_one()
    }
}

impl WrappedPool for FixedRatePool {
    fn convert_to_assets(&self, shares: U256) -> Result<U256, PoolError> {
        if self.denominator.is_zero() {
            return Err(PoolError::ConversionUnavailable);
        }
        mul_div(shares, self.numerator, self.denominator, Rounding::Floor)
            .map_err(|_| PoolError::Overflow)
    }
}
