//! # Exchange Accounting
//!
//! The settled asset pool and share-price conversions. Leaf component: every
//! other component prices through here, always with an explicit [`Rounding`].
//!
//! ```text
//! total_assets = tracked - pending - claimable redeem reserve
//! price        = total_assets / total_supply      (1:1 if either is zero)
//! ```

use crate::domain::invariants::InvariantViolation;
use crate::domain::services::{mul_div, sub};
use crate::domain::storage::VaultStorage;
use crate::domain::value_objects::{Rounding, U256};

impl VaultStorage {
    /// Settled, unreserved assets backing the share supply.
    pub fn total_assets(&self) -> Result<U256, InvariantViolation> {
        let global = &self.global;
        let settled = sub(global.tracked_assets, global.pending_assets, "settled assets")?;
        sub(
            settled,
            global.total_claimable_redeem_assets,
            "unreserved assets",
        )
    }

    /// Shares worth `assets` at the live ratio.
    pub fn assets_to_shares(
        &self,
        assets: U256,
        rounding: Rounding,
    ) -> Result<U256, InvariantViolation> {
        let supply = self.shares.total_supply();
        let total = self.total_assets()?;
        if supply.is_zero() || total.is_zero() {
            return Ok(assets);
        }
        mul_div(assets, supply, total, rounding)
    }

    /// Assets worth `shares` at the live ratio.
    pub fn shares_to_assets(
        &self,
        shares: U256,
        rounding: Rounding,
    ) -> Result<U256, InvariantViolation> {
        let supply = self.shares.total_supply();
        let total = self.total_assets()?;
        if supply.is_zero() || total.is_zero() {
            return Ok(shares);
        }
        mul_div(shares, total, supply, rounding)
    }
}
