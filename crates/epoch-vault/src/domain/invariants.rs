//! # Domain Invariants
//!
//! Solvency invariants that MUST hold after every committed operation, and the
//! fatal violations the engine raises when an operation would break one.
//!
//! | Check | Statement |
//! |-------|-----------|
//! | `check_supply_covers_assets` | `total_supply >= total_assets()` |
//! | `check_reserve_coverage` | `tracked - pending >= claimable redeem assets` |
//! | `check_reserve_counters` | global redeem counters equal per-account sums |
//! | `check_share_supply` | sum of share balances equals total supply |
//! | `check_claimable_deposit_views` | claimable deposit asset views `<= total_assets()` |
//! | `check_asset_backing` | observed token balance `>= tracked_assets` |

use crate::domain::services::add;
use crate::domain::storage::VaultStorage;
use crate::domain::value_objects::{Epoch, RequestId, Rounding, U256};

// =============================================================================
// INVARIANT CHECKS
// =============================================================================

/// Unit price never exceeds one asset per share.
pub fn check_supply_covers_assets(storage: &VaultStorage) -> Result<(), InvariantViolation> {
    let supply = storage.shares.total_supply();
    let assets = storage.total_assets()?;
    if supply >= assets {
        Ok(())
    } else {
        Err(InvariantViolation::SupplyBelowAssets { supply, assets })
    }
}

/// Settled assets always cover reserved redemptions.
pub fn check_reserve_coverage(storage: &VaultStorage) -> Result<(), InvariantViolation> {
    let global = &storage.global;
    let settled = global
        .tracked_assets
        .checked_sub(global.pending_assets)
        .unwrap_or_default();
    if settled >= global.total_claimable_redeem_assets {
        Ok(())
    } else {
        Err(InvariantViolation::ReserveUncovered {
            settled,
            reserved: global.total_claimable_redeem_assets,
        })
    }
}

/// Global reserve counters equal the per-controller sums.
pub fn check_reserve_counters(storage: &VaultStorage) -> Result<(), InvariantViolation> {
    let (mut shares, mut assets) = (U256::zero(), U256::zero());
    for account in storage.redeem_accounts.values() {
        shares = add(shares, account.claimable_shares, "reserve sum")?;
        assets = add(assets, account.claimable_assets, "reserve sum")?;
    }
    let global = &storage.global;
    if shares == global.total_claimable_redeem_shares
        && assets == global.total_claimable_redeem_assets
    {
        Ok(())
    } else {
        Err(InvariantViolation::ReserveCounterDrift)
    }
}

/// Share balances sum to the total supply.
pub fn check_share_supply(storage: &VaultStorage) -> Result<(), InvariantViolation> {
    let sum = storage.shares.sum_of_balances()?;
    let supply = storage.shares.total_supply();
    if sum == supply {
        Ok(())
    } else {
        Err(InvariantViolation::ShareSupplyDrift { supply, sum })
    }
}

/// Sum of claimable deposit asset views stays within `total_assets()`.
pub fn check_claimable_deposit_views(storage: &VaultStorage) -> Result<(), InvariantViolation> {
    let mut claimable = U256::zero();
    for controller in storage.deposit_accounts.keys() {
        let shares = storage.preview_sync(*controller)?.claimable_shares;
        let assets = storage.shares_to_assets(shares, Rounding::Floor)?;
        claimable = add(claimable, assets, "claimable view sum")?;
    }
    let assets = storage.total_assets()?;
    if claimable <= assets {
        Ok(())
    } else {
        Err(InvariantViolation::ClaimableDepositExceedsAssets { claimable, assets })
    }
}

/// Observed token balance backs every tracked asset. Donations only add slack.
pub fn check_asset_backing(
    storage: &VaultStorage,
    observed_balance: U256,
) -> Result<(), InvariantViolation> {
    let tracked = storage.global.tracked_assets;
    if observed_balance >= tracked {
        Ok(())
    } else {
        Err(InvariantViolation::AssetBalanceShortfall {
            balance: observed_balance,
            tracked,
        })
    }
}

/// Check all invariants at once.
#[must_use]
pub fn check_all_invariants(storage: &VaultStorage, observed_balance: U256) -> InvariantCheckResult {
    let violations: Vec<InvariantViolation> = [
        check_supply_covers_assets(storage),
        check_reserve_coverage(storage),
        check_reserve_counters(storage),
        check_share_supply(storage),
        check_claimable_deposit_views(storage),
        check_asset_backing(storage, observed_balance),
    ]
    .into_iter()
    .filter_map(Result::err)
    .collect();

    if violations.is_empty() {
        InvariantCheckResult::Valid
    } else {
        InvariantCheckResult::Invalid(violations)
    }
}

// =============================================================================
// INVARIANT TYPES
// =============================================================================

/// Result of checking all invariants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantCheckResult {
    /// All invariants hold.
    Valid,
    /// One or more invariants violated.
    Invalid(Vec<InvariantViolation>),
}

impl InvariantCheckResult {
    /// Returns true if all invariants hold.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Specific invariant violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A closed epoch with pending deposits has no usable snapshot.
    MissingEpochAllocation {
        /// Epoch without a snapshot.
        epoch: Epoch,
    },
    /// Settling an epoch would allocate zero shares for non-zero assets.
    ZeroShareAllocation {
        /// Epoch being closed.
        epoch: Epoch,
        /// Its pending assets.
        assets: U256,
    },
    /// Premium computation exceeded the pool it was taken from.
    PremiumOverdraw {
        /// Computed premium.
        fee: U256,
        /// Settled pool it was taken from.
        pool: U256,
    },
    /// Settlement would lock in a worthless redemption.
    ZeroValueRedemption {
        /// Request being settled.
        request_id: RequestId,
        /// Its escrowed shares.
        shares: U256,
    },
    /// Checked arithmetic failed.
    ArithmeticOverflow(&'static str),
    /// `total_supply < total_assets()`.
    SupplyBelowAssets {
        /// Total share supply.
        supply: U256,
        /// `total_assets()`.
        assets: U256,
    },
    /// Reserved redemptions exceed settled assets.
    ReserveUncovered {
        /// Tracked minus pending assets.
        settled: U256,
        /// Claimable redemption assets.
        reserved: U256,
    },
    /// Global reserve counters disagree with per-account sums.
    ReserveCounterDrift,
    /// Share balances do not sum to total supply.
    ShareSupplyDrift {
        /// Recorded total supply.
        supply: U256,
        /// Sum of balances.
        sum: U256,
    },
    /// Claimable deposit views exceed the pool.
    ClaimableDepositExceedsAssets {
        /// Sum of claimable deposit asset views.
        claimable: U256,
        /// `total_assets()`.
        assets: U256,
    },
    /// Token balance below tracked assets.
    AssetBalanceShortfall {
        /// Observed token balance of the vault.
        balance: U256,
        /// Tracked assets.
        tracked: U256,
    },
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingEpochAllocation { epoch } => {
                write!(f, "missing allocation for epoch {epoch}")
            }
            Self::ZeroShareAllocation { epoch, assets } => {
                write!(f, "epoch {epoch} allocates zero shares for {assets} assets")
            }
            Self::PremiumOverdraw { fee, pool } => {
                write!(f, "premium {fee} exceeds pool {pool}")
            }
            Self::ZeroValueRedemption { request_id, shares } => {
                write!(f, "request {request_id} of {shares} shares settles to zero assets")
            }
            Self::ArithmeticOverflow(what) => write!(f, "arithmetic overflow in {what}"),
            Self::SupplyBelowAssets { supply, assets } => {
                write!(f, "total supply {supply} below total assets {assets}")
            }
            Self::ReserveUncovered { settled, reserved } => {
                write!(f, "settled assets {settled} do not cover reserve {reserved}")
            }
            Self::ReserveCounterDrift => write!(f, "redeem reserve counters drifted"),
            Self::ShareSupplyDrift { supply, sum } => {
                write!(f, "share balances sum {sum} != supply {supply}")
            }
            Self::ClaimableDepositExceedsAssets { claimable, assets } => {
                write!(f, "claimable deposits {claimable} exceed total assets {assets}")
            }
            Self::AssetBalanceShortfall { balance, tracked } => {
                write!(f, "token balance {balance} below tracked assets {tracked}")
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
