//! # Deposit Ledger
//!
//! Pending deposits are aggregated per controller in one bucket tagged with
//! the epoch they were made in. Once that epoch closes, the bucket converts
//! lazily (on the controller's next touch) at the epoch's fixed
//! [`EpochAllocation`](crate::domain::entities::EpochAllocation).
//!
//! ```text
//! request ──► pending[epoch e] ──(epoch e closes)──► sync ──► claimable shares
//!                  │                                              │
//!               cancel (refund)                          claim by assets / shares
//! ```

use crate::accounting::context::SettlementContext;
use crate::domain::entities::DepositAccount;
use crate::domain::invariants::InvariantViolation;
use crate::domain::services::{add, mul_div, sub};
use crate::domain::storage::VaultStorage;
use crate::domain::value_objects::{Address, Rounding, U256};
use crate::errors::VaultError;
use crate::events::VaultEvent;
use crate::ports::outbound::{AssetToken, WrappedPool};

impl VaultStorage {
    /// What `controller`'s deposit account would look like after a sync,
    /// without writing anything.
    pub fn preview_sync(&self, controller: Address) -> Result<DepositAccount, InvariantViolation> {
        let mut account = self
            .deposit_accounts
            .get(&controller)
            .cloned()
            .unwrap_or_default();
        let current = self.global.current_epoch;

        if account.last_synced_epoch < current && !account.pending_assets.is_zero() {
            let epoch = account.last_synced_epoch;
            let allocation = self
                .epoch_allocations
                .get(&epoch)
                .filter(|allocation| allocation.is_valid())
                .ok_or(InvariantViolation::MissingEpochAllocation { epoch })?;
            let shares = mul_div(
                account.pending_assets,
                allocation.total_shares,
                allocation.total_assets,
                Rounding::Floor,
            )?;
            account.claimable_shares = add(account.claimable_shares, shares, "claimable shares")?;
            account.pending_assets = U256::zero();
        }
        account.last_synced_epoch = current;
        Ok(account)
    }
}

/// Brings `controller`'s account up to the current epoch. Returns the shares
/// newly made claimable. Idempotent within an epoch.
pub fn sync<T: AssetToken>(
    ctx: &mut SettlementContext<'_, T>,
    controller: Address,
) -> Result<U256, VaultError> {
    let before = ctx
        .storage()
        .deposit_accounts
        .get(&controller)
        .cloned()
        .unwrap_or_default();
    let after = ctx.storage().preview_sync(controller)?;
    let converted = sub(after.claimable_shares, before.claimable_shares, "synced shares")?;

    if !converted.is_zero() {
        ctx.emit(VaultEvent::DepositSynced {
            controller,
            epoch: before.last_synced_epoch,
            assets: before.pending_assets,
            shares: converted,
        });
    }
    *ctx.deposit_account_mut(controller) = after;
    Ok(converted)
}

/// Pulls `assets` from `controller` into the current epoch's pending bucket.
pub fn request<T: AssetToken>(
    ctx: &mut SettlementContext<'_, T>,
    pool: &dyn WrappedPool,
    controller: Address,
    assets: U256,
) -> Result<(), VaultError> {
    if assets.is_zero() {
        return Err(VaultError::ZeroAmount);
    }
    let minimum = ctx.storage().global.minimum_request_assets;
    if !minimum.is_zero() {
        let value = pool.convert_to_assets(assets)?;
        if value < minimum {
            return Err(VaultError::BelowMinimum { value, minimum });
        }
    }

    ctx.pull_assets(controller, assets)?;
    let global = ctx.global_mut();
    global.tracked_assets = add(global.tracked_assets, assets, "tracked assets")?;

    sync(ctx, controller)?;
    let account = ctx.deposit_account_mut(controller);
    account.pending_assets = add(account.pending_assets, assets, "pending deposit")?;
    let global = ctx.global_mut();
    global.pending_assets = add(global.pending_assets, assets, "pending assets")?;

    let epoch = ctx.storage().global.current_epoch;
    ctx.emit(VaultEvent::DepositRequested {
        controller,
        assets,
        epoch,
    });
    Ok(())
}

/// Refunds `controller`'s pending deposit. Returns the refunded assets.
pub fn cancel<T: AssetToken>(
    ctx: &mut SettlementContext<'_, T>,
    controller: Address,
) -> Result<U256, VaultError> {
    sync(ctx, controller)?;
    let account = ctx.deposit_account_mut(controller);
    let assets = account.pending_assets;
    if assets.is_zero() {
        return Err(VaultError::NoPendingDeposit(controller));
    }
    account.pending_assets = U256::zero();

    let global = ctx.global_mut();
    global.pending_assets = sub(global.pending_assets, assets, "pending assets")?;
    global.tracked_assets = sub(global.tracked_assets, assets, "tracked assets")?;
    ctx.push_assets(controller, assets)?;

    ctx.emit(VaultEvent::DepositCancelled { controller, assets });
    Ok(assets)
}

/// Claims shares worth `assets` at the live rate. Returns the shares moved.
pub fn claim_by_assets<T: AssetToken>(
    ctx: &mut SettlementContext<'_, T>,
    controller: Address,
    assets: U256,
) -> Result<U256, VaultError> {
    if assets.is_zero() {
        return Err(VaultError::ZeroAmount);
    }
    sync(ctx, controller)?;
    let claimable = claimable_shares(ctx.storage(), controller)?;

    let available = ctx.storage().shares_to_assets(claimable, Rounding::Floor)?;
    if assets > available {
        return Err(VaultError::InsufficientClaimable {
            requested: assets,
            available,
        });
    }
    let shares = ctx
        .storage()
        .assets_to_shares(assets, Rounding::Floor)?
        .min(claimable);

    release(ctx, controller, shares)?;
    ctx.emit(VaultEvent::DepositClaimed {
        controller,
        assets,
        shares,
    });
    Ok(shares)
}

/// Claims exactly `shares`. Returns the assets reported as consumed, rounded
/// up.
pub fn claim_by_shares<T: AssetToken>(
    ctx: &mut SettlementContext<'_, T>,
    controller: Address,
    shares: U256,
) -> Result<U256, VaultError> {
    if shares.is_zero() {
        return Err(VaultError::ZeroAmount);
    }
    sync(ctx, controller)?;
    let claimable = claimable_shares(ctx.storage(), controller)?;
    if shares > claimable {
        return Err(VaultError::InsufficientClaimable {
            requested: shares,
            available: claimable,
        });
    }
    let assets = ctx.storage().shares_to_assets(shares, Rounding::Ceil)?;

    release(ctx, controller, shares)?;
    ctx.emit(VaultEvent::DepositClaimed {
        controller,
        assets,
        shares,
    });
    Ok(assets)
}

fn claimable_shares(storage: &VaultStorage, controller: Address) -> Result<U256, VaultError> {
    let claimable = storage
        .deposit_accounts
        .get(&controller)
        .map(|account| account.claimable_shares)
        .unwrap_or_default();
    if claimable.is_zero() {
        return Err(VaultError::NoClaimableDeposit(controller));
    }
    Ok(claimable)
}

/// Moves claimable shares from the holding bucket to the controller.
fn release<T: AssetToken>(
    ctx: &mut SettlementContext<'_, T>,
    controller: Address,
    shares: U256,
) -> Result<(), VaultError> {
    let account = ctx.deposit_account_mut(controller);
    account.claimable_shares = sub(account.claimable_shares, shares, "claimable shares")?;
    let vault = ctx.vault;
    ctx.transfer_shares(vault, controller, shares)
}
