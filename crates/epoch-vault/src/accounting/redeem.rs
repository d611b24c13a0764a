//! # Redeem Ledger
//!
//! Redemptions escrow shares in the vault's holding bucket until settled. At
//! settlement the asset value is fixed and reserved, the shares are burned,
//! and later premium or price moves no longer touch the reserved amount.

use crate::accounting::context::SettlementContext;
use crate::domain::entities::RedeemRequest;
use crate::domain::invariants::InvariantViolation;
use crate::domain::services::{add, mul_div, sub};
use crate::domain::value_objects::{Address, RequestId, Rounding, U256};
use crate::errors::VaultError;
use crate::events::VaultEvent;
use crate::ports::outbound::AssetToken;

/// Escrows `shares` from `controller` and opens a request. Returns its id.
pub fn request<T: AssetToken>(
    ctx: &mut SettlementContext<'_, T>,
    controller: Address,
    shares: U256,
) -> Result<RequestId, VaultError> {
    if shares.is_zero() {
        return Err(VaultError::ZeroAmount);
    }
    let vault = ctx.vault;
    ctx.transfer_shares(controller, vault, shares)?;

    let request_id = ctx
        .storage()
        .global
        .last_redeem_request_id
        .checked_add(1)
        .ok_or(InvariantViolation::ArithmeticOverflow("redeem request id"))?;
    ctx.global_mut().last_redeem_request_id = request_id;

    let account = ctx.redeem_account_mut(controller);
    account.pending_shares = add(account.pending_shares, shares, "pending redeem shares")?;
    account.last_redeem_request_id = request_id;

    let creation_time = ctx.now;
    ctx.insert_redeem_request(
        request_id,
        RedeemRequest {
            shares,
            controller,
            creation_time,
            settled: false,
        },
    );

    ctx.emit(VaultEvent::RedeemRequested {
        controller,
        request_id,
        shares,
        creation_time,
    });
    Ok(request_id)
}

/// Withdraws an open request and returns its shares to the controller.
pub fn cancel<T: AssetToken>(
    ctx: &mut SettlementContext<'_, T>,
    request_id: RequestId,
    controller: Address,
) -> Result<U256, VaultError> {
    let request = ctx
        .storage()
        .redeem_requests
        .get(&request_id)
        .ok_or(VaultError::UnknownRedeemRequest(request_id))?;
    if request.controller != controller {
        return Err(VaultError::ForeignRedeemRequest {
            request_id,
            controller,
        });
    }
    if request.settled {
        return Err(VaultError::RedeemRequestSettled(request_id));
    }
    let shares = request.shares;
    ctx.remove_redeem_request(request_id);

    let account = ctx.redeem_account_mut(controller);
    account.pending_shares = sub(account.pending_shares, shares, "pending redeem shares")?;
    let vault = ctx.vault;
    ctx.transfer_shares(vault, controller, shares)?;

    ctx.emit(VaultEvent::RedeemCancelled {
        controller,
        request_id,
        shares,
    });
    Ok(shares)
}

/// Settles one request at the live rate. Returns the reserved assets.
///
/// The asset value is computed before the shares are burned, so the request
/// is priced against the pool it was part of.
pub fn settle_one<T: AssetToken>(
    ctx: &mut SettlementContext<'_, T>,
    request_id: RequestId,
    matured: bool,
) -> Result<U256, VaultError> {
    let request = ctx
        .storage()
        .redeem_requests
        .get(&request_id)
        .ok_or(VaultError::UnknownRedeemRequest(request_id))?;
    if request.settled {
        return Err(VaultError::RedeemRequestSettled(request_id));
    }
    let shares = request.shares;
    let controller = request.controller;

    let assets = ctx.storage().shares_to_assets(shares, Rounding::Floor)?;
    if assets.is_zero() {
        return Err(InvariantViolation::ZeroValueRedemption { request_id, shares }.into());
    }

    if let Some(request) = ctx.redeem_request_mut(request_id) {
        request.settled = true;
    }
    let account = ctx.redeem_account_mut(controller);
    account.pending_shares = sub(account.pending_shares, shares, "pending redeem shares")?;
    account.claimable_shares = add(account.claimable_shares, shares, "claimable redeem shares")?;
    account.claimable_assets = add(account.claimable_assets, assets, "claimable redeem assets")?;

    let vault = ctx.vault;
    ctx.burn_shares(vault, shares)?;

    let global = ctx.global_mut();
    global.total_claimable_redeem_shares = add(
        global.total_claimable_redeem_shares,
        shares,
        "reserved shares",
    )?;
    global.total_claimable_redeem_assets = add(
        global.total_claimable_redeem_assets,
        assets,
        "reserved assets",
    )?;

    ctx.emit(VaultEvent::RedeemSettled {
        controller,
        request_id,
        shares,
        assets,
        matured,
    });
    Ok(assets)
}

/// Claims by shares at the fixed settlement rate. Returns the assets pushed.
pub fn claim_by_shares<T: AssetToken>(
    ctx: &mut SettlementContext<'_, T>,
    controller: Address,
    shares: U256,
) -> Result<U256, VaultError> {
    if shares.is_zero() {
        return Err(VaultError::ZeroAmount);
    }
    let (claimable_shares, claimable_assets) = claimable(ctx, controller)?;
    if shares > claimable_shares {
        return Err(VaultError::InsufficientClaimable {
            requested: shares,
            available: claimable_shares,
        });
    }
    let assets = if shares == claimable_shares {
        claimable_assets
    } else {
        mul_div(shares, claimable_assets, claimable_shares, Rounding::Floor)?
    };

    release(ctx, controller, shares, assets)?;
    Ok(assets)
}

/// Claims exactly `assets`. Returns the claimable shares consumed, rounded up.
pub fn claim_by_assets<T: AssetToken>(
    ctx: &mut SettlementContext<'_, T>,
    controller: Address,
    assets: U256,
) -> Result<U256, VaultError> {
    if assets.is_zero() {
        return Err(VaultError::ZeroAmount);
    }
    let (claimable_shares, claimable_assets) = claimable(ctx, controller)?;
    if assets > claimable_assets {
        return Err(VaultError::InsufficientClaimable {
            requested: assets,
            available: claimable_assets,
        });
    }
    let shares = if assets == claimable_assets {
        claimable_shares
    } else {
        mul_div(assets, claimable_shares, claimable_assets, Rounding::Ceil)?.min(claimable_shares)
    };

    release(ctx, controller, shares, assets)?;
    Ok(shares)
}

fn claimable<T: AssetToken>(
    ctx: &SettlementContext<'_, T>,
    controller: Address,
) -> Result<(U256, U256), VaultError> {
    match ctx.storage().redeem_accounts.get(&controller) {
        Some(account) if !account.claimable_shares.is_zero() => {
            Ok((account.claimable_shares, account.claimable_assets))
        }
        _ => Err(VaultError::NoClaimableRedeem(controller)),
    }
}

/// Reduces the reserve by `(shares, assets)` and pays the controller.
fn release<T: AssetToken>(
    ctx: &mut SettlementContext<'_, T>,
    controller: Address,
    shares: U256,
    assets: U256,
) -> Result<(), VaultError> {
    let account = ctx.redeem_account_mut(controller);
    account.claimable_shares = sub(account.claimable_shares, shares, "claimable redeem shares")?;
    account.claimable_assets = sub(account.claimable_assets, assets, "claimable redeem assets")?;

    let global = ctx.global_mut();
    global.total_claimable_redeem_shares =
        sub(global.total_claimable_redeem_shares, shares, "reserved shares")?;
    global.total_claimable_redeem_assets =
        sub(global.total_claimable_redeem_assets, assets, "reserved assets")?;
    global.tracked_assets = sub(global.tracked_assets, assets, "tracked assets")?;

    ctx.push_assets(controller, assets)?;
    ctx.emit(VaultEvent::RedeemClaimed {
        controller,
        assets,
        shares,
    });
    Ok(())
}
