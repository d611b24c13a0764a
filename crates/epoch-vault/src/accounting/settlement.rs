//! # Settlement Coordinator
//!
//! The only component that advances `current_epoch` or writes an
//! [`EpochAllocation`]. Each path runs premium extraction first so the
//! snapshot it fixes is taken net of premium.
//!
//! ## Batch settlement
//!
//! ```text
//! 1. check the expected-pending pin (if any)
//! 2. extract premium
//! 3. close epoch e, open e + 1
//! 4. pending > 0: mint assets_to_shares(pending) into the holding bucket,
//!    write EpochAllocation[e], zero pending
//! 5. settle every listed redemption (unknown / settled / duplicate aborts)
//! ```

use crate::accounting::context::SettlementContext;
use crate::accounting::{premium, redeem};
use crate::config::VaultConfig;
use crate::domain::entities::{EpochAllocation, RedeemRequest};
use crate::domain::invariants::InvariantViolation;
use crate::domain::storage::VaultStorage;
use crate::domain::value_objects::{Epoch, RequestId, Rounding, Timestamp, U256};
use crate::errors::VaultError;
use crate::events::VaultEvent;
use crate::ports::outbound::AssetToken;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Result of one batch settlement.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReport {
    /// Epoch that was closed.
    pub closed_epoch: Epoch,
    /// Premium extracted before the snapshot.
    pub premium: U256,
    /// Pending deposit assets settled into the epoch.
    pub deposit_assets: U256,
    /// Shares pre-minted for those assets.
    pub deposit_shares: U256,
    /// `(request_id, reserved_assets)` per settled redemption, in input order.
    pub redemptions: Vec<(RequestId, U256)>,
}

/// Closes the current epoch and settles the listed redemptions atomically.
pub fn settle_batch<T: AssetToken>(
    ctx: &mut SettlementContext<'_, T>,
    expected_pending: Option<U256>,
    redeem_ids: &[RequestId],
) -> Result<SettlementReport, VaultError> {
    let pending = ctx.storage().global.pending_assets;
    if let Some(expected) = expected_pending {
        if expected != pending {
            return Err(VaultError::PendingMismatch {
                expected,
                actual: pending,
            });
        }
    }

    let premium = premium::extract(ctx)?;

    let closed_epoch = ctx.storage().global.current_epoch;
    ctx.global_mut().current_epoch = closed_epoch
        .checked_add(1)
        .ok_or(InvariantViolation::ArithmeticOverflow("epoch counter"))?;

    let mut deposit_shares = U256::zero();
    if !pending.is_zero() {
        // Priced while `pending` is still excluded from total_assets().
        let shares = ctx.storage().assets_to_shares(pending, Rounding::Floor)?;
        if shares.is_zero() {
            return Err(InvariantViolation::ZeroShareAllocation {
                epoch: closed_epoch,
                assets: pending,
            }
            .into());
        }
        let vault = ctx.vault;
        ctx.mint_shares(vault, shares)?;
        ctx.insert_epoch_allocation(
            closed_epoch,
            EpochAllocation {
                total_shares: shares,
                total_assets: pending,
            },
        );
        ctx.global_mut().pending_assets = U256::zero();
        deposit_shares = shares;
    }

    let mut seen = HashSet::with_capacity(redeem_ids.len());
    let mut redemptions = Vec::with_capacity(redeem_ids.len());
    for &request_id in redeem_ids {
        if !seen.insert(request_id) {
            return Err(VaultError::DuplicateRedeemRequest(request_id));
        }
        let assets = redeem::settle_one(ctx, request_id, false)?;
        redemptions.push((request_id, assets));
    }

    ctx.emit(VaultEvent::EpochSettled {
        epoch: closed_epoch,
        assets: pending,
        shares: deposit_shares,
        redemptions: redemptions.len(),
    });
    Ok(SettlementReport {
        closed_epoch,
        premium,
        deposit_assets: pending,
        deposit_shares,
        redemptions,
    })
}

/// Checks that `request_id` exists, is unsettled and has matured at `now`.
///
/// Pure read; the service evaluates it before the halt check.
pub fn check_matured<'s>(
    storage: &'s VaultStorage,
    config: &VaultConfig,
    request_id: RequestId,
    now: Timestamp,
) -> Result<&'s RedeemRequest, VaultError> {
    let request = storage
        .redeem_requests
        .get(&request_id)
        .ok_or(VaultError::UnknownRedeemRequest(request_id))?;
    if request.settled {
        return Err(VaultError::RedeemRequestSettled(request_id));
    }
    let delay = config.redeem_maturity_delay_secs;
    if !request.is_matured(now, delay) {
        return Err(VaultError::NotMatured {
            request_id,
            matures_at: request.matures_at(delay),
            now,
        });
    }
    Ok(request)
}

/// Permissionless settlement of one matured request. Returns the reserved
/// assets.
pub fn settle_matured<T: AssetToken>(
    ctx: &mut SettlementContext<'_, T>,
    request_id: RequestId,
) -> Result<U256, VaultError> {
    check_matured(ctx.storage(), ctx.config, request_id, ctx.now)?;
    premium::extract(ctx)?;
    redeem::settle_one(ctx, request_id, true)
}
