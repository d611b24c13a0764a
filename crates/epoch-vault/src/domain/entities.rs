//! # Domain Entities
//!
//! Records persisted in [`VaultStorage`](crate::domain::storage::VaultStorage).
//! Field order is part of the persisted layout. A new field is appended and
//! bumps [`STORAGE_LAYOUT_VERSION`](crate::domain::storage::STORAGE_LAYOUT_VERSION);
//! the previous shape moves into `storage.rs` with a migration.

use crate::domain::value_objects::{Address, Epoch, RequestId, Timestamp, U256};
use serde::{Deserialize, Serialize};

// =============================================================================
// GLOBAL STATE
// =============================================================================

/// Vault-wide accounting state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalState {
    /// Assets pulled in and not yet pushed out. Independent of the observable
    /// token balance so direct donations never move pricing.
    pub tracked_assets: U256,
    /// Portion of `tracked_assets` awaiting settlement.
    pub pending_assets: U256,
    /// Current (open) epoch.
    pub current_epoch: Epoch,
    /// Last premium extraction. `0` means never.
    pub last_premium_timestamp: Timestamp,
    /// Annualized premium rate.
    pub premium_rate_bps: u64,
    /// Upper bound for `premium_rate_bps`.
    pub premium_rate_cap_bps: u64,
    /// Recipient of extracted premium.
    pub premium_collector: Address,
    /// Minimum deposit request value in wrapped-pool assets. `0` disables.
    pub minimum_request_assets: U256,
    /// Sum of `RedeemAccount::claimable_shares`.
    pub total_claimable_redeem_shares: U256,
    /// Sum of `RedeemAccount::claimable_assets`.
    pub total_claimable_redeem_assets: U256,
    /// Last allocated redemption request id.
    pub last_redeem_request_id: RequestId,
    /// Emergency halt flag.
    pub halted: bool,
    /// Premium paid to collectors since the record was created. Records
    /// migrated from layout 1 start counting at the migration.
    pub premium_paid: U256,
}

// =============================================================================
// DEPOSITS
// =============================================================================

/// Per-controller deposit bookkeeping.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositAccount {
    /// Epoch the account was last synchronized to.
    pub last_synced_epoch: Epoch,
    /// Assets waiting for the epoch `last_synced_epoch` to close.
    pub pending_assets: U256,
    /// Settled shares held in the vault's bucket for this controller.
    pub claimable_shares: U256,
}

/// Fixed exchange-rate snapshot for one closed epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochAllocation {
    /// Shares pre-minted for the epoch's pending assets.
    pub total_shares: U256,
    /// Pending assets settled in the epoch.
    pub total_assets: U256,
}

impl EpochAllocation {
    /// An allocation is usable only when both sides are non-zero.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.total_shares.is_zero() && !self.total_assets.is_zero()
    }
}

// =============================================================================
// REDEMPTIONS
// =============================================================================

/// Per-controller redemption bookkeeping.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemAccount {
    /// Shares escrowed across all open requests.
    pub pending_shares: U256,
    /// Settled, burned shares not yet claimed.
    pub claimable_shares: U256,
    /// Asset value fixed at settlement for `claimable_shares`.
    pub claimable_assets: U256,
    /// Most recent request id issued to this controller.
    pub last_redeem_request_id: RequestId,
}

/// One redemption request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemRequest {
    /// Shares escrowed by the request.
    pub shares: U256,
    /// Owner of the request.
    pub controller: Address,
    /// Creation time, start of the maturity window.
    pub creation_time: Timestamp,
    /// Set once settled; settled requests are never deleted.
    pub settled: bool,
}

impl RedeemRequest {
    /// Time at which the request becomes eligible for permissionless settlement.
    #[must_use]
    pub fn matures_at(&self, maturity_delay_secs: u64) -> Timestamp {
        self.creation_time.saturating_add(maturity_delay_secs)
    }

    /// True once `now` reaches the maturity time.
    #[must_use]
    pub fn is_matured(&self, now: Timestamp, maturity_delay_secs: u64) -> bool {
        now >= self.matures_at(maturity_delay_secs)
    }
}

/// Maturity view of a request, available even while the vault is halted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemMaturity {
    /// Request id.
    pub request_id: RequestId,
    /// Time at which the request becomes permissionlessly settleable.
    pub matures_at: Timestamp,
    /// Whether `now >= matures_at`.
    pub matured: bool,
    /// Whether the request is already settled.
    pub settled: bool,
}

// =============================================================================
// TESTS
// =============================================================================
