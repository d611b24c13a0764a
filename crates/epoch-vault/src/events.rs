//! # Event Schema
//!
//! Notifications emitted by committed operations. Each carries the identifiers
//! and quantities involved, so an observer can rebuild every balance without
//! re-deriving settlement arithmetic.
//!
//! Events are buffered while an operation runs and published only after the
//! operation commits.

use crate::domain::value_objects::{Address, Epoch, RequestId, Timestamp, U256};
use serde::{Deserialize, Serialize};

/// Topic strings, one per event kind.
pub mod topics {
    /// Deposit requested.
    pub const DEPOSIT_REQUESTED: &str = "vault.deposit.requested";
    /// Deposit cancelled.
    pub const DEPOSIT_CANCELLED: &str = "vault.deposit.cancelled";
    /// Pending deposit converted to claimable shares.
    pub const DEPOSIT_SYNCED: &str = "vault.deposit.synced";
    /// Deposit shares claimed.
    pub const DEPOSIT_CLAIMED: &str = "vault.deposit.claimed";
    /// Redemption requested.
    pub const REDEEM_REQUESTED: &str = "vault.redeem.requested";
    /// Redemption cancelled.
    pub const REDEEM_CANCELLED: &str = "vault.redeem.cancelled";
    /// Redemption settled.
    pub const REDEEM_SETTLED: &str = "vault.redeem.settled";
    /// Redemption assets claimed.
    pub const REDEEM_CLAIMED: &str = "vault.redeem.claimed";
    /// Premium extraction attempted.
    pub const PREMIUM_STREAMED: &str = "vault.premium.streamed";
    /// Epoch closed.
    pub const EPOCH_SETTLED: &str = "vault.epoch.settled";
    /// Shares transferred.
    pub const SHARES_TRANSFERRED: &str = "vault.shares.transferred";
    /// Configuration changed.
    pub const CONFIG_UPDATED: &str = "vault.config.updated";
    /// Halt state changed.
    pub const HALT_CHANGED: &str = "vault.halt.changed";
}

/// Why a premium extraction moved the amount it did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PremiumOutcome {
    /// First extraction ever; starts the clock.
    NeverStreamed,
    /// No time elapsed since the last extraction.
    NoTimeElapsed,
    /// Configured rate is zero.
    ZeroRate,
    /// Pool is empty, or the computed fee rounded to zero.
    NothingToStream,
    /// Value moved to the collector.
    Streamed,
}

/// Settlement engine notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VaultEvent {
    /// Assets pulled in and added to a controller's pending bucket.
    DepositRequested {
        /// Depositor.
        controller: Address,
        /// Assets pulled.
        assets: U256,
        /// Epoch the assets wait for.
        epoch: Epoch,
    },
    /// Pending deposit refunded.
    DepositCancelled {
        /// Depositor.
        controller: Address,
        /// Assets refunded.
        assets: U256,
    },
    /// Pending deposit converted at a closed epoch's snapshot.
    DepositSynced {
        /// Depositor.
        controller: Address,
        /// Closed epoch whose snapshot priced the conversion.
        epoch: Epoch,
        /// Pending assets converted.
        assets: U256,
        /// Shares made claimable.
        shares: U256,
    },
    /// Claimable deposit shares moved to the controller.
    DepositClaimed {
        /// Depositor.
        controller: Address,
        /// Asset value of the claim.
        assets: U256,
        /// Shares moved.
        shares: U256,
    },
    /// Shares escrowed for redemption.
    RedeemRequested {
        /// Redeemer.
        controller: Address,
        /// Allocated id.
        request_id: RequestId,
        /// Shares escrowed.
        shares: U256,
        /// Start of the maturity window.
        creation_time: Timestamp,
    },
    /// Open redemption withdrawn; shares returned.
    RedeemCancelled {
        /// Redeemer.
        controller: Address,
        /// Withdrawn request.
        request_id: RequestId,
        /// Shares returned.
        shares: U256,
    },
    /// Redemption value fixed and shares burned.
    RedeemSettled {
        /// Redeemer.
        controller: Address,
        /// Settled request.
        request_id: RequestId,
        /// Shares burned.
        shares: U256,
        /// Assets reserved.
        assets: U256,
        /// Settled through the permissionless matured path.
        matured: bool,
    },
    /// Reserved assets pushed to the controller.
    RedeemClaimed {
        /// Redeemer.
        controller: Address,
        /// Assets pushed.
        assets: U256,
        /// Claimable shares consumed.
        shares: U256,
    },
    /// Premium extraction attempt. Emitted even for zero amounts.
    PremiumStreamed {
        /// Recipient.
        collector: Address,
        /// Assets paid.
        amount: U256,
        /// Rate applied.
        rate_bps: u64,
        /// Seconds since the previous extraction.
        elapsed_secs: u64,
        /// Why the amount is what it is.
        outcome: PremiumOutcome,
    },
    /// Epoch closed by batch settlement.
    EpochSettled {
        /// Closed epoch.
        epoch: Epoch,
        /// Pending assets settled.
        assets: U256,
        /// Shares pre-minted for them.
        shares: U256,
        /// Redemptions settled in the batch.
        redemptions: usize,
    },
    /// Shares moved between accounts.
    SharesTransferred {
        /// Sender.
        from: Address,
        /// Recipient.
        to: Address,
        /// Shares moved.
        shares: U256,
    },
    /// Premium rate changed.
    PremiumRateUpdated {
        /// Previous rate.
        old_bps: u64,
        /// Rate in force.
        new_bps: u64,
    },
    /// Premium rate cap changed.
    PremiumRateCapUpdated {
        /// Previous cap.
        old_bps: u64,
        /// Cap in force.
        new_bps: u64,
    },
    /// Premium collector changed.
    PremiumCollectorUpdated {
        /// Previous collector.
        old: Address,
        /// Collector in force.
        new: Address,
    },
    /// Minimum request floor changed.
    MinimumRequestUpdated {
        /// Previous floor.
        old: U256,
        /// Floor in force.
        new: U256,
    },
    /// Vault halted.
    Halted {
        /// Account that halted.
        by: Address,
    },
    /// Vault resumed.
    Resumed {
        /// Account that resumed.
        by: Address,
    },
}

impl VaultEvent {
    /// Topic this event is published under.
    #[must_use]
    pub fn topic(&self) -> &'static str {
        match self {
            Self::DepositRequested { .. } => topics::DEPOSIT_REQUESTED,
            Self::DepositCancelled { .. } => topics::DEPOSIT_CANCELLED,
            Self::DepositSynced { .. } => topics::DEPOSIT_SYNCED,
            Self::DepositClaimed { .. } => topics::DEPOSIT_CLAIMED,
            Self::RedeemRequested { .. } => topics::REDEEM_REQUESTED,
            Self::RedeemCancelled { .. } => topics::REDEEM_CANCELLED,
            Self::RedeemSettled { .. } => topics::REDEEM_SETTLED,
            Self::RedeemClaimed { .. } => topics::REDEEM_CLAIMED,
            Self::PremiumStreamed { .. } => topics::PREMIUM_STREAMED,
            Self::EpochSettled { .. } => topics::EPOCH_SETTLED,
            Self::SharesTransferred { .. } => topics::SHARES_TRANSFERRED,
            Self::PremiumRateUpdated { .. }
            | Self::PremiumRateCapUpdated { .. }
            | Self::PremiumCollectorUpdated { .. }
            | Self::MinimumRequestUpdated { .. } => topics::CONFIG_UPDATED,
            Self::Halted { .. } | Self::Resumed { .. } => topics::HALT_CHANGED,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
