//! # Persisted Layout
//!
//! Every field the engine owns lives in one [`VaultStorage`] record.
//!
//! Encoding: `[MAGIC (8)][VERSION (2, LE)][bincode payload]`.
//!
//! ## Versioning
//!
//! The payload is positional, so a record can only be read with the exact
//! shape it was written with. Each past layout keeps its own payload struct
//! in [`layout`] and a `From` migration into the current [`VaultStorage`];
//! [`VaultStorage::decode`] dispatches on the header version.
//!
//! | Version | Change |
//! |---------|--------|
//! | 1 | Initial layout |
//! | 2 | `GlobalState::premium_paid` appended |

use crate::domain::entities::{
    DepositAccount, EpochAllocation, GlobalState, RedeemAccount, RedeemRequest,
};
use crate::domain::share_ledger::ShareLedger;
use crate::domain::value_objects::{Address, Epoch, RequestId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::info;

/// Current layout version.
pub const STORAGE_LAYOUT_VERSION: u16 = 2;

/// Magic bytes identifying an encoded vault record.
const STORAGE_MAGIC: &[u8; 8] = b"EVAULT\x00\x01";

const HEADER_LEN: usize = STORAGE_MAGIC.len() + 2;

/// The complete engine state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultStorage {
    /// Layout version this record was written with.
    pub layout_version: u16,
    /// Vault-wide counters and configuration.
    pub global: GlobalState,
    /// Deposit bookkeeping per controller.
    pub deposit_accounts: BTreeMap<Address, DepositAccount>,
    /// Epoch snapshots, written once per settled epoch.
    pub epoch_allocations: BTreeMap<Epoch, EpochAllocation>,
    /// Redemption bookkeeping per controller.
    pub redeem_accounts: BTreeMap<Address, RedeemAccount>,
    /// Open and settled redemption requests.
    pub redeem_requests: BTreeMap<RequestId, RedeemRequest>,
    /// The vault's own share balances.
    pub shares: ShareLedger,
}

/// Errors decoding a persisted record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageCodecError {
    /// Input shorter than the header.
    #[error("truncated record: {0} bytes")]
    Truncated(usize),

    /// Header magic did not match.
    #[error("bad magic bytes")]
    BadMagic,

    /// Record written with a layout this build cannot read.
    #[error("unsupported layout version {found}, current {current}")]
    UnsupportedVersion {
        /// Version found in the header.
        found: u16,
        /// Version this build writes.
        current: u16,
    },

    /// Payload could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for StorageCodecError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl VaultStorage {
    /// Creates an empty record at the current layout version.
    #[must_use]
    pub fn new(global: GlobalState) -> Self {
        Self {
            layout_version: STORAGE_LAYOUT_VERSION,
            global,
            ..Self::default()
        }
    }

    /// Encodes the record at the current layout version.
    pub fn encode(&self) -> Result<Vec<u8>, StorageCodecError> {
        let payload = bincode::serialize(self)?;
        let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
        buf.extend_from_slice(STORAGE_MAGIC);
        buf.extend_from_slice(&STORAGE_LAYOUT_VERSION.to_le_bytes());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Decodes a record written by this or any earlier layout, migrating it
    /// to the current one.
    pub fn decode(bytes: &[u8]) -> Result<Self, StorageCodecError> {
        if bytes.len() < HEADER_LEN {
            return Err(StorageCodecError::Truncated(bytes.len()));
        }
        if &bytes[..STORAGE_MAGIC.len()] != STORAGE_MAGIC {
            return Err(StorageCodecError::BadMagic);
        }
        let version = u16::from_le_bytes([bytes[8], bytes[9]]);
        let payload = &bytes[HEADER_LEN..];

        match version {
            1 => {
                let record: layout::VaultStorageV1 = bincode::deserialize(payload)?;
                info!(from = version, to = STORAGE_LAYOUT_VERSION, "migrated vault record");
                Ok(record.into())
            }
            STORAGE_LAYOUT_VERSION => Ok(bincode::deserialize(payload)?),
            found => Err(StorageCodecError::UnsupportedVersion {
                found,
                current: STORAGE_LAYOUT_VERSION,
            }),
        }
    }

    /// Deposit account for `controller`, created on first use.
    pub fn deposit_account_mut(&mut self, controller: Address) -> &mut DepositAccount {
        self.deposit_accounts.entry(controller).or_default()
    }

    /// Redemption account for `controller`, created on first use.
    pub fn redeem_account_mut(&mut self, controller: Address) -> &mut RedeemAccount {
        self.redeem_accounts.entry(controller).or_default()
    }
}

// =============================================================================
// PAST LAYOUTS
// =============================================================================

/// Payload shapes of earlier layout versions.
pub mod layout {
    use super::*;
    use crate::domain::value_objects::{Timestamp, U256};

    /// `GlobalState` as written by layout 1.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[allow(missing_docs)]
    pub struct GlobalStateV1 {
        pub tracked_assets: U256,
        pub pending_assets: U256,
        pub current_epoch: Epoch,
        pub last_premium_timestamp: Timestamp,
        pub premium_rate_bps: u64,
        pub premium_rate_cap_bps: u64,
        pub premium_collector: Address,
        pub minimum_request_assets: U256,
        pub total_claimable_redeem_shares: U256,
        pub total_claimable_redeem_assets: U256,
        pub last_redeem_request_id: RequestId,
        pub halted: bool,
    }

    /// `VaultStorage` as written by layout 1.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[allow(missing_docs)]
    pub struct VaultStorageV1 {
        pub layout_version: u16,
        pub global: GlobalStateV1,
        pub deposit_accounts: BTreeMap<Address, DepositAccount>,
        pub epoch_allocations: BTreeMap<Epoch, EpochAllocation>,
        pub redeem_accounts: BTreeMap<Address, RedeemAccount>,
        pub redeem_requests: BTreeMap<RequestId, RedeemRequest>,
        pub shares: ShareLedger,
    }

    impl From<GlobalStateV1> for GlobalState {
        fn from(v1: GlobalStateV1) -> Self {
            Self {
                tracked_assets: v1.tracked_assets,
                pending_assets: v1.pending_assets,
                current_epoch: v1.current_epoch,
                last_premium_timestamp: v1.last_premium_timestamp,
                premium_rate_bps: v1.premium_rate_bps,
                premium_rate_cap_bps: v1.premium_rate_cap_bps,
                premium_collector: v1.premium_collector,
                minimum_request_assets: v1.minimum_request_assets,
                total_claimable_redeem_shares: v1.total_claimable_redeem_shares,
                total_claimable_redeem_assets: v1.total_claimable_redeem_assets,
                last_redeem_request_id: v1.last_redeem_request_id,
                halted: v1.halted,
                premium_paid: U256::zero(),
            }
        }
    }

    impl From<VaultStorageV1> for VaultStorage {
        fn from(v1: VaultStorageV1) -> Self {
            Self {
                layout_version: STORAGE_LAYOUT_VERSION,
                global: v1.global.into(),
                deposit_accounts: v1.deposit_accounts,
                epoch_allocations: v1.epoch_allocations,
                redeem_accounts: v1.redeem_accounts,
                redeem_requests: v1.redeem_requests,
                shares: v1.shares,
            }
        }
    }
}

// =============================================================================
// WRITE SET
// =============================================================================

/// Keys one operation wrote.
///
/// Copying a write set from one record to another makes the target agree
/// with the source on everything the operation touched. The global record is
/// always copied. Cost is proportional to the keys written, not to the size
/// of the record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteSet {
    /// Deposit accounts written.
    pub deposit_accounts: BTreeSet<Address>,
    /// Epoch allocations written.
    pub epoch_allocations: BTreeSet<Epoch>,
    /// Redemption accounts written.
    pub redeem_accounts: BTreeSet<Address>,
    /// Redemption requests inserted, updated or removed.
    pub redeem_requests: BTreeSet<RequestId>,
    /// Share balances changed.
    pub share_holders: BTreeSet<Address>,
}

impl WriteSet {
    /// Number of keyed entries written.
    #[must_use]
    pub fn len(&self) -> usize {
        self.deposit_accounts.len()
            + self.epoch_allocations.len()
            + self.redeem_accounts.len()
            + self.redeem_requests.len()
            + self.share_holders.len()
    }

    /// True if no keyed entry was written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrites the written entries of `target` with those of `source`.
    /// Entries absent from `source` are removed from `target`.
    pub fn copy(&self, source: &VaultStorage, target: &mut VaultStorage) {
        target.layout_version = source.layout_version;
        target.global.clone_from(&source.global);
        copy_keys(
            &self.deposit_accounts,
            &source.deposit_accounts,
            &mut target.deposit_accounts,
        );
        copy_keys(
            &self.epoch_allocations,
            &source.epoch_allocations,
            &mut target.epoch_allocations,
        );
        copy_keys(
            &self.redeem_accounts,
            &source.redeem_accounts,
            &mut target.redeem_accounts,
        );
        copy_keys(
            &self.redeem_requests,
            &source.redeem_requests,
            &mut target.redeem_requests,
        );
        target.shares.copy_balances(&source.shares, &self.share_holders);
    }
}

fn copy_keys<K: Ord + Copy, V: Clone>(
    keys: &BTreeSet<K>,
    source: &BTreeMap<K, V>,
    target: &mut BTreeMap<K, V>,
) {
    for key in keys {
        match source.get(key) {
            Some(value) => {
                target.insert(*key, value.clone());
            }
            None => {
                target.remove(key);
            }
        }
    }
}
