//! # Settlement Context
//!
//! Everything one operation touches: the working copy of the persisted record,
//! the working copy of the asset ledger, the clock reading and the event
//! buffer. The service builds one context per operation and commits it only
//! when the operation returns `Ok`.
//!
//! Components read the record through [`SettlementContext::storage`] and
//! write it only through the context's writers, which record every key they
//! hand out in a [`WriteSet`]. Commit and rollback copy exactly those keys.

use crate::config::VaultConfig;
use crate::domain::entities::{
    DepositAccount, EpochAllocation, GlobalState, RedeemAccount, RedeemRequest,
};
use crate::domain::storage::{VaultStorage, WriteSet};
use crate::domain::value_objects::{Address, Epoch, RequestId, Timestamp, U256};
use crate::errors::VaultError;
use crate::events::VaultEvent;
use crate::ports::outbound::AssetToken;

/// Per-operation working set passed to every accounting component.
pub struct SettlementContext<'a, T: AssetToken> {
    storage: &'a mut VaultStorage,
    writes: WriteSet,
    /// Working copy of the asset ledger.
    pub token: &'a mut T,
    /// Engine constants.
    pub config: &'a VaultConfig,
    /// The vault's own account (share holding bucket, asset custody).
    pub vault: Address,
    /// Clock reading taken at operation start.
    pub now: Timestamp,
    events: Vec<VaultEvent>,
}

impl<'a, T: AssetToken> SettlementContext<'a, T> {
    /// Creates a context over working copies.
    pub fn new(
        storage: &'a mut VaultStorage,
        token: &'a mut T,
        config: &'a VaultConfig,
        vault: Address,
        now: Timestamp,
    ) -> Self {
        Self {
            storage,
            writes: WriteSet::default(),
            token,
            config,
            vault,
            now,
            events: Vec::new(),
        }
    }

    /// Buffers a notification for publication after commit.
    pub fn emit(&mut self, event: VaultEvent) {
        self.events.push(event);
    }

    /// Notifications buffered so far.
    #[must_use]
    pub fn events(&self) -> &[VaultEvent] {
        &self.events
    }

    /// Consumes the context, returning the keys written and the buffered
    /// notifications.
    #[must_use]
    pub fn into_parts(self) -> (WriteSet, Vec<VaultEvent>) {
        (self.writes, self.events)
    }

    /// Keys written so far.
    #[must_use]
    pub fn writes(&self) -> &WriteSet {
        &self.writes
    }

    /// Read access to the working record.
    #[must_use]
    pub fn storage(&self) -> &VaultStorage {
        self.storage
    }

    /// Vault-wide counters. Always part of the write set.
    pub fn global_mut(&mut self) -> &mut GlobalState {
        &mut self.storage.global
    }

    /// Deposit account of `controller`, created on first write.
    pub fn deposit_account_mut(&mut self, controller: Address) -> &mut DepositAccount {
        self.writes.deposit_accounts.insert(controller);
        self.storage.deposit_account_mut(controller)
    }

    /// Redemption account of `controller`, created on first write.
    pub fn redeem_account_mut(&mut self, controller: Address) -> &mut RedeemAccount {
        self.writes.redeem_accounts.insert(controller);
        self.storage.redeem_account_mut(controller)
    }

    /// Redemption request `id`, if it exists.
    pub fn redeem_request_mut(&mut self, id: RequestId) -> Option<&mut RedeemRequest> {
        let request = self.storage.redeem_requests.get_mut(&id)?;
        self.writes.redeem_requests.insert(id);
        Some(request)
    }

    /// Stores a new redemption request under `id`.
    pub fn insert_redeem_request(&mut self, id: RequestId, request: RedeemRequest) {
        self.writes.redeem_requests.insert(id);
        self.storage.redeem_requests.insert(id, request);
    }

    /// Deletes redemption request `id`, returning it.
    pub fn remove_redeem_request(&mut self, id: RequestId) -> Option<RedeemRequest> {
        self.writes.redeem_requests.insert(id);
        self.storage.redeem_requests.remove(&id)
    }

    /// Records the snapshot of a closed epoch.
    pub fn insert_epoch_allocation(&mut self, epoch: Epoch, allocation: EpochAllocation) {
        self.writes.epoch_allocations.insert(epoch);
        self.storage.epoch_allocations.insert(epoch, allocation);
    }

    /// Mints vault shares to `to`.
    pub fn mint_shares(&mut self, to: Address, amount: U256) -> Result<(), VaultError> {
        self.writes.share_holders.insert(to);
        self.storage.shares.mint(to, amount)
    }

    /// Burns vault shares held by `from`.
    pub fn burn_shares(&mut self, from: Address, amount: U256) -> Result<(), VaultError> {
        self.writes.share_holders.insert(from);
        self.storage.shares.burn(from, amount)
    }

    /// Moves vault shares between accounts.
    pub fn transfer_shares(
        &mut self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), VaultError> {
        self.writes.share_holders.insert(from);
        self.writes.share_holders.insert(to);
        self.storage.shares.transfer(from, to, amount)
    }

    /// Pulls `amount` from `from` into the vault.
    ///
    /// The vault's observed balance must grow by exactly `amount`; anything
    /// else (fee-on-transfer, rebasing) is an unsupported asset.
    pub fn pull_assets(&mut self, from: Address, amount: U256) -> Result<(), VaultError> {
        let before = self.token.balance_of(self.vault);
        self.token.transfer(from, self.vault, amount)?;
        let after = self.token.balance_of(self.vault);
        let observed = after.saturating_sub(before);
        if observed != amount {
            return Err(VaultError::UnsupportedAsset {
                expected: amount,
                observed,
            });
        }
        Ok(())
    }

    /// Pushes `amount` from the vault to `to`. Zero amounts are skipped.
    pub fn push_assets(&mut self, to: Address, amount: U256) -> Result<(), VaultError> {
        if amount.is_zero() {
            return Ok(());
        }
        self.token.transfer(self.vault, to, amount)?;
        Ok(())
    }
}
