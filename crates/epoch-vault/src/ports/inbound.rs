//! # Inbound Port - VaultApi
//!
//! Primary driving port exposing the settlement engine.
//!
//! ## Authorization
//!
//! | Method | Required |
//! |--------|----------|
//! | `request_deposit`, `cancel_deposit`, `deposit`, `mint` | caller == controller == owner/receiver |
//! | `request_redeem`, `cancel_redeem`, `redeem`, `withdraw` | caller == controller == owner/receiver |
//! | `settle` | [`Capability::Settle`] |
//! | `settle_matured_redeem` | anyone, once matured |
//! | `set_premium_rate`, `set_premium_collector`, `set_minimum_request_assets` | [`Capability::Configure`] |
//! | `set_premium_rate_cap` | [`Capability::Owner`] |
//! | `halt`, `resume` | [`Capability::Emergency`] |
//!
//! Every mutating method is blocked while halted, except `resume`.
//! `settle_matured_redeem` reports `NotMatured` ahead of `Halted`.

use crate::accounting::settlement::SettlementReport;
use crate::domain::entities::{EpochAllocation, GlobalState, RedeemMaturity, RedeemRequest};
use crate::domain::invariants::InvariantCheckResult;
use crate::domain::value_objects::{Address, Epoch, RequestId, U256};
use crate::errors::VaultError;

#[cfg(doc)]
use crate::ports::outbound::Capability;

/// Primary API of the settlement engine.
///
/// All methods take `&self`: the engine serializes mutations internally and
/// rejects nested entries with [`VaultError::Reentrancy`].
///
/// # Example
///
/// ```rust,ignore
/// use epoch_vault::prelude::*;
///
/// fn epoch_cycle(vault: &impl VaultApi, operator: Address, alice: Address) {
///     vault.request_deposit(alice, U256::from(1_000), alice, alice)?;
///     vault.settle(operator, None, &[])?;
///     let shares = vault.deposit(alice, U256::from(1_000), alice, alice)?;
/// }
/// ```
pub trait VaultApi: Send + Sync {
    // -------------------------------------------------------------------------
    // Deposits
    // -------------------------------------------------------------------------

    /// Pulls `assets` from `owner` into `controller`'s pending deposit.
    ///
    /// # Errors
    /// - `IdentityMismatch`: caller, controller and owner differ
    /// - `ZeroAmount`, `BelowMinimum`
    /// - `UnsupportedAsset`: the vault balance did not grow by `assets`
    fn request_deposit(
        &self,
        caller: Address,
        assets: U256,
        controller: Address,
        owner: Address,
    ) -> Result<(), VaultError>;

    /// Refunds the controller's pending deposit. Returns the refunded assets.
    fn cancel_deposit(&self, caller: Address, controller: Address) -> Result<U256, VaultError>;

    /// Claims settled deposit shares worth `assets`. Returns the shares moved.
    fn deposit(
        &self,
        caller: Address,
        assets: U256,
        receiver: Address,
        controller: Address,
    ) -> Result<U256, VaultError>;

    /// Claims exactly `shares` settled deposit shares. Returns the assets
    /// consumed, rounded up.
    fn mint(
        &self,
        caller: Address,
        shares: U256,
        receiver: Address,
        controller: Address,
    ) -> Result<U256, VaultError>;

    // -------------------------------------------------------------------------
    // Redemptions
    // -------------------------------------------------------------------------

    /// Escrows `shares` from `owner` for redemption. Returns the request id.
    fn request_redeem(
        &self,
        caller: Address,
        shares: U256,
        controller: Address,
        owner: Address,
    ) -> Result<RequestId, VaultError>;

    /// Withdraws an unsettled request. Returns the shares given back.
    fn cancel_redeem(
        &self,
        caller: Address,
        request_id: RequestId,
        controller: Address,
    ) -> Result<U256, VaultError>;

    /// Claims reserved assets by shares. Returns the assets pushed.
    fn redeem(
        &self,
        caller: Address,
        shares: U256,
        receiver: Address,
        controller: Address,
    ) -> Result<U256, VaultError>;

    /// Claims exactly `assets` from the reserve. Returns the shares consumed.
    fn withdraw(
        &self,
        caller: Address,
        assets: U256,
        receiver: Address,
        controller: Address,
    ) -> Result<U256, VaultError>;

    // -------------------------------------------------------------------------
    // Settlement
    // -------------------------------------------------------------------------

    /// Closes the current epoch and settles `redeem_ids`.
    ///
    /// `expected_pending` pins the pending total the operator priced against;
    /// `None` accepts whatever is pending.
    fn settle(
        &self,
        caller: Address,
        expected_pending: Option<U256>,
        redeem_ids: &[RequestId],
    ) -> Result<SettlementReport, VaultError>;

    /// Settles one matured request. Permissionless.
    fn settle_matured_redeem(&self, caller: Address, request_id: RequestId)
        -> Result<U256, VaultError>;

    // -------------------------------------------------------------------------
    // Shares
    // -------------------------------------------------------------------------

    /// Moves `shares` from `caller` to `to`.
    fn transfer_shares(&self, caller: Address, to: Address, shares: U256)
        -> Result<(), VaultError>;

    // -------------------------------------------------------------------------
    // Administration
    // -------------------------------------------------------------------------

    /// Sets the premium rate. Premium accrued at the old rate is extracted
    /// first.
    fn set_premium_rate(&self, caller: Address, rate_bps: u64) -> Result<(), VaultError>;

    /// Sets the premium rate cap.
    fn set_premium_rate_cap(&self, caller: Address, cap_bps: u64) -> Result<(), VaultError>;

    /// Sets the premium collector.
    fn set_premium_collector(&self, caller: Address, collector: Address)
        -> Result<(), VaultError>;

    /// Sets the minimum deposit request value (`0` disables).
    fn set_minimum_request_assets(&self, caller: Address, minimum: U256)
        -> Result<(), VaultError>;

    /// Halts every mutating entry point except `resume`.
    fn halt(&self, caller: Address) -> Result<(), VaultError>;

    /// Lifts the halt.
    fn resume(&self, caller: Address) -> Result<(), VaultError>;

    // -------------------------------------------------------------------------
    // Views
    // -------------------------------------------------------------------------

    /// Settled, unreserved assets.
    fn total_assets(&self) -> Result<U256, VaultError>;

    /// Total share supply.
    fn total_supply(&self) -> U256;

    /// Share balance of `account`.
    fn share_balance_of(&self, account: Address) -> U256;

    /// Shares worth `assets`, rounded down.
    fn convert_to_shares(&self, assets: U256) -> Result<U256, VaultError>;

    /// Assets worth `shares`, rounded down.
    fn convert_to_assets(&self, shares: U256) -> Result<U256, VaultError>;

    /// Assets still waiting for the controller's epoch to close.
    fn pending_deposit_request(&self, controller: Address) -> Result<U256, VaultError>;

    /// Settled deposit shares the controller can claim.
    fn claimable_deposit_request(&self, controller: Address) -> Result<U256, VaultError>;

    /// Largest `assets` accepted by [`deposit`](Self::deposit).
    fn max_deposit(&self, controller: Address) -> Result<U256, VaultError>;

    /// Largest `shares` accepted by [`mint`](Self::mint).
    fn max_mint(&self, controller: Address) -> Result<U256, VaultError>;

    /// Largest `assets` accepted by [`withdraw`](Self::withdraw).
    fn max_withdraw(&self, controller: Address) -> U256;

    /// Largest `shares` accepted by [`redeem`](Self::redeem).
    fn max_redeem(&self, controller: Address) -> U256;

    /// Shares escrowed in the controller's unsettled requests.
    fn pending_redeem_request(&self, controller: Address) -> U256;

    /// `(shares, assets)` settled and not yet claimed.
    fn claimable_redeem_request(&self, controller: Address) -> (U256, U256);

    /// One redemption request.
    fn redeem_request(&self, request_id: RequestId) -> Option<RedeemRequest>;

    /// Maturity status of one request. Available while halted.
    fn redeem_maturity(&self, request_id: RequestId) -> Option<RedeemMaturity>;

    /// Snapshot fixed for a closed epoch.
    fn epoch_allocation(&self, epoch: Epoch) -> Option<EpochAllocation>;

    /// Current (open) epoch.
    fn current_epoch(&self) -> Epoch;

    /// Copy of the vault-wide state.
    fn global_state(&self) -> GlobalState;

    /// Evaluates every accounting invariant against the committed state and
    /// the live token balance.
    fn check_invariants(&self) -> InvariantCheckResult;
}
