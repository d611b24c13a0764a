//! # Settlement Vault Service
//!
//! Wires the accounting components to the outbound ports and enforces the
//! operation envelope:
//!
//! ```text
//! enter latch ─► halt gate ─► run component(s) on working copy
//!                                        │
//!     Err ◄── copy write set committed ─► working ◄─┤
//!     Ok  ◄── copy write set working ─► committed,  │
//!             publish events                  ◄─────┘
//! ```
//!
//! Two copies of the record and the asset ledger are kept. Views read the
//! committed copy; operations mutate the working copy owned by the latch.
//! Either way only the keys the operation wrote and the balances the ledger
//! reports as touched are copied, so an operation costs what it touches, not
//! what the vault holds.
//!
//! The latch is a re-entrant mutex: other threads block on it, while a nested
//! call on the owning thread (a token callback) sees the busy flag set and is
//! rejected. An operation that panics leaves the working copy marked dirty;
//! the next holder rebuilds it from the committed copy.

use crate::accounting::context::SettlementContext;
use crate::accounting::settlement::{self, SettlementReport};
use crate::accounting::{deposit, premium, redeem};
use crate::config::VaultConfig;
use crate::domain::entities::{EpochAllocation, GlobalState, RedeemMaturity, RedeemRequest};
use crate::domain::invariants::{check_all_invariants, InvariantCheckResult, InvariantViolation};
use crate::domain::storage::VaultStorage;
use crate::domain::value_objects::{Address, Epoch, RequestId, Rounding, U256};
use crate::errors::{FaultTier, VaultError};
use crate::events::VaultEvent;
use crate::ports::inbound::VaultApi;
use crate::ports::outbound::{
    AccessPolicy, AssetToken, Capability, EventSink, TimeSource, WrappedPool,
};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};
use std::cell::{Cell, RefCell, RefMut};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

// =============================================================================
// CONSTRUCTION INPUTS
// =============================================================================

/// Shared collaborators injected into the vault.
#[derive(Clone)]
pub struct VaultDeps {
    /// Conversion query of the wrapped pool.
    pub pool: Arc<dyn WrappedPool>,
    /// Capability checks.
    pub access: Arc<dyn AccessPolicy>,
    /// Clock.
    pub clock: Arc<dyn TimeSource>,
    /// Notification sink.
    pub events: Arc<dyn EventSink>,
}

/// Initial parameters of a new vault.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VaultInit {
    /// The vault's own account.
    pub vault: Address,
    /// Recipient of extracted premium.
    pub premium_collector: Address,
    /// Initial premium rate.
    pub premium_rate_bps: u64,
    /// Initial premium rate cap.
    pub premium_rate_cap_bps: u64,
    /// Initial minimum deposit request value (`0` disables).
    pub minimum_request_assets: U256,
}

/// Whether an operation runs while halted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HaltGate {
    Blocked,
    Exempt,
}

/// One copy of the engine state.
#[derive(Clone)]
struct VaultInner<T> {
    storage: VaultStorage,
    token: T,
}

/// State owned by whoever holds the latch.
struct Latch<T> {
    busy: Cell<bool>,
    /// Set while an operation runs. Still set on entry means the previous
    /// holder unwound mid-operation.
    dirty: Cell<bool>,
    working: RefCell<VaultInner<T>>,
}

/// Resets the busy flag on every exit path.
struct LatchGuard<'a, T> {
    held: ReentrantMutexGuard<'a, Latch<T>>,
}

impl<T: AssetToken> LatchGuard<'_, T> {
    /// Borrows the working copy for one operation, rebuilding it from
    /// `committed` if the previous operation never finished.
    fn working(&self, committed: &RwLock<VaultInner<T>>) -> RefMut<'_, VaultInner<T>> {
        let mut working = self.held.working.borrow_mut();
        if self.held.dirty.replace(true) {
            warn!("working copy left dirty by an aborted operation, rebuilding");
            *working = committed.read().clone();
        }
        working
    }

    /// Marks the working copy as agreeing with the committed copy again.
    fn settle(&self) {
        self.held.dirty.set(false);
    }
}

impl<T> Drop for LatchGuard<'_, T> {
    fn drop(&mut self) {
        self.held.busy.set(false);
    }
}

// =============================================================================
// SERVICE
// =============================================================================

/// The settlement engine behind [`VaultApi`].
pub struct SettlementVault<T: AssetToken> {
    vault: Address,
    config: VaultConfig,
    deps: VaultDeps,
    state: RwLock<VaultInner<T>>,
    latch: ReentrantMutex<Latch<T>>,
}

impl<T: AssetToken> SettlementVault<T> {
    /// Creates a vault with empty ledgers.
    ///
    /// # Errors
    ///
    /// - `ZeroAddress` / `SelfReferentialAddress`: bad vault or collector
    /// - `RateAboveCap` / `CapOutOfRange`: inconsistent premium parameters
    /// - `InvalidConfig`: engine constants rejected
    /// - `UnsupportedPool`: the pool rejected the one-unit conversion check
    pub fn new(
        init: VaultInit,
        config: VaultConfig,
        token: T,
        deps: VaultDeps,
    ) -> Result<Self, VaultError> {
        let storage = VaultStorage::new(GlobalState {
            premium_rate_bps: init.premium_rate_bps,
            premium_rate_cap_bps: init.premium_rate_cap_bps,
            premium_collector: init.premium_collector,
            minimum_request_assets: init.minimum_request_assets,
            ..GlobalState::default()
        });
        Self::assemble(init.vault, storage, config, token, deps)
    }

    /// Rebuilds a vault from a record written by [`snapshot`](Self::snapshot).
    pub fn restore(
        bytes: &[u8],
        vault: Address,
        config: VaultConfig,
        token: T,
        deps: VaultDeps,
    ) -> Result<Self, VaultError> {
        let storage = VaultStorage::decode(bytes)?;
        Self::assemble(vault, storage, config, token, deps)
    }

    fn assemble(
        vault: Address,
        storage: VaultStorage,
        config: VaultConfig,
        mut token: T,
        deps: VaultDeps,
    ) -> Result<Self, VaultError> {
        config.validate()?;
        if vault.is_zero() {
            return Err(VaultError::ZeroAddress);
        }
        let global = &storage.global;
        validate_collector(vault, global.premium_collector)?;
        if global.premium_rate_cap_bps > config.global_rate_cap_bps {
            return Err(VaultError::CapOutOfRange {
                cap: global.premium_rate_cap_bps,
                min: global.premium_rate_bps,
                max: config.global_rate_cap_bps,
            });
        }
        if global.premium_rate_bps > global.premium_rate_cap_bps {
            return Err(VaultError::RateAboveCap {
                rate: global.premium_rate_bps,
                cap: global.premium_rate_cap_bps,
            });
        }
        deps.pool
            .convert_to_assets(U256::one())
            .map_err(|e| VaultError::UnsupportedPool(e.to_string()))?;

        info!(
            vault = %vault,
            epoch = global.current_epoch,
            rate_bps = global.premium_rate_bps,
            cap_bps = global.premium_rate_cap_bps,
            "settlement vault ready"
        );
        token.drain_touched();
        let working = VaultInner { storage, token };
        Ok(Self {
            vault,
            config,
            deps,
            state: RwLock::new(working.clone()),
            latch: ReentrantMutex::new(Latch {
                busy: Cell::new(false),
                dirty: Cell::new(false),
                working: RefCell::new(working),
            }),
        })
    }

    /// Encodes the committed record.
    pub fn snapshot(&self) -> Result<Vec<u8>, VaultError> {
        Ok(self.state.read().storage.encode()?)
    }

    /// The vault's own account.
    #[must_use]
    pub fn vault_address(&self) -> Address {
        self.vault
    }

    /// Engine constants.
    #[must_use]
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Asset balance of `account` on the committed ledger.
    #[must_use]
    pub fn asset_balance_of(&self, account: Address) -> U256 {
        self.state.read().token.balance_of(account)
    }

    /// Runs out-of-band activity (funding, donations) against the asset
    /// ledger. Serialized with vault operations.
    pub fn with_asset_ledger_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, VaultError> {
        let latch = self.enter()?;
        let mut working = latch.working(&self.state);
        let value = f(&mut working.token);
        let touched = working.token.drain_touched();
        self.state
            .write()
            .token
            .copy_balances(&working.token, &touched);
        latch.settle();
        Ok(value)
    }

    // -------------------------------------------------------------------------
    // Operation envelope
    // -------------------------------------------------------------------------

    fn enter(&self) -> Result<LatchGuard<'_, T>, VaultError> {
        let held = self.latch.lock();
        if held.busy.get() {
            return Err(VaultError::Reentrancy);
        }
        held.busy.set(true);
        Ok(LatchGuard { held })
    }

    fn authorize(&self, caller: Address, capability: Capability) -> Result<(), VaultError> {
        if self.deps.access.has_capability(caller, capability) {
            Ok(())
        } else {
            Err(VaultError::Unauthorized { caller, capability })
        }
    }

    /// Runs `op` on working copies and commits only on success.
    fn execute<R>(
        &self,
        operation: &'static str,
        gate: HaltGate,
        op: impl FnOnce(&mut SettlementContext<'_, T>) -> Result<R, VaultError>,
    ) -> Result<R, VaultError> {
        let result = self.try_execute(operation, gate, op);
        if let Err(e) = &result {
            match e.tier() {
                FaultTier::Invariant => {
                    error!(operation, error = %e, "invariant violated, operation rolled back")
                }
                tier => warn!(operation, error = %e, ?tier, "operation rejected"),
            }
        }
        result
    }

    fn try_execute<R>(
        &self,
        operation: &'static str,
        gate: HaltGate,
        op: impl FnOnce(&mut SettlementContext<'_, T>) -> Result<R, VaultError>,
    ) -> Result<R, VaultError> {
        let latch = self.enter()?;
        let mut working = latch.working(&self.state);
        let VaultInner { storage, token } = &mut *working;
        if gate == HaltGate::Blocked && storage.global.halted {
            latch.settle();
            return Err(VaultError::Halted);
        }

        let now = self.deps.clock.now();
        let mut ctx = SettlementContext::new(storage, token, &self.config, self.vault, now);
        let result = op(&mut ctx);
        let (writes, events) = ctx.into_parts();
        let touched = token.drain_touched();

        let value = match result {
            Ok(value) => value,
            Err(e) => {
                let committed = self.state.read();
                writes.copy(&committed.storage, storage);
                token.copy_balances(&committed.token, &touched);
                latch.settle();
                debug!(
                    operation,
                    keys = writes.len(),
                    balances = touched.len(),
                    "working copy restored"
                );
                return Err(e);
            }
        };

        {
            let mut committed = self.state.write();
            let committed = &mut *committed;
            writes.copy(storage, &mut committed.storage);
            committed.token.copy_balances(token, &touched);
        }
        latch.settle();
        info!(
            operation,
            events = events.len(),
            keys = writes.len(),
            balances = touched.len(),
            "committed"
        );
        for event in &events {
            self.deps.events.publish(event);
        }
        Ok(value)
    }

    fn view<R>(&self, f: impl FnOnce(&VaultStorage) -> R) -> R {
        f(&self.state.read().storage)
    }
}

/// Caller and every counterparty must be the same non-zero, non-vault account.
fn check_identity(vault: Address, caller: Address, parties: &[Address]) -> Result<(), VaultError> {
    if caller.is_zero() {
        return Err(VaultError::ZeroAddress);
    }
    if caller == vault {
        return Err(VaultError::SelfReferentialAddress(caller));
    }
    match parties.iter().find(|party| **party != caller) {
        Some(counterparty) => Err(VaultError::IdentityMismatch {
            caller,
            counterparty: *counterparty,
        }),
        None => Ok(()),
    }
}

fn validate_collector(vault: Address, collector: Address) -> Result<(), VaultError> {
    if collector.is_zero() {
        return Err(VaultError::ZeroAddress);
    }
    if collector == vault {
        return Err(VaultError::SelfReferentialAddress(collector));
    }
    Ok(())
}

// =============================================================================
// API
// =============================================================================

impl<T: AssetToken> VaultApi for SettlementVault<T> {
    #[instrument(skip(self))]
    fn request_deposit(
        &self,
        caller: Address,
        assets: U256,
        controller: Address,
        owner: Address,
    ) -> Result<(), VaultError> {
        self.execute("request_deposit", HaltGate::Blocked, |ctx| {
            check_identity(self.vault, caller, &[controller, owner])?;
            deposit::request(ctx, self.deps.pool.as_ref(), controller, assets)
        })
    }

    #[instrument(skip(self))]
    fn cancel_deposit(&self, caller: Address, controller: Address) -> Result<U256, VaultError> {
        self.execute("cancel_deposit", HaltGate::Blocked, |ctx| {
            check_identity(self.vault, caller, &[controller])?;
            deposit::cancel(ctx, controller)
        })
    }

    #[instrument(skip(self))]
    fn deposit(
        &self,
        caller: Address,
        assets: U256,
        receiver: Address,
        controller: Address,
    ) -> Result<U256, VaultError> {
        self.execute("deposit", HaltGate::Blocked, |ctx| {
            check_identity(self.vault, caller, &[receiver, controller])?;
            deposit::claim_by_assets(ctx, controller, assets)
        })
    }

    #[instrument(skip(self))]
    fn mint(
        &self,
        caller: Address,
        shares: U256,
        receiver: Address,
        controller: Address,
    ) -> Result<U256, VaultError> {
        self.execute("mint", HaltGate::Blocked, |ctx| {
            check_identity(self.vault, caller, &[receiver, controller])?;
            deposit::claim_by_shares(ctx, controller, shares)
        })
    }

    #[instrument(skip(self))]
    fn request_redeem(
        &self,
        caller: Address,
        shares: U256,
        controller: Address,
        owner: Address,
    ) -> Result<RequestId, VaultError> {
        self.execute("request_redeem", HaltGate::Blocked, |ctx| {
            check_identity(self.vault, caller, &[controller, owner])?;
            redeem::request(ctx, controller, shares)
        })
    }

    #[instrument(skip(self))]
    fn cancel_redeem(
        &self,
        caller: Address,
        request_id: RequestId,
        controller: Address,
    ) -> Result<U256, VaultError> {
        self.execute("cancel_redeem", HaltGate::Blocked, |ctx| {
            check_identity(self.vault, caller, &[controller])?;
            redeem::cancel(ctx, request_id, controller)
        })
    }

    #[instrument(skip(self))]
    fn redeem(
        &self,
        caller: Address,
        shares: U256,
        receiver: Address,
        controller: Address,
    ) -> Result<U256, VaultError> {
        self.execute("redeem", HaltGate::Blocked, |ctx| {
            check_identity(self.vault, caller, &[receiver, controller])?;
            redeem::claim_by_shares(ctx, controller, shares)
        })
    }

    #[instrument(skip(self))]
    fn withdraw(
        &self,
        caller: Address,
        assets: U256,
        receiver: Address,
        controller: Address,
    ) -> Result<U256, VaultError> {
        self.execute("withdraw", HaltGate::Blocked, |ctx| {
            check_identity(self.vault, caller, &[receiver, controller])?;
            redeem::claim_by_assets(ctx, controller, assets)
        })
    }

    #[instrument(skip(self))]
    fn settle(
        &self,
        caller: Address,
        expected_pending: Option<U256>,
        redeem_ids: &[RequestId],
    ) -> Result<SettlementReport, VaultError> {
        self.execute("settle", HaltGate::Blocked, |ctx| {
            self.authorize(caller, Capability::Settle)?;
            let report = settlement::settle_batch(ctx, expected_pending, redeem_ids)?;
            info!(
                epoch = report.closed_epoch,
                premium = %report.premium,
                deposit_assets = %report.deposit_assets,
                deposit_shares = %report.deposit_shares,
                redemptions = report.redemptions.len(),
                "epoch settled"
            );
            Ok(report)
        })
    }

    #[instrument(skip(self))]
    fn settle_matured_redeem(
        &self,
        caller: Address,
        request_id: RequestId,
    ) -> Result<U256, VaultError> {
        self.execute("settle_matured_redeem", HaltGate::Exempt, |ctx| {
            settlement::check_matured(ctx.storage(), ctx.config, request_id, ctx.now)?;
            if ctx.storage().global.halted {
                return Err(VaultError::Halted);
            }
            debug!(caller = %caller, request_id, "permissionless settlement");
            settlement::settle_matured(ctx, request_id)
        })
    }

    #[instrument(skip(self))]
    fn transfer_shares(&self, caller: Address, to: Address, shares: U256) -> Result<(), VaultError> {
        self.execute("transfer_shares", HaltGate::Blocked, |ctx| {
            if shares.is_zero() {
                return Err(VaultError::ZeroAmount);
            }
            if caller.is_zero() || to.is_zero() {
                return Err(VaultError::ZeroAddress);
            }
            if caller == ctx.vault || to == ctx.vault {
                return Err(VaultError::SelfReferentialAddress(ctx.vault));
            }
            ctx.transfer_shares(caller, to, shares)?;
            ctx.emit(VaultEvent::SharesTransferred {
                from: caller,
                to,
                shares,
            });
            Ok(())
        })
    }

    #[instrument(skip(self))]
    fn set_premium_rate(&self, caller: Address, rate_bps: u64) -> Result<(), VaultError> {
        self.execute("set_premium_rate", HaltGate::Blocked, |ctx| {
            self.authorize(caller, Capability::Configure)?;
            let cap = ctx.storage().global.premium_rate_cap_bps;
            if rate_bps > cap {
                return Err(VaultError::RateAboveCap {
                    rate: rate_bps,
                    cap,
                });
            }
            premium::extract(ctx)?;
            let old_bps = ctx.storage().global.premium_rate_bps;
            ctx.global_mut().premium_rate_bps = rate_bps;
            ctx.emit(VaultEvent::PremiumRateUpdated {
                old_bps,
                new_bps: rate_bps,
            });
            Ok(())
        })
    }

    #[instrument(skip(self))]
    fn set_premium_rate_cap(&self, caller: Address, cap_bps: u64) -> Result<(), VaultError> {
        self.execute("set_premium_rate_cap", HaltGate::Blocked, |ctx| {
            self.authorize(caller, Capability::Owner)?;
            let rate = ctx.storage().global.premium_rate_bps;
            let max = ctx.config.global_rate_cap_bps;
            if cap_bps < rate || cap_bps > max {
                return Err(VaultError::CapOutOfRange {
                    cap: cap_bps,
                    min: rate,
                    max,
                });
            }
            let old_bps = ctx.storage().global.premium_rate_cap_bps;
            ctx.global_mut().premium_rate_cap_bps = cap_bps;
            ctx.emit(VaultEvent::PremiumRateCapUpdated {
                old_bps,
                new_bps: cap_bps,
            });
            Ok(())
        })
    }

    #[instrument(skip(self))]
    fn set_premium_collector(&self, caller: Address, collector: Address) -> Result<(), VaultError> {
        self.execute("set_premium_collector", HaltGate::Blocked, |ctx| {
            self.authorize(caller, Capability::Configure)?;
            validate_collector(ctx.vault, collector)?;
            // Premium accrued so far belongs to the outgoing collector.
            premium::extract(ctx)?;
            let old = ctx.storage().global.premium_collector;
            ctx.global_mut().premium_collector = collector;
            ctx.emit(VaultEvent::PremiumCollectorUpdated {
                old,
                new: collector,
            });
            Ok(())
        })
    }

    #[instrument(skip(self))]
    fn set_minimum_request_assets(&self, caller: Address, minimum: U256) -> Result<(), VaultError> {
        self.execute("set_minimum_request_assets", HaltGate::Blocked, |ctx| {
            self.authorize(caller, Capability::Configure)?;
            let old = ctx.storage().global.minimum_request_assets;
            ctx.global_mut().minimum_request_assets = minimum;
            ctx.emit(VaultEvent::MinimumRequestUpdated { old, new: minimum });
            Ok(())
        })
    }

    #[instrument(skip(self))]
    fn halt(&self, caller: Address) -> Result<(), VaultError> {
        self.execute("halt", HaltGate::Blocked, |ctx| {
            self.authorize(caller, Capability::Emergency)?;
            ctx.global_mut().halted = true;
            ctx.emit(VaultEvent::Halted { by: caller });
            warn!(by = %caller, "vault halted");
            Ok(())
        })
    }

    #[instrument(skip(self))]
    fn resume(&self, caller: Address) -> Result<(), VaultError> {
        self.execute("resume", HaltGate::Exempt, |ctx| {
            self.authorize(caller, Capability::Emergency)?;
            if !ctx.storage().global.halted {
                return Err(VaultError::NotHalted);
            }
            ctx.global_mut().halted = false;
            ctx.emit(VaultEvent::Resumed { by: caller });
            info!(by = %caller, "vault resumed");
            Ok(())
        })
    }

    fn total_assets(&self) -> Result<U256, VaultError> {
        Ok(self.view(|storage| storage.total_assets())?)
    }

    fn total_supply(&self) -> U256 {
        self.view(|storage| storage.shares.total_supply())
    }

    fn share_balance_of(&self, account: Address) -> U256 {
        self.view(|storage| storage.shares.balance_of(account))
    }

    fn convert_to_shares(&self, assets: U256) -> Result<U256, VaultError> {
        Ok(self.view(|storage| storage.assets_to_shares(assets, Rounding::Floor))?)
    }

    fn convert_to_assets(&self, shares: U256) -> Result<U256, VaultError> {
        Ok(self.view(|storage| storage.shares_to_assets(shares, Rounding::Floor))?)
    }

    fn pending_deposit_request(&self, controller: Address) -> Result<U256, VaultError> {
        let account = self.view(|storage| storage.preview_sync(controller))?;
        Ok(account.pending_assets)
    }

    fn claimable_deposit_request(&self, controller: Address) -> Result<U256, VaultError> {
        let account = self.view(|storage| storage.preview_sync(controller))?;
        Ok(account.claimable_shares)
    }

    fn max_deposit(&self, controller: Address) -> Result<U256, VaultError> {
        let assets = self.view(|storage| -> Result<U256, InvariantViolation> {
            let shares = storage.preview_sync(controller)?.claimable_shares;
            storage.shares_to_assets(shares, Rounding::Floor)
        })?;
        Ok(assets)
    }

    fn max_mint(&self, controller: Address) -> Result<U256, VaultError> {
        self.claimable_deposit_request(controller)
    }

    fn max_withdraw(&self, controller: Address) -> U256 {
        self.claimable_redeem_request(controller).1
    }

    fn max_redeem(&self, controller: Address) -> U256 {
        self.claimable_redeem_request(controller).0
    }

    fn pending_redeem_request(&self, controller: Address) -> U256 {
        self.view(|storage| {
            storage
                .redeem_accounts
                .get(&controller)
                .map(|account| account.pending_shares)
                .unwrap_or_default()
        })
    }

    fn claimable_redeem_request(&self, controller: Address) -> (U256, U256) {
        self.view(|storage| {
            storage
                .redeem_accounts
                .get(&controller)
                .map(|account| (account.claimable_shares, account.claimable_assets))
                .unwrap_or_default()
        })
    }

    fn redeem_request(&self, request_id: RequestId) -> Option<RedeemRequest> {
        self.view(|storage| storage.redeem_requests.get(&request_id).cloned())
    }

    fn redeem_maturity(&self, request_id: RequestId) -> Option<RedeemMaturity> {
        let now = self.deps.clock.now();
        let delay = self.config.redeem_maturity_delay_secs;
        self.view(|storage| {
            storage
                .redeem_requests
                .get(&request_id)
                .map(|request| RedeemMaturity {
                    request_id,
                    matures_at: request.matures_at(delay),
                    matured: request.is_matured(now, delay),
                    settled: request.settled,
                })
        })
    }

    fn epoch_allocation(&self, epoch: Epoch) -> Option<EpochAllocation> {
        self.view(|storage| storage.epoch_allocations.get(&epoch).copied())
    }

    fn current_epoch(&self) -> Epoch {
        self.view(|storage| storage.global.current_epoch)
    }

    fn global_state(&self) -> GlobalState {
        self.view(|storage| storage.global.clone())
    }

    fn check_invariants(&self) -> InvariantCheckResult {
        let inner = self.state.read();
        let balance = inner.token.balance_of(self.vault);
        check_all_invariants(&inner.storage, balance)
    }
}

// =============================================================================
// TESTS
// =============================================================================
