//! # Test Fixtures
//!
//! A vault wired to in-memory adapters, a manual clock and a recording sink,
//! plus the actors every test uses.

use epoch_vault::prelude::*;
use std::sync::Arc;

// =============================================================================
// ACTORS & TIME
// =============================================================================

/// The vault's own account.
pub const VAULT: Address = Address([0xAA; 20]);
/// Holds every capability.
pub const OPERATOR: Address = Address([0x0F; 20]);
/// Premium recipient.
pub const COLLECTOR: Address = Address([0xC0; 20]);
/// Depositor.
pub const ALICE: Address = Address([0x01; 20]);
/// Depositor.
pub const BOB: Address = Address([0x02; 20]);
/// Depositor.
pub const CAROL: Address = Address([0x03; 20]);
/// Adversary.
pub const MALLORY: Address = Address([0x66; 20]);

/// Clock reading at construction.
pub const START: Timestamp = 1_700_000_000;
/// One day.
pub const DAY: u64 = 24 * 60 * 60;
/// One premium period.
pub const YEAR: u64 = 365 * DAY;

/// Asset balance every actor starts with.
pub const STARTING_BALANCE: u64 = 1_000_000;

/// Shorthand for `U256::from`.
pub fn u(value: u64) -> U256 {
    U256::from(value)
}

// =============================================================================
// BUILDER
// =============================================================================

/// Configures a [`TestVault`].
pub struct VaultBuilder {
    rate_bps: u64,
    cap_bps: u64,
    minimum: U256,
    pool: Arc<dyn WrappedPool>,
    config: VaultConfig,
}

impl Default for VaultBuilder {
    fn default() -> Self {
        Self {
            rate_bps: 0,
            cap_bps: 1_000,
            minimum: U256::zero(),
            pool: Arc::new(FixedRatePool::one_to_one()),
            config: VaultConfig::default(),
        }
    }
}

impl VaultBuilder {
    /// Default builder: zero premium, 10% cap, no minimum, 1:1 pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial premium rate.
    pub fn rate(mut self, rate_bps: u64) -> Self {
        self.rate_bps = rate_bps;
        self
    }

    /// Initial premium cap.
    pub fn cap(mut self, cap_bps: u64) -> Self {
        self.cap_bps = cap_bps;
        self
    }

    /// Minimum request value in pool assets.
    pub fn minimum(mut self, minimum: U256) -> Self {
        self.minimum = minimum;
        self
    }

    /// Wrapped pool used for the minimum check.
    pub fn pool(mut self, pool: impl WrappedPool + 'static) -> Self {
        self.pool = Arc::new(pool);
        self
    }

    /// Engine constants.
    pub fn config(mut self, config: VaultConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds a vault over an in-memory ledger that funds every actor.
    pub fn build(self) -> TestVault<InMemoryAssetToken> {
        let token = [ALICE, BOB, CAROL, MALLORY]
            .into_iter()
            .fold(InMemoryAssetToken::new(), |token, actor| {
                token.with_balance(actor, u(STARTING_BALANCE))
            });
        self.build_with(token)
    }

    /// Builds a vault over a caller-supplied ledger.
    pub fn build_with<T: AssetToken>(self, token: T) -> TestVault<T> {
        vault_telemetry::init_test_logging();
        let clock = Arc::new(ManualClock::new(START));
        let sink = Arc::new(RecordingEventSink::new());
        let deps = VaultDeps {
            pool: self.pool,
            access: Arc::new(StaticAccessPolicy::new().grant_all(OPERATOR)),
            clock: clock.clone(),
            events: sink.clone(),
        };
        let init = VaultInit {
            vault: VAULT,
            premium_collector: COLLECTOR,
            premium_rate_bps: self.rate_bps,
            premium_rate_cap_bps: self.cap_bps,
            minimum_request_assets: self.minimum,
        };
        let vault = SettlementVault::new(init, self.config, token, deps)
            .expect("fixture vault must build");
        TestVault {
            vault: Arc::new(vault),
            clock,
            sink,
        }
    }
}

// =============================================================================
// TEST VAULT
// =============================================================================

/// A vault plus handles on its clock and event sink.
pub struct TestVault<T: AssetToken> {
    /// The engine under test.
    pub vault: Arc<SettlementVault<T>>,
    /// Drives `now()`.
    pub clock: Arc<ManualClock>,
    /// Everything published so far.
    pub sink: Arc<RecordingEventSink>,
}

impl<T: AssetToken> TestVault<T> {
    /// Moves the clock forward.
    pub fn advance(&self, secs: u64) {
        self.clock.advance(secs);
    }

    /// Requests a deposit for `actor` acting on its own behalf.
    pub fn request_deposit(&self, actor: Address, assets: u64) -> Result<(), VaultError> {
        self.vault.request_deposit(actor, u(assets), actor, actor)
    }

    /// Settles the current epoch with no redemptions.
    pub fn settle(&self) -> SettlementReport {
        self.vault
            .settle(OPERATOR, None, &[])
            .expect("settlement must succeed")
    }

    /// Settles the current epoch and the given redemptions.
    pub fn settle_with(&self, ids: &[RequestId]) -> SettlementReport {
        self.vault
            .settle(OPERATOR, None, ids)
            .expect("settlement must succeed")
    }

    /// Claims every claimable deposit share of `actor`.
    pub fn claim_all_shares(&self, actor: Address) -> U256 {
        let shares = self
            .vault
            .max_mint(actor)
            .expect("max_mint view must succeed");
        if !shares.is_zero() {
            self.vault
                .mint(actor, shares, actor, actor)
                .expect("mint must succeed");
        }
        shares
    }

    /// Deposit, settle and claim in one go. Returns the shares received.
    pub fn onboard(&self, actor: Address, assets: u64) -> U256 {
        self.request_deposit(actor, assets)
            .expect("deposit request must succeed");
        self.settle();
        self.claim_all_shares(actor)
    }

    /// Requests redemption of `shares` for `actor`.
    pub fn request_redeem(&self, actor: Address, shares: U256) -> Result<RequestId, VaultError> {
        self.vault.request_redeem(actor, shares, actor, actor)
    }

    /// Asset balance of `account`.
    pub fn assets_of(&self, account: Address) -> U256 {
        self.vault.asset_balance_of(account)
    }

    /// Panics with the violation list if any invariant fails.
    pub fn assert_invariants(&self) {
        match self.vault.check_invariants() {
            InvariantCheckResult::Valid => {}
            InvariantCheckResult::Invalid(violations) => {
                panic!("invariants violated: {violations:?}")
            }
        }
        let supply = self.vault.total_supply();
        let assets = self.vault.total_assets().expect("total_assets");
        assert!(supply >= assets, "supply {supply} below assets {assets}");
    }
}
