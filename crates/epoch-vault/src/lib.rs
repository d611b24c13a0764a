//! # Epoch Settlement Engine
//!
//! **Crate:** `epoch-vault`
//! **Architecture:** Hexagonal (domain / ports / adapters)
//! **Status:** Production-Ready
//!
//! ## Purpose
//!
//! Accounting core of a wrapper vault over a yield-bearing pool. Deposits and
//! redemptions are asynchronous: callers *request*, an operator *settles* the
//! epoch at a fixed exchange-rate snapshot, and callers *claim* afterwards. A
//! time-based premium is streamed out of the settled pool to a collector.
//!
//! ```text
//!  request_deposit ──► [PENDING] ──settle──► [CLAIMABLE SHARES] ──deposit/mint──► holder
//!                          │
//!                          └── cancel_deposit (same epoch only)
//!
//!  request_redeem ──► [ESCROWED] ──settle / matured──► [RESERVED ASSETS] ──redeem/withdraw──► holder
//!                          │
//!                          └── cancel_redeem (until settled)
//! ```
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | `total_supply >= total_assets()` | `accounting/` floor rounding, `domain/invariants.rs` |
//! | Reserve covered by settled assets | `accounting/redeem.rs` - `settle_one()` |
//! | Reserve counters equal account sums | `accounting/redeem.rs` - `release()` |
//! | Closed epochs with deposits have an allocation | `accounting/settlement.rs` - `settle_batch()` |
//! | Claimable deposit views within `total_assets()` | `accounting/deposit.rs` - `preview_sync()` |
//! | Donations never move pricing | `accounting/exchange.rs` - tracked assets only |
//!
//! ## Operation Envelope
//!
//! | Stage | Where | Effect |
//! |-------|-------|--------|
//! | Latch | `service.rs` - `enter()` | Nested entries fail with `Reentrancy` |
//! | Halt gate | `service.rs` - `try_execute()` | Everything but `resume` fails with `Halted` |
//! | Working copy | `service.rs` - `try_execute()` | Mutated in place; written keys copied to the committed copy on `Ok`, back from it on `Err` |
//! | Publication | `service.rs` - `try_execute()` | Events published after commit only |
//!
//! ## Outbound Dependencies
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | `AssetToken` | Ledger of the accepted asset (the pool's share) |
//! | `WrappedPool` | Conversion query for the minimum request floor |
//! | `AccessPolicy` | Capability checks |
//! | `TimeSource` | Clock, read once per operation |
//! | `EventSink` | Committed notifications |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      OUTER LAYER                                │
//! │  adapters/ - in-memory ledger, fixed-rate pool, clocks, sinks  │
//! │  service.rs - SettlementVault (VaultApi implementation)        │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MIDDLE LAYER                               │
//! │  ports/inbound.rs  - VaultApi trait                            │
//! │  ports/outbound.rs - AssetToken, WrappedPool, AccessPolicy,    │
//! │                      TimeSource, EventSink                     │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      INNER LAYER                                │
//! │  accounting/ - exchange, premium, deposit, redeem, settlement  │
//! │  domain/entities.rs     - GlobalState, accounts, requests      │
//! │  domain/storage.rs      - VaultStorage persisted layout        │
//! │  domain/share_ledger.rs - vault share balances                 │
//! │  domain/services.rs     - 512-bit mul_div                      │
//! │  domain/invariants.rs   - invariant checks                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod accounting;
pub mod adapters;
pub mod config;
pub mod domain;
pub mod errors;
pub mod events;
pub mod ports;
pub mod service;

pub use accounting::{SettlementContext, SettlementReport};
pub use config::VaultConfig;
pub use domain::*;
pub use errors::{FaultTier, PoolError, TokenError, VaultError};
pub use events::{PremiumOutcome, VaultEvent};
pub use ports::*;
pub use service::{SettlementVault, VaultDeps, VaultInit};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::accounting::SettlementReport;
    pub use crate::adapters::{
        FixedRatePool, InMemoryAssetToken, ManualClock, RecordingEventSink, StaticAccessPolicy,
        SystemTimeSource, TracingEventSink,
    };
    pub use crate::config::VaultConfig;
    pub use crate::domain::{
        Address, Epoch, EpochAllocation, GlobalState, InvariantCheckResult, InvariantViolation,
        RedeemMaturity, RedeemRequest, RequestId, Rounding, Timestamp, VaultStorage, U256,
    };
    pub use crate::errors::{FaultTier, VaultError};
    pub use crate::events::{topics, PremiumOutcome, VaultEvent};
    pub use crate::ports::{
        AccessPolicy, AssetToken, Capability, EventSink, TimeSource, VaultApi, WrappedPool,
    };
    pub use crate::service::{SettlementVault, VaultDeps, VaultInit};
}
