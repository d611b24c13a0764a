//! # Driven Ports (SPI - Outbound)
//!
//! Interfaces the settlement engine depends on. Adapters implement these
//! traits to provide:
//! - The asset ledger (wrapped-pool share token)
//! - The wrapped pool's conversion query
//! - Capability checks
//! - The clock
//! - The notification sink

use crate::domain::value_objects::{Address, Timestamp, U256};
use crate::errors::{PoolError, TokenError};
use crate::events::VaultEvent;
use serde::{Deserialize, Serialize};

// =============================================================================
// ASSET LEDGER
// =============================================================================

/// Ledger of the asset the vault accepts (the wrapped pool's share).
///
/// ## Working copy semantics
///
/// The engine keeps a committed ledger and a working ledger. Each operation
/// runs against the working one; afterwards the engine asks it which
/// balances moved ([`drain_touched`](Self::drain_touched)) and copies only
/// those accounts across ([`copy_balances`](Self::copy_balances)): into the
/// committed ledger on success, back from it on failure.
///
/// A `clone()` must be an independent copy of the balances. The engine
/// clones only at construction and after an operation panicked.
pub trait AssetToken: Clone + Send + Sync {
    /// Balance of `account`.
    fn balance_of(&self, account: Address) -> U256;

    /// Moves `amount` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Any `TokenError`; the engine aborts the operation.
    fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<(), TokenError>;

    /// Accounts whose balance may have changed since the previous call.
    /// Clears the record.
    fn drain_touched(&mut self) -> Vec<Address>;

    /// Sets each of `accounts` to its balance on `source`.
    fn copy_balances(&mut self, source: &Self, accounts: &[Address]);
}

// =============================================================================
// WRAPPED POOL
// =============================================================================

/// Conversion query of the wrapped yield-bearing pool.
///
/// The vault's deposit unit is the pool's share, so the minimum request floor
/// (denominated in the pool's underlying asset) is checked through this rate.
pub trait WrappedPool: Send + Sync {
    /// Underlying assets represented by `shares` pool shares.
    fn convert_to_assets(&self, shares: U256) -> Result<U256, PoolError>;
}

// =============================================================================
// ACCESS POLICY
// =============================================================================

/// Disjoint capabilities gating privileged entry points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Rate, collector and minimum updates.
    Configure,
    /// Batch settlement.
    Settle,
    /// Halt and resume.
    Emergency,
    /// Top-level ownership (rate cap).
    Owner,
}

/// Capability check injected into the engine. The engine performs no identity
/// logic of its own.
pub trait AccessPolicy: Send + Sync {
    /// Returns true if `caller` holds `capability`.
    fn has_capability(&self, caller: Address, capability: Capability) -> bool;
}

// =============================================================================
// TIME SOURCE
// =============================================================================

/// Clock read once at the start of every operation.
///
/// Must be non-decreasing.
pub trait TimeSource: Send + Sync {
    /// Returns the current time in seconds.
    fn now(&self) -> Timestamp;
}

// =============================================================================
// EVENT SINK
// =============================================================================

/// Receives every notification of a committed operation, in order.
///
/// Never called for operations that failed.
pub trait EventSink: Send + Sync {
    /// Publishes one notification.
    fn publish(&self, event: &VaultEvent);
}

// =============================================================================
// TESTS
// =============================================================================
