//! # Error Types
//!
//! All error types for the settlement engine.
//!
//! Every `VaultError` belongs to exactly one [`FaultTier`]. Validation and
//! precondition faults are recoverable by the caller; invariant faults mean a
//! defect upstream and are never tolerated.

use crate::domain::invariants::InvariantViolation;
use crate::domain::storage::StorageCodecError;
use crate::domain::value_objects::{Address, RequestId, Timestamp, U256};
use crate::ports::outbound::Capability;
use thiserror::Error;

// =============================================================================
// VAULT ERRORS
// =============================================================================

/// Errors returned by every vault operation. A returned error always means the
/// operation left no trace in the committed state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VaultError {
    // -------------------------------------------------------------------------
    // Tier 1: input validation
    // -------------------------------------------------------------------------
    /// Amount argument was zero.
    #[error("amount must be non-zero")]
    ZeroAmount,

    /// Address argument was the zero address.
    #[error("zero address not allowed")]
    ZeroAddress,

    /// Address argument pointed back at the vault itself.
    #[error("address {0} refers to the vault itself")]
    SelfReferentialAddress(Address),

    /// Caller, controller, owner and receiver must all be the same account.
    #[error("identity mismatch: caller {caller} cannot act for {counterparty}")]
    IdentityMismatch {
        /// Account that called.
        caller: Address,
        /// First controller, owner or receiver that differs from the caller.
        counterparty: Address,
    },

    /// Deposit value (in wrapped-pool assets) below the configured floor.
    #[error("request value {value} below minimum {minimum}")]
    BelowMinimum {
        /// Request value in pool assets.
        value: U256,
        /// Configured floor.
        minimum: U256,
    },

    /// No redemption request with this id exists.
    #[error("unknown redeem request: {0}")]
    UnknownRedeemRequest(RequestId),

    /// Redemption request was already settled.
    #[error("redeem request {0} already settled")]
    RedeemRequestSettled(RequestId),

    /// Same request id listed twice in one batch.
    #[error("duplicate redeem request {0} in settlement batch")]
    DuplicateRedeemRequest(RequestId),

    /// Request belongs to another controller.
    #[error("redeem request {request_id} not owned by {controller}")]
    ForeignRedeemRequest {
        /// Request referenced.
        request_id: RequestId,
        /// Controller that is not its owner.
        controller: Address,
    },

    /// Premium rate above the configured cap.
    #[error("premium rate {rate} bps exceeds cap {cap} bps")]
    RateAboveCap {
        /// Requested rate.
        rate: u64,
        /// Cap in force.
        cap: u64,
    },

    /// Premium rate cap above the global cap, or below the current rate.
    #[error("premium rate cap {cap} bps outside [{min}, {max}] bps")]
    CapOutOfRange {
        /// Requested cap.
        cap: u64,
        /// Current rate, the lowest acceptable cap.
        min: u64,
        /// Global cap.
        max: u64,
    },

    /// Engine configuration rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Persisted record could not be encoded or decoded.
    #[error("storage codec error: {0}")]
    Storage(#[from] StorageCodecError),

    // -------------------------------------------------------------------------
    // Tier 2: state preconditions
    // -------------------------------------------------------------------------
    /// Controller has nothing pending in the current epoch.
    #[error("no pending deposit for {0}")]
    NoPendingDeposit(Address),

    /// Controller has no claimable deposit shares.
    #[error("no claimable deposit for {0}")]
    NoClaimableDeposit(Address),

    /// Controller has no claimable redemption.
    #[error("no claimable redemption for {0}")]
    NoClaimableRedeem(Address),

    /// Requested claim exceeds the claimable balance.
    #[error("insufficient claimable balance: requested {requested}, available {available}")]
    InsufficientClaimable {
        /// Amount asked for.
        requested: U256,
        /// Amount claimable.
        available: U256,
    },

    /// Share balance too small for a transfer or redemption request.
    #[error("insufficient shares: required {required}, available {available}")]
    InsufficientShares {
        /// Shares needed.
        required: U256,
        /// Shares held.
        available: U256,
    },

    /// Request has not reached its maturity time.
    #[error("redeem request {request_id} matures at {matures_at}, now {now}")]
    NotMatured {
        /// Request referenced.
        request_id: RequestId,
        /// Time it becomes settleable.
        matures_at: Timestamp,
        /// Clock reading of the call.
        now: Timestamp,
    },

    /// Batch settlement pinned a pending total that no longer holds.
    #[error("pending assets mismatch: expected {expected}, actual {actual}")]
    PendingMismatch {
        /// Pinned value.
        expected: U256,
        /// Pending assets at settlement.
        actual: U256,
    },

    /// Caller lacks the capability for this entry point.
    #[error("unauthorized: {caller} lacks {capability:?}")]
    Unauthorized {
        /// Account that called.
        caller: Address,
        /// Capability required.
        capability: Capability,
    },

    /// Vault is halted.
    #[error("vault is halted")]
    Halted,

    /// Vault is not halted (resume without halt).
    #[error("vault is not halted")]
    NotHalted,

    /// Nested entry while another operation holds the latch.
    #[error("reentrant call rejected")]
    Reentrancy,

    /// Asset transfer moved a different amount than requested.
    #[error("unsupported asset: expected balance delta {expected}, observed {observed}")]
    UnsupportedAsset {
        /// Amount transferred.
        expected: U256,
        /// Growth of the vault's balance.
        observed: U256,
    },

    /// Wrapped pool lacks the conversion query.
    #[error("unsupported wrapped pool: {0}")]
    UnsupportedPool(String),

    /// Asset ledger fault.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// Wrapped pool fault.
    #[error("pool error: {0}")]
    Pool(#[from] PoolError),

    // -------------------------------------------------------------------------
    // Tier 3: invariant violations
    // -------------------------------------------------------------------------
    /// Internal invariant violated. Indicates a defect, never a user error.
    #[error("internal invariant violated: {0}")]
    Invariant(InvariantViolation),
}

/// Error classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultTier {
    /// Bad input; fix the arguments.
    Validation,
    /// Expected state condition; retry after settlement, maturity, etc.
    Precondition,
    /// Programming or configuration defect. Fatal.
    Invariant,
}

impl VaultError {
    /// Returns the tier this error belongs to.
    #[must_use]
    pub fn tier(&self) -> FaultTier {
        match self {
            Self::ZeroAmount
            | Self::ZeroAddress
            | Self::SelfReferentialAddress(_)
            | Self::IdentityMismatch { .. }
            | Self::BelowMinimum { .. }
            | Self::UnknownRedeemRequest(_)
            | Self::RedeemRequestSettled(_)
            | Self::DuplicateRedeemRequest(_)
            | Self::ForeignRedeemRequest { .. }
            | Self::RateAboveCap { .. }
            | Self::CapOutOfRange { .. }
            | Self::InvalidConfig(_)
            | Self::Storage(_) => FaultTier::Validation,
            Self::Invariant(_) => FaultTier::Invariant,
            _ => FaultTier::Precondition,
        }
    }

    /// Returns true for invariant violations.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.tier() == FaultTier::Invariant
    }
}

impl From<InvariantViolation> for VaultError {
    fn from(violation: InvariantViolation) -> Self {
        Self::Invariant(violation)
    }
}

// =============================================================================
// PORT ERRORS
// =============================================================================

/// Errors from the asset ledger adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Sender balance too small.
    #[error("insufficient balance: {account} has {available}, needs {required}")]
    InsufficientBalance {
        /// Sender.
        account: Address,
        /// Amount to move.
        required: U256,
        /// Sender's balance.
        available: U256,
    },

    /// Transfer rejected by the ledger.
    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// Errors from the wrapped pool adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Pool does not implement the conversion query.
    #[error("conversion query unavailable")]
    ConversionUnavailable,

    /// Conversion overflowed.
    #[error("conversion overflow")]
    Overflow,
}

// =============================================================================
// TESTS
// =============================================================================
