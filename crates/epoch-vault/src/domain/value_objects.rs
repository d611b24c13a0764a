//! # Value Objects
//!
//! Immutable primitives shared by every accounting component.

use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export U256 from primitive-types for 256-bit amounts
pub use primitive_types::U256;

/// Seconds since the Unix epoch, as reported by the injected clock.
pub type Timestamp = u64;

/// Identifier of a redemption request. Allocated from a monotonic counter,
/// never reused, `0` is never a valid id.
pub type RequestId = u64;

/// Epoch number. Advances only on batch settlement.
pub type Epoch = u64;

/// Basis points denominator (1 bps = 1/10_000).
pub const BPS_DENOMINATOR: u64 = 10_000;

// =============================================================================
// ADDRESS (20 bytes)
// =============================================================================

/// A 20-byte account identity (controller, receiver, collector, vault).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address. Never a valid controller, receiver or collector.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Creates an address from a 20-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Creates an address whose every byte is `byte`. Handy for fixtures.
    #[must_use]
    pub const fn repeat_byte(byte: u8) -> Self {
        Self([byte; 20])
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns true if this is the zero address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "...")?;
        for byte in &self.0[18..] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

// =============================================================================
// ROUNDING
// =============================================================================

/// Rounding direction for every asset/share conversion.
///
/// Callers must always pick one. `Floor` is the default direction for anything
/// released to a claimant; `Ceil` is used when computing what a claimant must
/// give up for an exact requested amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rounding {
    /// Round toward zero.
    Floor,
    /// Round away from zero when there is a remainder.
    Ceil,
}

// =============================================================================
// TESTS
// =============================================================================
