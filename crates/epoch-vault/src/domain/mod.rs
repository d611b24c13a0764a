//! # Domain Layer (Inner Hexagon)
//!
//! Persisted records, pure arithmetic and invariant checks.
//! NO I/O, NO clocks, NO token movements.

pub mod entities;
pub mod invariants;
pub mod services;
pub mod share_ledger;
pub mod storage;
pub mod value_objects;

pub use entities::*;
pub use invariants::*;
pub use services::*;
pub use share_ledger::*;
pub use storage::*;
pub use value_objects::*;
