//! Ports layer for the settlement engine.
//!
//! Defines the hexagonal architecture port traits:
//! - Inbound (Driving) ports: API exposed to callers
//! - Outbound (Driven) ports: asset ledger, wrapped pool, access policy,
//!   clock and event sink

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
