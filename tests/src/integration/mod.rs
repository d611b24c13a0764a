//! End-to-end tests through the public `VaultApi`.

pub mod invariants;
