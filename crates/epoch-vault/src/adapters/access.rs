//! Static capability table.

use crate::domain::value_objects::Address;
use crate::ports::outbound::{AccessPolicy, Capability};
use std::collections::HashSet;

/// Grants fixed at construction time.
#[derive(Clone, Debug, Default)]
pub struct StaticAccessPolicy {
    grants: HashSet<(Address, Capability)>,
}

impl StaticAccessPolicy {
    /// Creates a policy with no grants.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a grant.
    #[must_use]
    pub fn grant(mut self, account: Address, capability: Capability) -> Self {
        self.grants.insert((account, capability));
        self
    }

    /// Grants every capability to `account`.
    #[must_use]
    pub fn grant_all(self, account: Address) -> Self {
        [
            Capability::Configure,
            Capability::Settle,
            Capability::Emergency,
            Capability::Owner,
        ]
        .into_iter()
        .fold(self, |policy, capability| policy.grant(account, capability))
    }
}

impl AccessPolicy for StaticAccessPolicy {
    fn has_capability(&self, caller: Address, capability: Capability) -> bool {
        self.grants.contains(&(caller, capability))
    }
}
