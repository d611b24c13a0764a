//! In-memory asset ledger.

use crate::domain::value_objects::{Address, U256};
use crate::errors::TokenError;
use crate::ports::outbound::AssetToken;
use std::collections::{BTreeSet, HashMap};

/// Plain balance map. `clone()` is a deep copy, as the engine requires.
#[derive(Clone, Debug, Default)]
pub struct InMemoryAssetToken {
    balances: HashMap<Address, U256>,
    total_supply: U256,
    touched: BTreeSet<Address>,
}

impl InMemoryAssetToken {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style funding for fixtures.
    #[must_use]
    pub fn with_balance(mut self, account: Address, amount: U256) -> Self {
        self.mint(account, amount);
        self
    }

    /// Credits `amount` to `account` out of thin air.
    pub fn mint(&mut self, account: Address, amount: U256) {
        let balance = self.balances.entry(account).or_default();
        *balance = balance.saturating_add(amount);
        self.total_supply = self.total_supply.saturating_add(amount);
        self.touched.insert(account);
    }

    /// Sum of all balances.
    #[must_use]
    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }
}

impl AssetToken for InMemoryAssetToken {
    fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::Rejected("transfer to zero address".to_string()));
        }
        let available = self.balance_of(from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                account: from,
                required: amount,
                available,
            });
        }
        self.balances.insert(from, available - amount);
        let credited = self.balances.entry(to).or_default();
        *credited = credited.saturating_add(amount);
        self.touched.insert(from);
        self.touched.insert(to);
        Ok(())
    }

    fn drain_touched(&mut self) -> Vec<Address> {
        std::mem::take(&mut self.touched).into_iter().collect()
    }

    fn copy_balances(&mut self, source: &Self, accounts: &[Address]) {
        for account in accounts {
            let ours = self.balance_of(*account);
            let theirs = source.balance_of(*account);
            self.total_supply = self.total_supply.saturating_sub(ours).saturating_add(theirs);
            if theirs.is_zero() {
                self.balances.remove(account);
            } else {
                self.balances.insert(*account, theirs);
            }
        }
    }
}
