//! # Share Ledger
//!
//! Fungible balances of the vault's own shares. The vault address doubles as
//! the holding bucket for pre-minted deposit shares and escrowed redemptions.

use crate::domain::invariants::InvariantViolation;
use crate::domain::services::{add, sub};
use crate::domain::value_objects::{Address, U256};
use crate::errors::VaultError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Balances and total supply.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLedger {
    balances: BTreeMap<Address, U256>,
    total_supply: U256,
}

impl ShareLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total shares outstanding, including the holding bucket.
    #[must_use]
    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    /// Balance of `account`.
    #[must_use]
    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    /// Number of accounts with a non-zero balance.
    #[must_use]
    pub fn holders(&self) -> usize {
        self.balances.len()
    }

    /// Creates `amount` new shares for `to`.
    pub fn mint(&mut self, to: Address, amount: U256) -> Result<(), VaultError> {
        self.total_supply = add(self.total_supply, amount, "share supply")?;
        let balance = add(self.balance_of(to), amount, "share balance")?;
        self.set_balance(to, balance);
        Ok(())
    }

    /// Destroys `amount` shares held by `from`.
    pub fn burn(&mut self, from: Address, amount: U256) -> Result<(), VaultError> {
        let balance = self.debit(from, amount)?;
        self.total_supply = sub(self.total_supply, amount, "share supply")?;
        self.set_balance(from, balance);
        Ok(())
    }

    /// Moves `amount` shares from `from` to `to`.
    pub fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<(), VaultError> {
        let from_balance = self.debit(from, amount)?;
        self.set_balance(from, from_balance);
        let to_balance = add(self.balance_of(to), amount, "share balance")?;
        self.set_balance(to, to_balance);
        Ok(())
    }

    fn debit(&self, from: Address, amount: U256) -> Result<U256, VaultError> {
        let available = self.balance_of(from);
        available
            .checked_sub(amount)
            .ok_or(VaultError::InsufficientShares {
                required: amount,
                available,
            })
    }

    fn set_balance(&mut self, account: Address, balance: U256) {
        if balance.is_zero() {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, balance);
        }
    }

    /// Sets each of `accounts` to its balance on `source` and takes over its
    /// total supply. `accounts` must cover every balance that differs.
    pub fn copy_balances<'a>(
        &mut self,
        source: &ShareLedger,
        accounts: impl IntoIterator<Item = &'a Address>,
    ) {
        for account in accounts {
            self.set_balance(*account, source.balance_of(*account));
        }
        self.total_supply = source.total_supply;
    }

    /// Sum of all balances. Must always equal `total_supply`.
    pub fn sum_of_balances(&self) -> Result<U256, InvariantViolation> {
        self.balances
            .values()
            .try_fold(U256::zero(), |acc, b| add(acc, *b, "balance sum"))
    }
}
