//! # Reentrancy via Token Callbacks
//!
//! ## Attack Vector
//!
//! An asset with transfer hooks hands control back to the attacker in the
//! middle of a vault operation. The attacker calls back into the vault while
//! the outer operation's bookkeeping is half done.
//!
//! ## Expected Defense
//!
//! Every mutating entry point holds the operation latch. A nested call on the
//! same thread fails with `Reentrancy`; views stay available and report the
//! last committed state.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use epoch_vault::errors::TokenError;
    use epoch_vault::prelude::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, OnceLock, Weak};

    /// What the hook observed from inside the transfer.
    #[derive(Debug, Default)]
    struct Observed {
        nested_request: Option<Result<(), VaultError>>,
        nested_ledger: Option<Result<(), VaultError>>,
        nested_settle: Option<Result<SettlementReport, VaultError>>,
        committed_pending: Option<U256>,
    }

    #[derive(Default)]
    struct Hook {
        vault: OnceLock<Weak<SettlementVault<CallbackToken>>>,
        armed: AtomicBool,
        observed: Mutex<Observed>,
    }

    impl Hook {
        fn fire(&self) {
            if !self.armed.swap(false, Ordering::SeqCst) {
                return;
            }
            let Some(vault) = self.vault.get().and_then(Weak::upgrade) else {
                return;
            };
            let mut observed = self.observed.lock();
            observed.nested_request =
                Some(vault.request_deposit(MALLORY, u(1), MALLORY, MALLORY));
            observed.nested_ledger = Some(vault.with_asset_ledger_mut(|_| ()));
            observed.nested_settle = Some(vault.settle(OPERATOR, None, &[]));
            observed.committed_pending = Some(vault.global_state().pending_assets);
        }
    }

    /// Ledger that calls the hook before every transfer.
    #[derive(Clone)]
    struct CallbackToken {
        ledger: InMemoryAssetToken,
        hook: Arc<Hook>,
    }

    impl AssetToken for CallbackToken {
        fn balance_of(&self, account: Address) -> U256 {
            self.ledger.balance_of(account)
        }

        fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<(), TokenError> {
            self.hook.fire();
            self.ledger.transfer(from, to, amount)
        }

        fn drain_touched(&mut self) -> Vec<Address> {
            self.ledger.drain_touched()
        }

        fn copy_balances(&mut self, source: &Self, accounts: &[Address]) {
            self.ledger.copy_balances(&source.ledger, accounts);
        }
    }

    fn callback_vault() -> (TestVault<CallbackToken>, Arc<Hook>) {
        let hook = Arc::new(Hook::default());
        let ledger = InMemoryAssetToken::new()
            .with_balance(ALICE, u(STARTING_BALANCE))
            .with_balance(MALLORY, u(STARTING_BALANCE));
        let tv = VaultBuilder::new().build_with(CallbackToken {
            ledger,
            hook: Arc::clone(&hook),
        });
        hook.vault
            .set(Arc::downgrade(&tv.vault))
            .unwrap_or_else(|_| panic!("hook already bound"));
        (tv, hook)
    }

    #[test]
    fn test_nested_calls_rejected_during_pull() {
        let (tv, hook) = callback_vault();
        tv.request_deposit(ALICE, 100).unwrap();

        hook.armed.store(true, Ordering::SeqCst);
        tv.request_deposit(ALICE, 500).unwrap();

        let observed = hook.observed.lock();
        assert_eq!(observed.nested_request, Some(Err(VaultError::Reentrancy)));
        assert_eq!(observed.nested_ledger, Some(Err(VaultError::Reentrancy)));
        assert_eq!(observed.nested_settle, Some(Err(VaultError::Reentrancy)));
        // the view saw the last commit, not the half-applied request
        assert_eq!(observed.committed_pending, Some(u(100)));
        drop(observed);

        assert_eq!(tv.vault.pending_deposit_request(ALICE).unwrap(), u(600));
        assert_eq!(tv.vault.pending_deposit_request(MALLORY).unwrap(), U256::zero());
        tv.assert_invariants();
    }

    #[test]
    fn test_nested_calls_rejected_during_push() {
        let (tv, hook) = callback_vault();
        tv.onboard(ALICE, 1_000);
        let id = tv.request_redeem(ALICE, u(1_000)).unwrap();
        tv.settle_with(&[id]);

        hook.armed.store(true, Ordering::SeqCst);
        assert_eq!(tv.vault.redeem(ALICE, u(1_000), ALICE, ALICE).unwrap(), u(1_000));

        let observed = hook.observed.lock();
        assert_eq!(observed.nested_request, Some(Err(VaultError::Reentrancy)));
        assert_eq!(observed.nested_settle, Some(Err(VaultError::Reentrancy)));
        drop(observed);

        // one epoch from onboarding, one from the redemption batch
        assert_eq!(tv.vault.current_epoch(), 2);
        assert_eq!(tv.assets_of(ALICE), u(STARTING_BALANCE));
        tv.assert_invariants();
    }

    #[test]
    fn test_latch_released_after_failure() {
        let (tv, _hook) = callback_vault();
        assert!(tv.request_deposit(ALICE, STARTING_BALANCE + 1).is_err());
        tv.request_deposit(ALICE, 10).unwrap();
        assert_eq!(tv.vault.pending_deposit_request(ALICE).unwrap(), u(10));
    }
}
