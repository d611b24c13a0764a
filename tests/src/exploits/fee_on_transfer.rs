//! # Non-Standard Transfer Semantics
//!
//! ## Attack Vector
//!
//! An asset that skims a fee on every transfer credits the vault with less
//! than requested. Booking the requested amount would let early claimers
//! drain assets that never arrived.
//!
//! ## Expected Defense
//!
//! `request_deposit` measures the vault's balance delta and aborts with
//! `UnsupportedAsset` when it differs from the requested amount. Every
//! balance the transfer touched, the fee account included, is restored.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use epoch_vault::errors::TokenError;
    use epoch_vault::prelude::*;

    const FEE_SINK: Address = Address([0xFE; 20]);

    /// Ledger that burns `fee_bps` of every transfer into a fee account.
    #[derive(Clone, Debug)]
    struct SkimmingToken {
        ledger: InMemoryAssetToken,
        fee_bps: u64,
    }

    impl AssetToken for SkimmingToken {
        fn balance_of(&self, account: Address) -> U256 {
            self.ledger.balance_of(account)
        }

        fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<(), TokenError> {
            let fee = amount * U256::from(self.fee_bps) / U256::from(10_000);
            self.ledger.transfer(from, to, amount - fee)?;
            if !fee.is_zero() {
                self.ledger.transfer(from, FEE_SINK, fee)?;
            }
            Ok(())
        }

        fn drain_touched(&mut self) -> Vec<Address> {
            self.ledger.drain_touched()
        }

        fn copy_balances(&mut self, source: &Self, accounts: &[Address]) {
            self.ledger.copy_balances(&source.ledger, accounts);
        }
    }

    fn skimming_vault(fee_bps: u64) -> TestVault<SkimmingToken> {
        let ledger = InMemoryAssetToken::new().with_balance(ALICE, u(STARTING_BALANCE));
        VaultBuilder::new().build_with(SkimmingToken { ledger, fee_bps })
    }

    #[test]
    fn test_fee_on_transfer_rejected() {
        let tv = skimming_vault(100);
        let before = tv.vault.snapshot().unwrap();

        assert_eq!(
            tv.request_deposit(ALICE, 1_000),
            Err(VaultError::UnsupportedAsset {
                expected: u(1_000),
                observed: u(990),
            })
        );
        assert_eq!(tv.vault.snapshot().unwrap(), before);
        assert_eq!(tv.assets_of(ALICE), u(STARTING_BALANCE));
        assert_eq!(tv.assets_of(VAULT), U256::zero());
        assert_eq!(tv.assets_of(FEE_SINK), U256::zero());
        assert!(tv.sink.events().is_empty());
    }

    #[test]
    fn test_fee_rounding_to_zero_is_accepted() {
        // 99 * 1% floors to 0: the transfer is exact
        let tv = skimming_vault(100);
        tv.request_deposit(ALICE, 99).unwrap();
        assert_eq!(tv.vault.pending_deposit_request(ALICE).unwrap(), u(99));
        tv.assert_invariants();
    }

    #[test]
    fn test_fee_free_configuration_behaves_normally() {
        let tv = skimming_vault(0);
        let shares = tv.onboard(ALICE, 5_000);
        assert_eq!(shares, u(5_000));
        tv.assert_invariants();
    }
}
