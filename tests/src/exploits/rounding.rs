//! # Dust Extraction Through Rounding
//!
//! ## Attack Vector
//!
//! After premium moves the share price off 1:1, every conversion rounds. An
//! attacker splits claims into the smallest possible pieces hoping each
//! piece rounds in their favor.
//!
//! ## Expected Defense
//!
//! Claims by shares round assets down, claims by assets round shares up, and
//! the final claim pays exactly what is left of the fixed reservation. Many
//! small claims can never beat one large claim.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use epoch_vault::prelude::*;

    /// Alice and Mallory hold 1000 shares each; a year at 10% leaves 1800
    /// assets behind 2000 shares. Mallory's redemption reserves 900.
    fn priced_vault() -> TestVault<InMemoryAssetToken> {
        let tv = VaultBuilder::new().rate(1_000).build();
        tv.request_deposit(ALICE, 1_000).unwrap();
        tv.request_deposit(MALLORY, 1_000).unwrap();
        tv.settle();
        tv.claim_all_shares(ALICE);
        tv.claim_all_shares(MALLORY);

        tv.advance(YEAR);
        let id = tv.request_redeem(MALLORY, u(1_000)).unwrap();
        let report = tv.settle_with(&[id]);
        assert_eq!(report.premium, u(200));
        assert_eq!(report.redemptions, vec![(id, u(900))]);
        tv
    }

    #[test]
    fn test_share_dust_claims_sum_to_reservation() {
        let tv = priced_vault();
        let before = tv.assets_of(MALLORY);

        let mut received = U256::zero();
        for _ in 0..1_000 {
            received += tv.vault.redeem(MALLORY, u(1), MALLORY, MALLORY).unwrap();
        }
        assert_eq!(received, u(900));
        assert_eq!(tv.assets_of(MALLORY) - before, u(900));
        assert_eq!(tv.vault.max_redeem(MALLORY), U256::zero());
        // Alice is untouched
        assert_eq!(tv.vault.convert_to_assets(u(1_000)).unwrap(), u(900));
        tv.assert_invariants();
    }

    #[test]
    fn test_asset_dust_claims_overpay_in_shares() {
        let tv = priced_vault();

        let mut shares_spent = U256::zero();
        for _ in 0..10 {
            shares_spent += tv.vault.withdraw(MALLORY, u(1), MALLORY, MALLORY).unwrap();
        }
        // 10 assets are worth 11.1 shares; rounding up charges at least that
        assert!(shares_spent * u(900) >= u(10) * u(1_000));
        let (shares_left, assets_left) = tv.vault.claimable_redeem_request(MALLORY);
        assert_eq!(assets_left, u(890));
        assert_eq!(shares_left, u(1_000) - shares_spent);
        tv.assert_invariants();
    }

    #[test]
    fn test_deposit_dust_claims_never_exceed_allocation() {
        let tv = VaultBuilder::new().rate(1_000).build();
        tv.onboard(ALICE, 1_000);
        tv.advance(YEAR);
        tv.request_deposit(MALLORY, 7).unwrap();
        tv.settle();

        let allocated = tv.vault.max_mint(MALLORY).unwrap();
        let mut claimed = U256::zero();
        while let Ok(shares) = tv.vault.deposit(MALLORY, u(1), MALLORY, MALLORY) {
            claimed += shares;
        }
        assert!(claimed <= allocated);
        assert_eq!(tv.vault.share_balance_of(MALLORY), claimed);
        tv.assert_invariants();
    }

    #[test]
    fn test_mint_charges_rounded_up_assets() {
        let tv = VaultBuilder::new().rate(1_000).build();
        tv.onboard(ALICE, 1_000);
        tv.advance(YEAR);
        tv.request_deposit(MALLORY, 9).unwrap();
        tv.settle();

        // 9 assets at 900 / 1000 buy 10 shares; one share prices at 0.9 -> 1
        assert_eq!(tv.vault.max_mint(MALLORY).unwrap(), u(10));
        assert_eq!(tv.vault.mint(MALLORY, u(1), MALLORY, MALLORY).unwrap(), u(1));
    }
}
