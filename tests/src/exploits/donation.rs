//! # Donation / Share Inflation Attack
//!
//! ## Attack Vector
//!
//! The first depositor mints a dust position, then transfers a large amount
//! straight to the vault account. If pricing read the live token balance,
//! every later depositor would receive shares rounded down to almost nothing.
//!
//! ## Expected Defense
//!
//! Pricing reads tracked assets only. A direct transfer raises the observable
//! balance but never `total_assets()`, so the attacker's donation is simply
//! lost.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use epoch_vault::prelude::*;

    fn donate(tv: &TestVault<InMemoryAssetToken>, from: Address, assets: u64) {
        tv.vault
            .with_asset_ledger_mut(|ledger| ledger.transfer(from, VAULT, u(assets)))
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_inflation_attack_fails() {
        let tv = VaultBuilder::new().build();

        // Attacker takes a 10-share position and inflates the balance
        let attacker_shares = tv.onboard(MALLORY, 10);
        assert_eq!(attacker_shares, u(10));
        donate(&tv, MALLORY, 100_000);

        // Victim deposits after the donation
        tv.request_deposit(ALICE, 10_000).unwrap();
        let report = tv.settle();
        assert_eq!(report.deposit_shares, u(10_000), "victim priced at 1:1");
        let victim_shares = tv.claim_all_shares(ALICE);
        assert_eq!(victim_shares, u(10_000));

        // Attacker redeems: gets back the 10 deposited, not a cut of the donation
        let id = tv.request_redeem(MALLORY, attacker_shares).unwrap();
        let report = tv.settle_with(&[id]);
        assert_eq!(report.redemptions, vec![(id, u(10))]);
        tv.vault.redeem(MALLORY, attacker_shares, MALLORY, MALLORY).unwrap();
        assert_eq!(tv.assets_of(MALLORY), u(STARTING_BALANCE - 100_000));

        // Victim's position is whole
        assert_eq!(tv.vault.convert_to_assets(victim_shares).unwrap(), u(10_000));
        tv.assert_invariants();
    }

    #[test]
    fn test_donation_into_empty_vault_is_stranded() {
        let tv = VaultBuilder::new().build();
        donate(&tv, MALLORY, 50_000);
        assert_eq!(tv.vault.total_assets().unwrap(), U256::zero());

        let shares = tv.onboard(ALICE, 1_000);
        assert_eq!(shares, u(1_000));
        assert_eq!(tv.vault.convert_to_assets(shares).unwrap(), u(1_000));
        tv.assert_invariants();
    }

    #[test]
    fn test_donation_does_not_fund_premium() {
        let tv = VaultBuilder::new().rate(1_000).build();
        tv.onboard(ALICE, 1_000);
        donate(&tv, MALLORY, 1_000_000);

        tv.advance(YEAR);
        let report = tv.settle();
        // 10% of tracked assets, not of the donated balance
        assert_eq!(report.premium, u(100));
        assert_eq!(tv.assets_of(VAULT), u(1_000_000 + 900));
        tv.assert_invariants();
    }
}
