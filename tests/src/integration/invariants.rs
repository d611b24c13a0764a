//! # Invariant Properties
//!
//! Random operation sequences from several actors, checked after every step:
//!
//! - `check_invariants()` reports `Valid`
//! - the only invariant-tier error is `ZeroValueRedemption`, raised when a
//!   dust redemption is worth nothing at settlement, and it leaves the vault
//!   exactly as it was
//! - the vault's token balance equals tracked assets plus donations
//! - the sum of claimable deposit values never grows across premium
//!   extraction or deposit claims

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use epoch_vault::prelude::*;
    use proptest::prelude::*;

    const ACTORS: [Address; 3] = [ALICE, BOB, CAROL];

    #[derive(Clone, Debug)]
    enum Op {
        RequestDeposit { actor: usize, assets: u64 },
        CancelDeposit { actor: usize },
        ClaimDeposit { actor: usize, by_shares: bool, pct: u64 },
        RequestRedeem { actor: usize, pct: u64 },
        CancelRedeem { actor: usize },
        ClaimRedeem { actor: usize, by_assets: bool, pct: u64 },
        Settle { with_redemptions: bool },
        SettleMatured,
        Transfer { from: usize, to: usize, pct: u64 },
        Donate { assets: u64 },
        Advance { secs: u64 },
        SetRate { bps: u64 },
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        let actor = 0..ACTORS.len();
        let pct = 1u64..=100;
        prop_oneof![
            6 => (actor.clone(), 10u64..5_000)
                .prop_map(|(actor, assets)| Op::RequestDeposit { actor, assets }),
            1 => actor.clone().prop_map(|actor| Op::CancelDeposit { actor }),
            4 => (actor.clone(), any::<bool>(), pct.clone())
                .prop_map(|(actor, by_shares, pct)| Op::ClaimDeposit { actor, by_shares, pct }),
            3 => (actor.clone(), pct.clone())
                .prop_map(|(actor, pct)| Op::RequestRedeem { actor, pct }),
            1 => actor.clone().prop_map(|actor| Op::CancelRedeem { actor }),
            3 => (actor.clone(), any::<bool>(), pct.clone())
                .prop_map(|(actor, by_assets, pct)| Op::ClaimRedeem { actor, by_assets, pct }),
            4 => any::<bool>().prop_map(|with_redemptions| Op::Settle { with_redemptions }),
            1 => Just(Op::SettleMatured),
            1 => (actor.clone(), actor, pct)
                .prop_map(|(from, to, pct)| Op::Transfer { from, to, pct }),
            1 => (1u64..2_000).prop_map(|assets| Op::Donate { assets }),
            3 => (0u64..30 * DAY).prop_map(|secs| Op::Advance { secs }),
            1 => (0u64..=500).prop_map(|bps| Op::SetRate { bps }),
        ]
    }

    /// Model-side bookkeeping the vault does not expose directly.
    #[derive(Default)]
    struct Model {
        request_ids: Vec<RequestId>,
        donated: U256,
    }

    impl Model {
        fn open_requests(&self, tv: &TestVault<InMemoryAssetToken>) -> Vec<RequestId> {
            self.request_ids
                .iter()
                .copied()
                .filter(|id| matches!(tv.vault.redeem_request(*id), Some(r) if !r.settled))
                .collect()
        }
    }

    fn percent(value: U256, pct: u64) -> U256 {
        value * U256::from(pct) / U256::from(100)
    }

    fn claimable_deposit_value(tv: &TestVault<InMemoryAssetToken>) -> U256 {
        ACTORS.iter().fold(U256::zero(), |sum, actor| {
            sum + tv.vault.max_deposit(*actor).expect("max_deposit view")
        })
    }

    fn apply(
        tv: &TestVault<InMemoryAssetToken>,
        model: &mut Model,
        op: &Op,
    ) -> Result<(), VaultError> {
        let vault = &tv.vault;
        match *op {
            Op::RequestDeposit { actor, assets } => tv.request_deposit(ACTORS[actor], assets),
            Op::CancelDeposit { actor } => {
                let a = ACTORS[actor];
                vault.cancel_deposit(a, a).map(drop)
            }
            Op::ClaimDeposit {
                actor,
                by_shares,
                pct,
            } => {
                let a = ACTORS[actor];
                if by_shares {
                    let shares = percent(vault.max_mint(a)?, pct);
                    vault.mint(a, shares, a, a).map(drop)
                } else {
                    let assets = percent(vault.max_deposit(a)?, pct);
                    vault.deposit(a, assets, a, a).map(drop)
                }
            }
            Op::RequestRedeem { actor, pct } => {
                let a = ACTORS[actor];
                let shares = percent(vault.share_balance_of(a), pct).max(U256::one());
                let id = tv.request_redeem(a, shares)?;
                model.request_ids.push(id);
                Ok(())
            }
            Op::CancelRedeem { actor } => {
                let a = ACTORS[actor];
                let open = model.open_requests(tv);
                match open.iter().rev().find(|id| {
                    vault
                        .redeem_request(**id)
                        .is_some_and(|r| r.controller == a)
                }) {
                    Some(id) => vault.cancel_redeem(a, *id, a).map(drop),
                    None => Ok(()),
                }
            }
            Op::ClaimRedeem {
                actor,
                by_assets,
                pct,
            } => {
                let a = ACTORS[actor];
                if by_assets {
                    let assets = percent(vault.max_withdraw(a), pct);
                    vault.withdraw(a, assets, a, a).map(drop)
                } else {
                    let shares = percent(vault.max_redeem(a), pct);
                    vault.redeem(a, shares, a, a).map(drop)
                }
            }
            Op::Settle { with_redemptions } => {
                let ids = if with_redemptions {
                    model.open_requests(tv)
                } else {
                    Vec::new()
                };
                vault.settle(OPERATOR, None, &ids).map(drop)
            }
            Op::SettleMatured => match model.open_requests(tv).first() {
                Some(id) => vault.settle_matured_redeem(MALLORY, *id).map(drop),
                None => Ok(()),
            },
            Op::Transfer { from, to, pct } => {
                let (f, t) = (ACTORS[from], ACTORS[to]);
                let shares = percent(vault.share_balance_of(f), pct);
                vault.transfer_shares(f, t, shares)
            }
            Op::Donate { assets } => {
                vault.with_asset_ledger_mut(|ledger| ledger.transfer(MALLORY, VAULT, u(assets)))??;
                model.donated += u(assets);
                Ok(())
            }
            Op::Advance { secs } => {
                tv.advance(secs);
                Ok(())
            }
            Op::SetRate { bps } => vault.set_premium_rate(OPERATOR, bps),
        }
    }

    #[test]
    fn test_dust_redemption_fails_settlement_without_side_effects() {
        let tv = VaultBuilder::new().rate(500).build();
        tv.onboard(ALICE, 1_000);
        tv.advance(YEAR);
        tv.settle();
        // 1_000 shares over 950 assets: one share floors to nothing
        let dust = tv.request_redeem(ALICE, U256::one()).unwrap();
        let record = tv.vault.snapshot().unwrap();
        let published = tv.sink.events().len();

        let err = tv.vault.settle(OPERATOR, None, &[dust]).unwrap_err();
        assert_eq!(
            err,
            VaultError::Invariant(InvariantViolation::ZeroValueRedemption {
                request_id: dust,
                shares: U256::one(),
            })
        );
        assert_eq!(tv.vault.snapshot().unwrap(), record);
        assert_eq!(tv.sink.events().len(), published);

        tv.vault.cancel_redeem(ALICE, dust, ALICE).unwrap();
        tv.assert_invariants();
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            .. ProptestConfig::default()
        })]

        #[test]
        fn prop_invariants_hold_across_random_sequences(
            ops in prop::collection::vec(op_strategy(), 1..60)
        ) {
            let tv = VaultBuilder::new().rate(300).build();
            let mut model = Model::default();

            for op in &ops {
                let before = claimable_deposit_value(&tv);
                let record = tv.vault.snapshot().unwrap();
                let published = tv.sink.events().len();
                let result = apply(&tv, &mut model, op);
                if let Err(e) = &result {
                    if e.is_fatal() {
                        prop_assert!(
                            matches!(
                                e,
                                VaultError::Invariant(InvariantViolation::ZeroValueRedemption { .. })
                            ),
                            "fatal error on {:?}: {}",
                            op,
                            e
                        );
                        prop_assert_eq!(&tv.vault.snapshot().unwrap(), &record);
                        prop_assert_eq!(tv.sink.events().len(), published);
                    }
                }

                prop_assert!(
                    tv.vault.check_invariants().is_valid(),
                    "invariants broken after {:?}: {:?}",
                    op,
                    tv.vault.check_invariants()
                );

                let tracked = tv.vault.global_state().tracked_assets;
                prop_assert_eq!(tv.assets_of(VAULT), tracked + model.donated);

                if result.is_ok()
                    && matches!(op, Op::ClaimDeposit { .. } | Op::SetRate { .. })
                {
                    let after = claimable_deposit_value(&tv);
                    prop_assert!(
                        after <= before,
                        "claimable deposit value grew from {} to {} on {:?}",
                        before,
                        after,
                        op
                    );
                }
            }
        }

        #[test]
        fn prop_premium_never_exceeds_rate(
            deposit in 1_000u64..1_000_000,
            rate in 1u64..=1_000,
            secs in 1u64..(3 * YEAR),
        ) {
            let tv = VaultBuilder::new().rate(rate).build();
            tv.vault
                .with_asset_ledger_mut(|ledger| ledger.mint(ALICE, u(deposit)))
                .unwrap();
            tv.onboard(ALICE, deposit);

            tv.advance(secs);
            let report = tv.settle();
            let periods = secs / YEAR + 1;
            let bound = u(deposit) * u(rate) * u(periods) / u(10_000);
            prop_assert!(report.premium <= bound);
            prop_assert_eq!(
                tv.vault.total_assets().unwrap() + report.premium,
                u(deposit)
            );
            tv.assert_invariants();
        }
    }
}
