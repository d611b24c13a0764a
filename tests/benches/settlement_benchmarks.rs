//! # Epoch Vault Benchmarks
//!
//! | Path | Shape | Target |
//! |------|-------|--------|
//! | `request_deposit` | pull + write-set commit | < 50us |
//! | `request_deposit` over history | same, after N settled redemptions | flat in N |
//! | `settle` | premium + allocation + N redemptions | < 5ms at N = 500 |
//! | `preview_sync` views | read-only | < 5us |
//! | premium accrual | up to 10 compounding periods | < 10us |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use epoch_vault::accounting::premium;
use epoch_vault::prelude::*;
use rand::Rng;
use std::time::Duration;
use vault_tests::fixtures::*;

fn random_actor(rng: &mut impl Rng) -> Address {
    let mut bytes = [0u8; 20];
    rng.fill(&mut bytes);
    bytes[0] |= 0x10;
    Address(bytes)
}

/// Vault with `holders` funded actors, each already holding settled shares.
fn populated_vault(holders: usize) -> (TestVault<InMemoryAssetToken>, Vec<Address>) {
    let mut rng = rand::thread_rng();
    let actors: Vec<Address> = (0..holders).map(|_| random_actor(&mut rng)).collect();
    let ledger = actors.iter().fold(InMemoryAssetToken::new(), |ledger, actor| {
        ledger.with_balance(*actor, u(STARTING_BALANCE))
    });
    let tv = VaultBuilder::new().rate(200).build_with(ledger);
    for actor in &actors {
        tv.request_deposit(*actor, rng.gen_range(1_000..10_000))
            .expect("request");
    }
    tv.settle();
    for actor in &actors {
        tv.claim_all_shares(*actor);
    }
    (tv, actors)
}

// ============================================================================
// DEPOSIT LEDGER
// ============================================================================

fn bench_request_deposit(c: &mut Criterion) {
    let mut group = c.benchmark_group("deposit-ledger");

    for holders in [10, 100, 1_000] {
        let (tv, actors) = populated_vault(holders);
        group.bench_with_input(
            BenchmarkId::new("request_deposit", holders),
            &actors,
            |b, actors| {
                let mut i = 0;
                b.iter(|| {
                    let actor = actors[i % actors.len()];
                    i += 1;
                    black_box(tv.vault.request_deposit(actor, u(1), actor, actor))
                })
            },
        );
        group.bench_with_input(
            BenchmarkId::new("claimable_view", holders),
            &actors,
            |b, actors| {
                b.iter(|| black_box(tv.vault.claimable_deposit_request(actors[0])))
            },
        );
    }

    group.finish();
}

/// Vault holding `requests` settled one-share redemptions of a single actor.
fn vault_with_history(requests: u64) -> TestVault<InMemoryAssetToken> {
    let tv = VaultBuilder::new().build();
    tv.onboard(CAROL, requests * 2 + 2);
    let mut remaining = requests;
    while remaining > 0 {
        let batch = remaining.min(1_000);
        let ids: Vec<RequestId> = (0..batch)
            .map(|_| tv.request_redeem(CAROL, u(1)).expect("redeem"))
            .collect();
        tv.settle_with(&ids);
        remaining -= batch;
    }
    tv
}

fn bench_request_deposit_over_history(c: &mut Criterion) {
    let mut group = c.benchmark_group("deposit-ledger-history");

    for requests in [0u64, 2_000, 20_000] {
        let tv = vault_with_history(requests);
        group.bench_with_input(
            BenchmarkId::new("request_deposit", requests),
            &tv,
            |b, tv| b.iter(|| black_box(tv.vault.request_deposit(ALICE, u(1), ALICE, ALICE))),
        );
    }

    group.finish();
}

// ============================================================================
// SETTLEMENT COORDINATOR
// ============================================================================

fn bench_batch_settlement(c: &mut Criterion) {
    let mut group = c.benchmark_group("settlement-coordinator");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(20);

    for batch in [10usize, 100, 500] {
        group.throughput(Throughput::Elements(batch as u64));
        group.bench_with_input(BenchmarkId::new("settle", batch), &batch, |b, &batch| {
            b.iter_batched(
                || {
                    let (tv, actors) = populated_vault(batch);
                    let ids: Vec<RequestId> = actors
                        .iter()
                        .map(|actor| tv.request_redeem(*actor, u(500)).expect("redeem"))
                        .collect();
                    tv.advance(DAY);
                    (tv, ids)
                },
                |(tv, ids)| black_box(tv.vault.settle(OPERATOR, None, &ids)),
                criterion::BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

// ============================================================================
// PREMIUM STREAMER
// ============================================================================

fn bench_premium_accrual(c: &mut Criterion) {
    let mut group = c.benchmark_group("premium-streamer");
    let config = VaultConfig::default();
    let value = U256::from(10u64).pow(U256::from(30));

    for periods in [0u64, 1, 10, 50] {
        let elapsed = periods * YEAR + YEAR / 2;
        group.bench_with_input(
            BenchmarkId::new("accrue", periods),
            &elapsed,
            |b, &elapsed| {
                b.iter(|| black_box(premium::accrue(value, 500, elapsed, &config)))
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_request_deposit,
    bench_request_deposit_over_history,
    bench_batch_settlement,
    bench_premium_accrual
);
criterion_main!(benches);
