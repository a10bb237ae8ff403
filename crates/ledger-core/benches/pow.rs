use criterion::{criterion_group, criterion_main, Criterion};
use ledger_core::chain::genesis_block;
use ledger_core::pow::{find_proof, find_proof_parallel, ProofLimits};
use ledger_core::Transaction;
use rand::{rngs::StdRng, Rng, SeedableRng};

fn bench_pow(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let txs: Vec<Transaction> = (0..10)
        .map(|i| Transaction::new(format!("alice-{i}"), "bob", rng.gen_range(1.0..10.0)))
        .collect();
    let parent = genesis_block(1_700_000_000);
    let limits = ProofLimits::unbounded();

    let mut group = c.benchmark_group("find_proof");
    group.sample_size(10);
    group.bench_function("sequential", |b| {
        b.iter(|| find_proof(&parent, &txs, 1_700_000_060, &limits).unwrap());
    });
    group.bench_function("parallel", |b| {
        b.iter(|| find_proof_parallel(&parent, &txs, 1_700_000_060, &limits).unwrap());
    });
    group.finish();
}

criterion_group!(benches, bench_pow);
criterion_main!(benches);
