use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use electionguard_core::elgamal::{self, DiscreteLog, KeyPair};
use electionguard_core::GroupParameters;
use rand_core::OsRng;
use std::time::Duration;

pub fn elgamal_benches(c: &mut Criterion) {
    let mut g = c.benchmark_group("elgamal benches");
    g.sample_size(10);

    let group = GroupParameters::standard();
    let key_pair = KeyPair::random(group, &mut OsRng).unwrap();
    let discrete_log = DiscreteLog::new(group);

    g.bench_function("benchmark elgamal encrypt()", |bench| {
        bench.iter_batched(
            || group.rand_range_q(1, &mut OsRng).unwrap(),
            |nonce| elgamal::encrypt(group, 1, &nonce, key_pair.public_key()),
            BatchSize::SmallInput,
        );
    });

    let ciphertexts: Vec<elgamal::Ciphertext> = (0..100)
        .map(|_| elgamal::encrypt(group, 1, &group.rand_range_q(1, &mut OsRng).unwrap(), key_pair.public_key()).unwrap())
        .collect();

    g.bench_function("benchmark elgamal add() of 100 ciphertexts", |bench| {
        bench.iter(|| elgamal::add(group, &ciphertexts))
    });

    let total = elgamal::add(group, &ciphertexts).unwrap();

    g.bench_function("benchmark elgamal decrypt() of a total of 100", |bench| {
        bench.iter(|| total.decrypt(group, key_pair.secret_key(), &discrete_log))
    });

    g.finish();
}

criterion_group! {
  name = benches;
  config = Criterion::default().measurement_time(Duration::from_secs(10));
  targets = elgamal_benches, electionguard_core::benchmark_disjunctive_chaum_pedersen, electionguard_core::benchmark_encrypt_ballot
}

criterion_main!(benches);
