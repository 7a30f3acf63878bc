//! benches/kdf.rs
//! Page key derivation at various PBKDF2 work factors
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use std::time::Duration;
use wxdb_rs::aliases::{RawKey32, Salt16};
use wxdb_rs::{derive_keys, KdfParams};

fn kdf_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("KDF");
    // Faster runs for slow high-iter benches
    group.measurement_time(Duration::from_secs(8));
    group.sample_size(20);

    let raw_key = RawKey32::new([0x42; 32]);
    let salt = Salt16::new([0x17; 16]);

    for &iters in &[1_000, 10_000, 64_000, 256_000] {
        let params = KdfParams::new(iters, 2);
        let id = BenchmarkId::new("derive_keys", iters);
        group.bench_with_input(id, &params, |b, params| {
            b.iter(|| {
                let keys = derive_keys(black_box(&raw_key), black_box(&salt), params).unwrap();
                black_box(keys);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, kdf_benches);
criterion_main!(benches);
