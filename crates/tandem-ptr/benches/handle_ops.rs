//! Benchmark: handle operation costs on the uncontended fast paths.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use tandem_ptr::Shared;

fn bench_new_drop(c: &mut Criterion) {
    c.bench_function("new_drop", |b| {
        b.iter(|| {
            let s = Shared::new(black_box(42_u64));
            black_box(&s);
        });
    });
}

fn bench_clone_drop(c: &mut Criterion) {
    let s = Shared::new(42_u64);
    c.bench_function("clone_drop", |b| {
        b.iter(|| {
            let c = s.clone();
            black_box(&c);
        });
    });
}

fn bench_upgrade_live(c: &mut Criterion) {
    let s = Shared::new(42_u64);
    let w = Shared::downgrade(&s);
    c.bench_function("upgrade_live", |b| {
        b.iter(|| black_box(w.upgrade()));
    });
}

fn bench_upgrade_expired(c: &mut Criterion) {
    let s = Shared::new(42_u64);
    let w = Shared::downgrade(&s);
    drop(s);
    c.bench_function("upgrade_expired", |b| {
        b.iter(|| black_box(w.upgrade()));
    });
}

fn bench_get_mut_unique(c: &mut Criterion) {
    let mut s = Shared::new(0_u64);
    c.bench_function("get_mut_unique", |b| {
        b.iter(|| {
            *Shared::get_mut(&mut s).unwrap() += 1;
        });
    });
}

criterion_group!(
    benches,
    bench_new_drop,
    bench_clone_drop,
    bench_upgrade_live,
    bench_upgrade_expired,
    bench_get_mut_unique
);
criterion_main!(benches);
