//! Criterion benchmarks for whole-level encoding and decoding.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use dustkit_bench::{reference_level, stress_level};
use dustkit_format::{
    read_level, read_level_with, write_level, LevelReader, LevelWriter, ReadOptions,
    WriteOptions,
};

/// Benchmark: Encode the reference level.
fn bench_write_reference(c: &mut Criterion) {
    let level = reference_level(42);
    c.bench_function("level_write_reference", |b| {
        b.iter(|| black_box(write_level(&level).unwrap()));
    });
}

/// Benchmark: Decode the reference level.
fn bench_read_reference(c: &mut Criterion) {
    let bytes = write_level(&reference_level(42)).unwrap();
    c.bench_function("level_read_reference", |b| {
        b.iter(|| black_box(read_level(&bytes).unwrap()));
    });
}

/// Benchmark: Encode the stress level serially and on four workers.
fn bench_write_stress(c: &mut Criterion) {
    let level = stress_level(42);
    let parallel = LevelWriter::new(WriteOptions {
        region_workers: Some(4),
        ..WriteOptions::default()
    })
    .unwrap();

    let mut group = c.benchmark_group("level_write_stress");
    group.sample_size(20);
    group.bench_function("serial", |b| {
        b.iter(|| black_box(write_level(&level).unwrap()));
    });
    group.bench_function("workers_4", |b| {
        b.iter(|| black_box(parallel.write(&level).unwrap()));
    });
    group.finish();
}

/// Benchmark: Metadata-only read and raw rewrite of the stress level.
fn bench_metadata_edit(c: &mut Criterion) {
    let bytes = write_level(&stress_level(42)).unwrap();
    c.bench_function("level_metadata_only_read", |b| {
        b.iter(|| black_box(read_level_with(&bytes, &ReadOptions::metadata_only()).unwrap()));
    });
    c.bench_function("level_raw_rewrite", |b| {
        b.iter(|| {
            let reader = LevelReader::open(&bytes).unwrap();
            let raw = reader.raw_regions().unwrap();
            let mut meta = reader.into_level();
            meta.set_name("renamed");
            black_box(LevelWriter::default().write_raw(&meta, &raw).unwrap());
        });
    });
}

criterion_group!(
    benches,
    bench_write_reference,
    bench_read_reference,
    bench_write_stress,
    bench_metadata_edit
);
criterion_main!(benches);
