//! Benchmarks comparing fastdir vs std::fs.
//!
//! Run with: cargo bench

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use fastdir::{DirReader, FieldSet};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn populated(count: usize) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..count {
        fs::write(dir.path().join(format!("file_{:06}.dat", i)), "payload").unwrap();
    }
    dir
}

/// Names only: one batch read against one `readdir` entry per file
fn bench_names(c: &mut Criterion) {
    let mut group = c.benchmark_group("names");

    for count in [1_000, 10_000] {
        let dir = populated(count);

        group.bench_with_input(BenchmarkId::new("fastdir", count), dir.path(), |b, path| {
            b.iter(|| DirReader::new(path).read_all().unwrap().len())
        });

        group.bench_with_input(BenchmarkId::new("std_fs", count), dir.path(), |b, path| {
            b.iter(|| fs::read_dir(path).unwrap().filter_map(|e| e.ok()).count())
        });
    }

    group.finish();
}

/// Names plus size and mtime, the `ls -l` shape
fn bench_with_metadata(c: &mut Criterion) {
    let mut group = c.benchmark_group("metadata");

    let dir = populated(10_000);
    group.bench_with_input(BenchmarkId::new("fastdir", "size_mtime"), dir.path(), |b, path| {
        b.iter(|| {
            DirReader::new(path)
                .prefetch(FieldSet::SIZE | FieldSet::MTIM)
                .read_all()
                .unwrap()
                .len()
        })
    });

    group.bench_with_input(BenchmarkId::new("std_fs", "size_mtime"), dir.path(), |b, path| {
        b.iter(|| {
            fs::read_dir(path)
                .unwrap()
                .filter_map(|e| e.ok())
                .map(|e| {
                    let _ = e.metadata().map(|m| (m.len(), m.modified()));
                    1
                })
                .count()
        })
    });

    group.finish();
}

/// Batch sizes on a large system directory
fn bench_batch_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_size");

    let test_path = ["/usr/lib", "C:\\Windows\\System32"]
        .into_iter()
        .map(Path::new)
        .find(|p| p.exists());
    let Some(test_path) = test_path else {
        return;
    };

    for size in [64, 512, 4096, 32_768] {
        group.bench_with_input(BenchmarkId::new("fastdir", size), &size, |b, &size| {
            b.iter(|| {
                DirReader::new(test_path)
                    .batch_size(size)
                    .read_all()
                    .unwrap()
                    .len()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_names, bench_with_metadata, bench_batch_sizes);
criterion_main!(benches);
