//! Benchmarks for tree operations, seeks and stream appends.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rax_stream::{Direction, Entry, IdSpec, ManualClock, RadixTree, SeekOp, Stream, StreamId};
use std::collections::BTreeMap;

fn generate_url_like_keys(n: usize) -> Vec<Vec<u8>> {
    let domains = ["example.com", "test.org", "demo.net", "sample.io"];
    let paths = ["users", "posts", "comments", "api/v1", "api/v2"];

    (0..n)
        .map(|i| {
            let domain = domains[i % domains.len()];
            let path = paths[(i / domains.len()) % paths.len()];
            let id = i / (domains.len() * paths.len());
            format!("{}/{}/{}", domain, path, id).into_bytes()
        })
        .collect()
}

fn build_tree(keys: &[Vec<u8>]) -> RadixTree<u64> {
    let mut tree = RadixTree::new();
    for (i, key) in keys.iter().enumerate() {
        tree.insert(key, i as u64);
    }
    tree
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for size in [1_000, 10_000, 100_000] {
        let keys = generate_url_like_keys(size);

        group.bench_with_input(BenchmarkId::new("RadixTree", size), &keys, |b, keys| {
            b.iter(|| black_box(build_tree(keys)));
        });

        group.bench_with_input(BenchmarkId::new("BTreeMap", size), &keys, |b, keys| {
            b.iter(|| {
                let mut map: BTreeMap<Vec<u8>, u64> = BTreeMap::new();
                for (i, key) in keys.iter().enumerate() {
                    map.insert(key.clone(), i as u64);
                }
                black_box(map)
            });
        });
    }

    group.finish();
}

fn bench_seek(c: &mut Criterion) {
    let mut group = c.benchmark_group("seek");

    for size in [1_000, 100_000] {
        let keys = generate_url_like_keys(size);
        let tree = build_tree(&keys);
        let probes: Vec<Vec<u8>> = keys
            .iter()
            .step_by(7)
            .map(|k| {
                let mut probe = k.clone();
                probe.push(b'~');
                probe
            })
            .collect();

        for op in [SeekOp::Eq, SeekOp::Ge, SeekOp::Lt] {
            group.bench_with_input(
                BenchmarkId::new(format!("RadixTree {op}"), size),
                &probes,
                |b, probes| {
                    b.iter(|| {
                        for probe in probes {
                            black_box(tree.seek(op, probe).key().is_some());
                        }
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");
    let keys = generate_url_like_keys(100_000);
    let tree = build_tree(&keys);

    group.bench_function("forward", |b| {
        b.iter(|| black_box(tree.iter().count()));
    });

    group.bench_function("backward", |b| {
        b.iter(|| {
            let mut it = tree.seek(SeekOp::Max, &[]);
            let mut n = 0usize;
            while !it.is_exhausted() {
                n += 1;
                it.step(Direction::Backward);
            }
            black_box(n)
        });
    });

    group.finish();
}

fn bench_stream_append(c: &mut Criterion) {
    c.bench_function("stream append 10k", |b| {
        b.iter(|| {
            let clock = ManualClock::new(1_700_000_000_000);
            let mut stream = Stream::with_clock(&clock);
            for i in 0..10_000u64 {
                if i % 100 == 0 {
                    clock.advance(1);
                }
                let entry = Entry::new().with("seq", i.to_be_bytes());
                black_box(stream.append(IdSpec::Auto, entry).ok());
            }
            black_box(stream.last_id() > StreamId::MIN)
        });
    });
}

criterion_group!(benches, bench_insert, bench_seek, bench_scan, bench_stream_append);
criterion_main!(benches);
