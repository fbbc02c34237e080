use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use smallworld::algo::{PathConfig, PathFinder};
use smallworld::{BulkWriter, EntityRecord, RelationshipRecord, WriterConfig};
use smallworld_sdk::EmbeddedGateway;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Ring of `size` people where everyone also knows the person `size / 7` ahead
fn build_ring(rt: &Runtime, size: usize, logs: &std::path::Path) -> Arc<EmbeddedGateway> {
    let gateway = Arc::new(EmbeddedGateway::new());
    let writer = BulkWriter::open(
        gateway.clone(),
        WriterConfig::default(),
        logs.join("person.txt"),
        logs.join("link.txt"),
    )
    .unwrap();

    let people = (0..size)
        .map(|i| EntityRecord::new(i.to_string()).with("name", format!("Person{}", i)))
        .collect();
    let stride = (size / 7).max(2);
    let links = (0..size)
        .flat_map(|i| {
            [
                RelationshipRecord::new(i.to_string(), ((i + 1) % size).to_string()),
                RelationshipRecord::new(i.to_string(), ((i + stride) % size).to_string()),
            ]
        })
        .collect();

    rt.block_on(async {
        writer.write_batch("Person", people).await;
        writer.write_links(links).await;
    });
    gateway
}

/// Benchmark bulk upsert throughput at different concurrency budgets
fn bench_bulk_write(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let logs = tempfile::tempdir().unwrap();
    let mut group = c.benchmark_group("bulk_write");

    for concurrency in [1, 10, 50].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(concurrency),
            concurrency,
            |b, &concurrency| {
                b.iter(|| {
                    let writer = BulkWriter::open(
                        Arc::new(EmbeddedGateway::new()),
                        WriterConfig {
                            concurrency,
                            ..WriterConfig::default()
                        },
                        logs.path().join("person.txt"),
                        logs.path().join("link.txt"),
                    )
                    .unwrap();
                    let people = (0..500)
                        .map(|i| EntityRecord::new(i.to_string()).with("name", "x"))
                        .collect();
                    rt.block_on(writer.write_batch("Person", people))
                });
            },
        );
    }
    group.finish();
}

/// Benchmark bounded shortest-path latency over growing graphs
fn bench_shortest_path(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let logs = tempfile::tempdir().unwrap();
    let mut group = c.benchmark_group("shortest_path");

    for size in [100, 1000, 5000].iter() {
        let gateway = build_ring(&rt, *size, logs.path());
        let finder = PathFinder::new(gateway, PathConfig::default());
        let target = (size / 2).to_string();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let outcome = rt.block_on(finder.shortest_path("0", &target)).unwrap();
                criterion::black_box(outcome);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_bulk_write, bench_shortest_path);
criterion_main!(benches);
