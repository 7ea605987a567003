//! Benchmarks for the tabular codec and batched table writes.
//!
//! Benchmark targets:
//! - Rendering 1k item rows: <5ms
//! - Parsing 1k item rows: <5ms
//! - Writing 10k rows through the batched writer: <50ms

// Criterion macros generate items without docs - this is expected for benchmarks
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;

use stockpile::io::formats::records::item_to_fields;
use stockpile::io::formats::{ITEM_COLUMNS, TableWriter, parse_table, render_row};
use stockpile::io::{CancellationToken, Pacer, ProgressReporter, Stage};
use stockpile::models::Item;

fn sample_items(n: usize) -> Vec<Item> {
    (1..=n)
        .map(|i| {
            let mut item = Item::new(format!("Runner, model {i}"))
                .with_id(i64::try_from(i).unwrap())
                .with_code(format!("RN-{i}"))
                .with_image(format!("/data/images/runner_{i}.jpg"));
            item.box_size_quantities = serde_json::json!([{"40": 2, "41": 3, "42": 1}]);
            item
        })
        .collect()
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    group.measurement_time(Duration::from_secs(5));

    for size in [100, 1_000] {
        let items = sample_items(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &items, |b, items| {
            b.iter(|| {
                let text: String = items
                    .iter()
                    .map(|item| render_row(&item_to_fields(item)))
                    .collect();
                black_box(text)
            });
        });
    }
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    group.measurement_time(Duration::from_secs(5));

    for size in [100, 1_000] {
        let mut text = render_row(ITEM_COLUMNS);
        for item in sample_items(size) {
            text.push_str(&render_row(&item_to_fields(&item)));
        }
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &text, |b, text| {
            b.iter(|| parse_table(black_box(text)));
        });
    }
    group.finish();
}

fn bench_batched_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("batched_write");
    group.sample_size(20);

    let items = sample_items(10_000);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.csv");
    let pacer = Pacer::new(Duration::ZERO, CancellationToken::new());

    for batch in [100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(batch), &batch, |b, &batch| {
            b.iter(|| {
                let mut writer = TableWriter::create(&path, ITEM_COLUMNS, batch).unwrap();
                writer
                    .write_records(
                        &items,
                        item_to_fields,
                        Stage::Items,
                        &ProgressReporter::silent(),
                        &pacer,
                    )
                    .unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_render, bench_parse, bench_batched_write);
criterion_main!(benches);
