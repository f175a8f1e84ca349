use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{Duration, TimeZone, Utc};
use stockaudit_core::{ProductId, SequenceId};
use stockaudit_inventory::PurchaseLot;
use stockaudit_valuation::{build_layers, resolve_consumption, value};

fn make_lots(count: u64, products: u64) -> Vec<PurchaseLot> {
    let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    (0..count)
        .map(|i| {
            PurchaseLot::new(
                ProductId::new(i % products),
                start + Duration::hours((count - i) as i64),
                1.0 + (i % 17) as f64,
                0.5 + (i % 7) as f64 * 0.25,
                SequenceId::new(i),
            )
        })
        .collect()
}

fn bench_build_layers(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_layers");
    let cutoff = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();

    for count in [100u64, 1_000, 10_000] {
        let lots = make_lots(count, 50);
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(BenchmarkId::from_parameter(count), &lots, |b, lots| {
            b.iter(|| build_layers(black_box(lots), cutoff).unwrap())
        });
    }

    group.finish();
}

fn bench_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_and_value");
    let cutoff = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();

    for count in [1_000u64, 10_000] {
        let layers = build_layers(&make_lots(count, 50), cutoff).unwrap();
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(BenchmarkId::from_parameter(count), &layers, |b, layers| {
            b.iter(|| {
                let mut total = 0.0;
                for product_layers in layers.values() {
                    let outcome = resolve_consumption(product_layers, 25.0);
                    for (layer, record) in product_layers.iter().zip(&outcome.records) {
                        total += value(layer, record).value_remaining;
                    }
                }
                black_box(total)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build_layers, bench_full_pipeline);
criterion_main!(benches);
