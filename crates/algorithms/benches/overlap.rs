//! Benchmarks for overlap resolution and dissolve

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use geo::{polygon, MultiPolygon};
use paclean_algorithms::dissolve::{dissolve, DissolveParams};
use paclean_algorithms::overlap::{resolve_overlaps, OverlapParams};
use paclean_algorithms::repair::{repair_records, RepairParams};
use paclean_core::{Attributes, ProtectedArea, CRS};

/// Grid of squares, each overlapping its right and upper neighbours
fn create_test_records(side: usize) -> Vec<ProtectedArea> {
    let mut records = Vec::with_capacity(side * side);
    for row in 0..side {
        for col in 0..side {
            let x = col as f64 * 3.0 + ((row * 7 + col * 13) % 5) as f64 * 0.1;
            let y = row as f64 * 3.0;
            records.push(ProtectedArea::new(
                Attributes::new(format!("{row}-{col}")),
                MultiPolygon::new(vec![polygon![
                    (x: x, y: y),
                    (x: x + 4.0, y: y),
                    (x: x + 4.0, y: y + 4.0),
                    (x: x, y: y + 4.0),
                ]]),
            ));
        }
    }
    records
}

fn bench_resolve_overlaps(c: &mut Criterion) {
    let mut group = c.benchmark_group("overlap/resolve");
    let params = OverlapParams::default();
    for side in [10, 20, 40] {
        let records = create_test_records(side);
        group.bench_with_input(BenchmarkId::from_parameter(side * side), &side, |b, _| {
            b.iter(|| resolve_overlaps(black_box(records.clone()), &params))
        });
    }
    group.finish();
}

fn bench_dissolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("overlap/dissolve");
    let params = DissolveParams {
        crs: CRS::local_equal_area_km(),
        ..Default::default()
    };
    for side in [10, 20, 40] {
        let records = create_test_records(side);
        group.bench_with_input(BenchmarkId::from_parameter(side * side), &side, |b, _| {
            b.iter(|| dissolve(black_box(&records), &params))
        });
    }
    group.finish();
}

fn bench_repair(c: &mut Criterion) {
    let mut group = c.benchmark_group("overlap/repair");
    let params = RepairParams::default();
    for side in [20, 40] {
        let records = create_test_records(side);
        group.bench_with_input(BenchmarkId::from_parameter(side * side), &side, |b, _| {
            b.iter(|| repair_records(black_box(records.clone()), &params))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_resolve_overlaps, bench_dissolve, bench_repair);
criterion_main!(benches);
