//! Benchmarks for the poll-batch planner
//!
//! The planner runs once per tick (every 10 ms by default), so its cost
//! must stay negligible next to a single serial exchange.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use servoscope::backend::PollPlanner;

fn bench_plan(c: &mut Criterion) {
    let planner = PollPlanner::default();

    // Scattered addresses: every address its own range (worst case)
    let scattered: Vec<u16> = (0..200u16).map(|i| i * 8).collect();
    c.bench_function("plan_scattered_200", |b| {
        b.iter(|| planner.plan_addresses(black_box(&scattered).iter().copied()))
    });

    // Clustered addresses: everything merges into a handful of ranges
    let clustered: Vec<u16> = (0..200u16).map(|i| 0x80 + (i % 24)).collect();
    c.bench_function("plan_clustered_200", |b| {
        b.iter(|| planner.plan_addresses(black_box(&clustered).iter().copied()))
    });

    // The realistic servo workload: ten telemetry addresses
    let telemetry = [0x85u16, 0x86, 0x87, 0x88, 0x89, 0x90, 0x91, 0x92, 0xA0, 0xA1];
    c.bench_function("plan_telemetry_10", |b| {
        b.iter(|| planner.plan_addresses(black_box(telemetry)))
    });
}

criterion_group!(benches, bench_plan);
criterion_main!(benches);
