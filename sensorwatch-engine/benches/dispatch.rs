use std::time::Duration;

use chrono::{TimeDelta, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sensorwatch_engine::{BannerNotifier, MemoryTarget, Runner, StallCheck, ZeroCheck};
use sensorwatch_types::Snapshot;

const SERIES: [&str; 5] = ["co2", "voltage", "water", "temperature", "humidity"];

fn fleet_snapshot(entities: usize, stale: bool) -> Snapshot {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().unwrap_or_default();
    let last = if stale {
        now - TimeDelta::hours(1)
    } else {
        now - TimeDelta::seconds(30)
    };

    let mut builder = Snapshot::builder().now(now);
    for id in 0..entities {
        let entity = id.to_string();
        builder = builder.latest(entity.clone(), if stale { 0.0 } else { 21.5 });
        for series in SERIES {
            builder = builder.last_seen(entity.clone(), series, last.to_rfc3339());
        }
    }
    builder.build()
}

fn runner() -> Runner {
    Runner::builder()
        .check(ZeroCheck::new(0.01))
        .check(StallCheck::default())
        .notifier(BannerNotifier::new(MemoryTarget::new()))
        .build()
}

/// Benchmark pushing healthy snapshots (no transitions, no events)
fn bench_push_steady_state(c: &mut Criterion) {
    let mut group = c.benchmark_group("push_steady_state");

    for entities in [1usize, 10, 100, 500].iter() {
        let snapshot = fleet_snapshot(*entities, false);
        let runner = runner();
        group.bench_with_input(BenchmarkId::from_parameter(entities), entities, |b, _| {
            b.iter(|| runner.push_snapshot(black_box(&snapshot)));
        });
    }
    group.finish();
}

/// Benchmark a full alert/resolve cycle across the fleet
fn bench_alert_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("alert_cycle");

    for entities in [1usize, 10, 100].iter() {
        let stale = fleet_snapshot(*entities, true);
        let fresh = fleet_snapshot(*entities, false);
        let runner = runner();
        group.bench_with_input(BenchmarkId::from_parameter(entities), entities, |b, _| {
            b.iter(|| {
                runner.push_snapshot(black_box(&stale));
                runner.push_snapshot(black_box(&fresh));
            });
        });
    }
    group.finish();
}

/// Benchmark ticks against remembered observations
fn bench_tick(c: &mut Criterion) {
    let runner = runner();
    let snapshot = fleet_snapshot(100, false);
    runner.push_snapshot(&snapshot);
    let now = snapshot.now + TimeDelta::from_std(Duration::from_secs(5)).unwrap_or_default();

    c.bench_function("tick_100_entities", |b| {
        b.iter(|| runner.tick(black_box(now)));
    });
}

criterion_group!(benches, bench_push_steady_state, bench_alert_cycle, bench_tick);
criterion_main!(benches);
