//! # Simulation Step Benchmark
//!
//! A busy server world: 200 free stones, 50 towers, 4 clouds, 32 players.
//!
//! Run with: `cargo bench --package cairn_gameplay`

#![allow(missing_docs)]

use std::sync::Arc;

use cairn_core::{Cloud, EntityStore, GameConfig, HeightGrid, Player, Stone, Tower};
use cairn_gameplay::{Authority, Simulation};
use cairn_shared::{Vec2, Vec3};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const DT: f32 = 1.0 / 60.0;

fn populated_store(stones: usize) -> EntityStore {
    let mut store = EntityStore::new();
    for i in 0..stones {
        let angle = i as f32 * 0.37;
        let radius = 5.0 + (i % 60) as f32;
        store.stones.insert(Stone::spawned(
            format!("stone-{i:04}"),
            Vec3::new(angle.cos() * radius, 10.0, angle.sin() * radius),
        ));
    }
    for i in 0..50 {
        let angle = i as f32 * 1.3;
        store.towers.insert(Tower::founded(
            format!("tower-{i:03}"),
            Vec3::new(angle.cos() * 40.0, 1.0, angle.sin() * 40.0),
            None,
            0.0,
        ));
    }
    for i in 0..4 {
        store.clouds.insert(Cloud::new(
            format!("cloud-{i}"),
            Vec3::new(0.0, 30.0, 0.0),
            Vec2::new(1.0, i as f32),
            3.0,
        ));
    }
    for i in 0..32 {
        store
            .players
            .insert(Player::new(format!("p{i}"), "bot", Vec3::new(i as f32, 1.0, 0.0)));
    }
    store
}

fn simulation() -> Simulation {
    let terrain = HeightGrid::rolling_hills(129, 200.0, 4.0, 0.0);
    Simulation::new(GameConfig::default(), Arc::new(terrain))
}

fn bench_authoritative_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("authoritative_step");
    for stones in [20, 200, 2_000] {
        group.bench_with_input(BenchmarkId::from_parameter(stones), &stones, |b, &stones| {
            let mut sim = simulation();
            let mut store = populated_store(stones);
            b.iter(|| {
                let report = sim.step(&mut store, Authority::Authoritative, DT);
                store.drain_events();
                black_box(report)
            });
        });
    }
    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let store = populated_store(200);
    c.bench_function("snapshot_200_stones", |b| b.iter(|| black_box(store.snapshot())));
}

criterion_group!(benches, bench_authoritative_step, bench_snapshot);
criterion_main!(benches);
