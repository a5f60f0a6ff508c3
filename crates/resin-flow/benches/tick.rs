//! Benchmarks for the per-frame engine step.
//!
//! Run with: cargo bench -p rhizome-resin-flow

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use glam::Vec2;
use rhizome_resin_flow::{DrawList, EngineConfig, FlowEngine};

const PARTICLES: usize = 400;
const FRAME_MS: f64 = 1000.0 / 60.0;

fn engine() -> FlowEngine {
    FlowEngine::new(EngineConfig::new(800.0, 600.0).with_particle_count(PARTICLES))
        .expect("bench config is valid")
}

fn bench_tick_disordered(c: &mut Criterion) {
    c.bench_function("tick_disordered_400", |b| {
        let mut engine = engine();
        let mut surface = DrawList::new(Vec2::new(800.0, 600.0));
        let mut now = 0.0;
        b.iter(|| {
            now += FRAME_MS;
            black_box(engine.tick(now, &mut surface));
        });
    });
}

fn bench_tick_settled(c: &mut Criterion) {
    c.bench_function("tick_settled_400", |b| {
        let mut engine = engine();
        let mut surface = DrawList::new(Vec2::new(800.0, 600.0));
        engine.tick(0.0, &mut surface);
        engine.activate();
        engine.tick(2000.0, &mut surface);
        let mut now = 2000.0;
        b.iter(|| {
            now += FRAME_MS;
            black_box(engine.tick(now, &mut surface));
        });
    });
}

fn bench_update_converging(c: &mut Criterion) {
    c.bench_function("update_converging_400", |b| {
        let mut engine = engine();
        engine.update(0.0);
        engine.activate();
        b.iter(|| {
            // Stay inside the transition window.
            black_box(engine.update(black_box(900.0)));
        });
    });
}

criterion_group!(
    benches,
    bench_tick_disordered,
    bench_tick_settled,
    bench_update_converging
);
criterion_main!(benches);
