use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::{sync::Arc, time::Duration};
use telehud::{
    DisplaySession, SchedulerConfig, TelemetryFrame, builtin_registry,
    telemetry::{SimConfig, TelemetrySimulator},
};

fn warmed_simulator() -> TelemetrySimulator {
    let mut sim = TelemetrySimulator::new(SimConfig::default()).unwrap();
    for i in 0..60 {
        sim.advance(i * 16);
    }
    sim
}

fn bench_simulator(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulator");

    group.bench_function("advance_one_tick", |b| {
        let mut sim = warmed_simulator();
        let mut now = 1_000;
        b.iter(|| {
            now += 16;
            black_box(sim.advance(black_box(now)));
        });
    });

    group.bench_function("regenerate_stale_state", |b| {
        let mut sim = warmed_simulator();
        let mut now = 1_000;
        b.iter(|| {
            now += 5_000;
            black_box(sim.advance(black_box(now)));
        });
    });

    group.finish();
}

fn bench_programs(c: &mut Criterion) {
    let mut group = c.benchmark_group("programs");
    let registry = Arc::new(builtin_registry().unwrap());

    for program in registry.iter() {
        group.bench_with_input(
            BenchmarkId::new("forced_frame", &program.id),
            &program.id,
            |b, id| {
                let mut session = DisplaySession::new(
                    Arc::clone(&registry),
                    SimConfig::default(),
                    SchedulerConfig::default(),
                    512,
                    512,
                )
                .unwrap();
                session.select(id.as_str());
                let mut now = 0;
                b.iter(|| {
                    now += 16;
                    session.request_redraw();
                    black_box(session.frame(now));
                });
            },
        );
    }

    group.finish();
}

fn bench_frame_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_loop");
    let registry = Arc::new(builtin_registry().unwrap());

    group.bench_function("one_second_at_60fps", |b| {
        b.iter(|| {
            let mut session = DisplaySession::new(
                Arc::clone(&registry),
                SimConfig::default(),
                SchedulerConfig::default(),
                256,
                256,
            )
            .unwrap();
            for frame in 0..60 {
                session.frame(frame * 16);
            }
            black_box(session.stats())
        });
    });

    group.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");
    let sim = warmed_simulator();
    let frame = TelemetryFrame {
        timestamp_ms: 960,
        program_id: "sonar".to_string(),
        state: sim.state().clone(),
    };

    group.bench_function("serialize_frame", |b| {
        b.iter(|| black_box(serde_json::to_string(&frame).unwrap()));
    });

    let json = serde_json::to_string(&frame).unwrap();
    group.bench_function("deserialize_frame", |b| {
        b.iter(|| black_box(serde_json::from_str::<TelemetryFrame>(&json).unwrap()));
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(5))
        .sample_size(50);
    targets = bench_simulator, bench_programs, bench_frame_loop, bench_serialization
}
criterion_main!(benches);
