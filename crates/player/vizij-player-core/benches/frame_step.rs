use criterion::{black_box, criterion_group, criterion_main, Criterion};
use vizij_player_core::{PlaybackSession, SessionOptions, Surface};
use vizij_test_fixtures::{scenes, FixtureEngine};

fn frame_step(c: &mut Criterion) {
    let engine = FixtureEngine::new();
    let bytes = scenes::bytes("state-machine").expect("scene");
    let mut session = PlaybackSession::new(
        SessionOptions::new(Surface::new("bench", 800.0, 600.0))
            .with_state_machine("Main State Machine"),
    )
    .load_from_bytes(&engine, &bytes)
    .expect("scene loads");
    let probe = engine.probe();

    c.bench_function("advance_and_draw", |b| {
        b.iter(|| {
            session.advance_and_draw(black_box(1.0 / 60.0));
            // Keep the probe from growing without bound.
            probe.clear_calls();
        })
    });
}

criterion_group!(benches, frame_step);
criterion_main!(benches);
