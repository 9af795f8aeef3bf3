use std::sync::{Arc, Mutex};

use vizij_player_core::{
    Alignment, DriverSpec, Fit, PlaybackSession, PlayerError, ReadySession, SessionOptions,
    StateMachineTarget, Surface,
};
use vizij_test_fixtures::{scenes, FixtureEngine, Pose, StaticFetcher};

fn canvas(width: f32, height: f32) -> Surface {
    Surface::new("canvas", width, height)
}

fn scene_options(scene: &str) -> SessionOptions {
    SessionOptions::new(canvas(400.0, 400.0)).with_buffer(scenes::bytes(scene).expect("scene"))
}

async fn load(engine: &FixtureEngine, options: SessionOptions) -> Result<ReadySession, PlayerError> {
    PlaybackSession::new(options)
        .load(engine, &StaticFetcher::new())
        .await
}

#[tokio::test]
async fn buffer_load_fires_load_event_and_draws_first_frame() {
    let engine = FixtureEngine::new();
    let probe = engine.probe();
    let loads = Arc::new(Mutex::new(Vec::new()));

    let mut session = PlaybackSession::new(
        scene_options("state-machine").with_state_machine("Main State Machine"),
    );
    let seen = Arc::clone(&loads);
    session.on_load(move |source| seen.lock().unwrap().push(source.to_string()));

    let ready = session
        .load(&engine, &StaticFetcher::new())
        .await
        .expect("scene loads");

    assert_eq!(*loads.lock().unwrap(), vec![String::new()]);
    assert_eq!(ready.artboard().name(), "Main");
    assert_eq!(ready.frames_rendered(), 1);
    assert_eq!(
        probe.calls(),
        vec![
            "engine.load",
            "state_machine[Main State Machine].advance",
            "artboard[Main].advance driven=0.0000",
            "renderer[canvas].clear",
            "renderer[canvas].save",
            "renderer[canvas].align Contain Center 400x400 <- 500x500",
            "artboard[Main].draw",
            "renderer[canvas].restore",
            "renderer[canvas].flush depth=0",
        ]
    );
}

#[tokio::test]
async fn zero_elapsed_frames_leave_the_scene_unchanged() {
    let engine = FixtureEngine::new();
    let probe = engine.probe();
    let mut ready = load(
        &engine,
        scene_options("state-machine").with_state_machine("Main State Machine"),
    )
    .await
    .expect("scene loads");

    ready.advance_and_draw(0.3);
    let before = probe.artboard("Main").expect("artboard").scene();
    ready.advance_and_draw(0.0);
    ready.advance_and_draw(0.0);
    let after = probe.artboard("Main").expect("artboard");

    assert_eq!(after.scene(), before);
    assert_eq!(after.draws, 4);
}

#[tokio::test]
async fn invalid_buffer_is_bad_data_and_leaks_nothing() {
    let engine = FixtureEngine::new();
    let probe = engine.probe();
    let fired = Arc::new(Mutex::new(0));

    let mut session = PlaybackSession::new(
        SessionOptions::new(canvas(100.0, 100.0)).with_buffer(b"not a scene".to_vec()),
    );
    let counter = Arc::clone(&fired);
    session.on_load(move |_| *counter.lock().unwrap() += 1);

    let err = session.load(&engine, &StaticFetcher::new()).await.err();
    assert_eq!(err, Some(PlayerError::BadData));
    assert_eq!(*fired.lock().unwrap(), 0);
    assert_eq!(probe.live_objects(), 0);
    assert_eq!(probe.acquired(), 0);
}

#[tokio::test]
async fn source_selection_is_validated() {
    let engine = FixtureEngine::new();

    let missing = load(&engine, SessionOptions::new(canvas(10.0, 10.0))).await.err();
    assert_eq!(
        missing,
        Some(PlayerError::Configuration("missing source".into()))
    );

    let both = load(
        &engine,
        scene_options("linear").with_source("https://cdn.example/linear.riv"),
    )
    .await
    .err();
    assert!(matches!(both, Some(PlayerError::Configuration(_))));
    assert!(engine.probe().calls().is_empty());
}

#[tokio::test]
async fn remote_source_reports_its_locator() {
    let engine = FixtureEngine::new();
    let locator = "https://cdn.example/scenes/linear.riv";
    let fetcher = StaticFetcher::new().with(locator, scenes::bytes("linear").expect("scene"));
    let loads = Arc::new(Mutex::new(Vec::new()));

    let mut session =
        PlaybackSession::new(SessionOptions::new(canvas(200.0, 100.0)).with_source(locator));
    let seen = Arc::clone(&loads);
    session.on_load(move |source| seen.lock().unwrap().push(source.to_string()));

    let ready = session.load(&engine, &fetcher).await.expect("fetched scene loads");
    assert_eq!(ready.artboard().name(), "Bouncer");
    assert_eq!(*loads.lock().unwrap(), vec![locator.to_string()]);
    assert_eq!(fetcher.fetches(), 1);
}

#[tokio::test]
async fn fetch_failure_is_a_load_error() {
    let engine = FixtureEngine::new();
    let err = PlaybackSession::new(
        SessionOptions::new(canvas(10.0, 10.0)).with_source("https://cdn.example/missing.riv"),
    )
    .load(&engine, &StaticFetcher::new())
    .await
    .err();

    assert!(matches!(
        err,
        Some(PlayerError::Load { ref locator, .. }) if locator == "https://cdn.example/missing.riv"
    ));
    assert!(engine.probe().calls().is_empty());
}

#[tokio::test]
async fn artboard_selection() {
    let engine = FixtureEngine::new();

    let ready = load(&engine, scene_options("multi-artboard"))
        .await
        .expect("default artboard");
    assert_eq!(ready.artboard().name(), "Intro");

    let ready = load(&engine, scene_options("multi-artboard").with_artboard("Loop"))
        .await
        .expect("named artboard");
    assert_eq!(ready.artboard().name(), "Loop");

    let missing = load(&engine, scene_options("multi-artboard").with_artboard("Outro"))
        .await
        .err();
    assert_eq!(
        missing,
        Some(PlayerError::MissingArtboard(Some("Outro".into())))
    );

    let empty = load(&engine, scene_options("empty")).await.err();
    assert_eq!(empty, Some(PlayerError::MissingArtboard(None)));
}

#[tokio::test]
async fn unknown_state_machine_releases_artboard_then_file() {
    let engine = FixtureEngine::new();
    let probe = engine.probe();

    let err = load(
        &engine,
        scene_options("state-machine").with_state_machine("Nope"),
    )
    .await
    .err();

    assert_eq!(err, Some(PlayerError::UnknownStateMachine("Nope".into())));
    assert_eq!(probe.released(), vec!["artboard", "file"]);
    assert_eq!(probe.live_objects(), 0);
}

#[tokio::test]
async fn unknown_animation_is_reported() {
    let engine = FixtureEngine::new();
    let err = load(&engine, scene_options("linear").with_animation("wobble"))
        .await
        .err();
    assert_eq!(err, Some(PlayerError::UnknownAnimation("wobble".into())));
    assert_eq!(engine.probe().live_objects(), 0);
}

#[tokio::test]
async fn renderer_failure_releases_everything_acquired() {
    let engine = FixtureEngine::new().with_failing_renderer("no context");
    let probe = engine.probe();

    let err = load(
        &engine,
        scene_options("state-machine").with_state_machine("Main State Machine"),
    )
    .await
    .err();

    assert_eq!(err, Some(PlayerError::Renderer("no context".into())));
    assert_eq!(probe.released(), vec!["state_machine", "artboard", "file"]);
    assert_eq!(probe.live_objects(), 0);
}

#[tokio::test]
async fn state_machine_input_is_consumed_in_the_same_frame() {
    let engine = FixtureEngine::new().with_state_machine_gain(2.0);
    let probe = engine.probe();
    let mut ready = load(
        &engine,
        scene_options("state-machine").with_state_machine("Main State Machine"),
    )
    .await
    .expect("scene loads");

    ready.advance_and_draw(0.5);
    let snapshot = probe.artboard("Main").expect("artboard");
    assert!((snapshot.last_driven - 1.0).abs() < 1e-9);
    assert!((snapshot.time - 0.5).abs() < 1e-9);
}

#[tokio::test]
async fn state_machine_can_be_selected_by_index() {
    let engine = FixtureEngine::new();
    let ready = load(
        &engine,
        scene_options("multi-artboard")
            .with_artboard("Loop")
            .add_driver(DriverSpec::StateMachine(StateMachineTarget::Index(1))),
    )
    .await
    .expect("scene loads");
    assert_eq!(ready.drivers()[0].name(), "Hover");

    let err = load(
        &engine,
        scene_options("multi-artboard")
            .with_artboard("Loop")
            .add_driver(DriverSpec::StateMachine(StateMachineTarget::Index(5))),
    )
    .await
    .err();
    assert_eq!(err, Some(PlayerError::UnknownStateMachine("#5".into())));
}

#[tokio::test]
async fn linear_animation_applies_at_full_mix() {
    let engine = FixtureEngine::new();
    let probe = engine.probe();
    let mut ready = load(&engine, scene_options("linear").with_animation("bounce"))
        .await
        .expect("scene loads");

    ready.advance_and_draw(0.25);
    let pose = probe.artboard("Bouncer").and_then(|a| a.pose);
    assert_eq!(
        pose,
        Some(Pose {
            animation: "bounce".into(),
            time: 0.25,
            mix: 1.0,
        })
    );
}

#[tokio::test]
async fn one_driver_by_default_more_when_added() {
    let engine = FixtureEngine::new();

    let options = scene_options("linear")
        .with_animation("idle")
        .with_animation("bounce");
    let ready = load(&engine, options).await.expect("scene loads");
    let names: Vec<&str> = ready.drivers().iter().map(|d| d.name()).collect();
    assert_eq!(names, vec!["bounce"]);

    let options = scene_options("multi-artboard")
        .with_artboard("Loop")
        .with_state_machine("Spinner")
        .add_driver(DriverSpec::LinearAnimation("spin".into()));
    let ready = load(&engine, options).await.expect("scene loads");
    let names: Vec<&str> = ready.drivers().iter().map(|d| d.name()).collect();
    assert_eq!(names, vec!["Spinner", "spin"]);
    assert!(ready.drivers()[0].is_state_machine());
}

#[tokio::test]
async fn sixty_frames_draw_sixty_times() {
    let engine = FixtureEngine::new();
    let probe = engine.probe();
    let mut ready = load(
        &engine,
        scene_options("state-machine").with_state_machine("Main State Machine"),
    )
    .await
    .expect("scene loads");
    probe.clear_calls();

    for _ in 0..60 {
        ready.advance_and_draw(0.0167);
    }

    assert_eq!(probe.count("].draw"), 60);
    assert_eq!(probe.count("state_machine[Main State Machine].advance"), 60);
    assert_eq!(ready.frames_rendered(), 61);
    assert!((ready.elapsed_total() - 60.0 * 0.0167).abs() < 1e-9);
    assert!((ready.last_elapsed() - 0.0167).abs() < 1e-12);
}

#[tokio::test]
async fn layout_changes_apply_from_the_next_frame() {
    let engine = FixtureEngine::new();
    let probe = engine.probe();
    let mut ready = load(&engine, scene_options("state-machine"))
        .await
        .expect("scene loads");
    probe.clear_calls();

    ready.set_fit(Fit::Cover);
    ready.set_alignment(Alignment::TopLeft);
    ready.resize(250.0, 500.0);
    ready.advance_and_draw(0.0);

    assert!(probe
        .calls()
        .contains(&"renderer[canvas].align Cover TopLeft 250x500 <- 500x500".to_string()));
    let transform = ready.alignment_transform();
    assert!((transform.scale_x() - 1.0).abs() < 1e-6);
    assert_eq!(transform.translation(), (0.0, 0.0));
}

#[tokio::test]
async fn options_deserialize_from_json() {
    let options: SessionOptions = serde_json::from_value(serde_json::json!({
        "surface": { "id": "hero", "width": 320.0, "height": 180.0 },
        "source": "https://cdn.example/hero.riv",
        "autoplay": true,
        "fit": "fit_width",
        "drivers": [{ "type": "state_machine", "target": { "name": "Main" } }]
    }))
    .expect("options parse");

    assert_eq!(options.surface, Surface::new("hero", 320.0, 180.0));
    assert!(options.autoplay);
    assert_eq!(options.fit, Fit::FitWidth);
    assert_eq!(options.alignment, Alignment::Center);
    assert_eq!(
        options.drivers,
        vec![DriverSpec::StateMachine(StateMachineTarget::Name("Main".into()))]
    );
}
