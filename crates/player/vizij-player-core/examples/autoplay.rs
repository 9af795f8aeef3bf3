//! Plays a fixture scene on an interval clock for one second.

use std::sync::Arc;
use std::time::Duration;

use vizij_player_core::{
    FrameLoop, IntervalClock, PlaybackSession, PlayerConfig, PlayerRuntime, RuntimeLoader,
    SessionOptions, SessionPhase, Surface,
};
use vizij_test_fixtures::{scenes, FixtureEngine, FixtureModule, StaticFetcher};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = PlayerConfig::default();
    let engine = FixtureEngine::new();
    let probe = engine.probe();

    let loader = RuntimeLoader::new(Arc::new(FixtureModule::ready(&engine)), &config);
    let clock = Arc::new(IntervalClock::spawn(config.frame_period()));
    let runtime = PlayerRuntime::new(loader, Arc::new(StaticFetcher::new()), FrameLoop::new(clock));

    let options = SessionOptions::from_config(Surface::new("demo", 640.0, 480.0), &config)
        .with_buffer(scenes::bytes("state-machine")?)
        .with_state_machine("Main State Machine")
        .with_autoplay(true);
    let mut handle = runtime.start(PlaybackSession::new(options));
    if let SessionPhase::Failed(err) = handle.settled().await {
        anyhow::bail!("session failed: {err}");
    }

    tokio::time::sleep(Duration::from_secs(1)).await;
    runtime.shutdown();

    println!(
        "drew {} frames, {} objects still live",
        probe.count("].draw"),
        probe.live_objects()
    );
    Ok(())
}
