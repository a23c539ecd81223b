//! Playback coordinator demonstration
//!
//! Drives a simulated engine through a load, play, seek, pause and
//! completion cycle and prints every notification.
//!
//! Run with:
//! ```bash
//! # Pretty format (default in debug)
//! cargo run --example playback_demo
//!
//! # JSON format, custom URI
//! cargo run --example playback_demo -- json "https://cdn.example.com/dash/manifest.mpd?token=secret"
//! ```

use core_playback::{
    BackendSelector, BackingEngine, DeviceProfile, EngineError, MediaSource, PlaybackConfig,
    PlaybackCoordinator, StateCode, VideoSize,
};
use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
use std::env;
use tracing::info;

/// Engine stand-in that only tracks position.
#[derive(Default)]
struct SimulatedEngine {
    position_ms: u64,
}

impl BackingEngine for SimulatedEngine {
    fn prepare(&mut self, source: &MediaSource) -> Result<(), EngineError> {
        info!(kind = ?source.kind, "Engine preparing");
        Ok(())
    }

    fn set_play_when_ready(&mut self, play_when_ready: bool) -> Result<(), EngineError> {
        info!(play_when_ready, "Engine play-when-ready");
        Ok(())
    }

    fn seek_to(&mut self, position_ms: u64) -> Result<(), EngineError> {
        self.position_ms = position_ms;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    fn release(&mut self) {}

    fn current_position_ms(&self) -> u64 {
        self.position_ms
    }

    fn duration_ms(&self) -> Option<u64> {
        Some(90_000)
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::default(),
    };
    let uri = args
        .get(2)
        .cloned()
        .unwrap_or_else(|| "https://cdn.example.com/live/index.m3u8?token=secret".to_string());

    init_logging(
        LoggingConfig::default()
            .with_format(format)
            .with_level(LogLevel::Debug),
    )
    .expect("Failed to initialize logging");

    let config = PlaybackConfig::default();
    let backend = config
        .build_backend_selector()
        .select(&DeviceProfile::new("Google", "Pixel 8", 34));
    info!(?backend, "Backend for this device");
    info!(
        fire_tv = ?BackendSelector::default().select(&DeviceProfile::new("Amazon", "AFTMM", 25)),
        "Backend for a Fire TV"
    );

    let mut player = PlaybackCoordinator::from_config(SimulatedEngine::default(), &config)
        .expect("Invalid playback configuration");
    player.add_listener_fn(|notification| println!("-> {notification:?}"));

    player.set_media(&uri).expect("Failed to load media");
    player.on_engine_state(false, StateCode::Buffering);
    player.on_engine_state(false, StateCode::Ready);
    player.on_video_size_changed(VideoSize::new(1920, 1080));

    player.start().expect("Failed to start");
    player.on_engine_state(true, StateCode::Ready);
    player.on_buffering_update(35);

    player.seek_to(60_000).expect("Failed to seek");
    player.on_engine_state(true, StateCode::Buffering);
    player.on_engine_state(true, StateCode::Ready);

    player.pause().expect("Failed to pause");
    player.on_engine_state(false, StateCode::Ready);

    player.start().expect("Failed to resume");
    player.on_engine_state(true, StateCode::Ready);
    player.on_engine_state(true, StateCode::Ended);

    player.release().expect("Failed to release");
    info!(state = ?player.state(), "Demo finished");
}
