//! Integration tests for the playback coordinator
//!
//! This test suite verifies:
//! - Engine commands issued for each control operation (mocked engine)
//! - Notifications derived from engine callbacks, each fired once
//! - Error and release lifecycle
//! - Event bus delivery tagged with the media session

use core_playback::{
    BackingEngine, EngineError, MediaSource, PlaybackConfig, PlaybackCoordinator, PlaybackError,
    PlaybackListener, PlaybackNotification, PlaybackNotificationState, SourceKind,
    SourceResolver, StateCode, VideoSize,
};
use mockall::mock;
use mockall::predicate::*;
use std::sync::{Arc, Mutex};

mock! {
    Engine {}

    impl BackingEngine for Engine {
        fn prepare(&mut self, source: &MediaSource) -> Result<(), EngineError>;
        fn set_play_when_ready(&mut self, play_when_ready: bool) -> Result<(), EngineError>;
        fn seek_to(&mut self, position_ms: u64) -> Result<(), EngineError>;
        fn stop(&mut self) -> Result<(), EngineError>;
        fn release(&mut self);
        fn current_position_ms(&self) -> u64;
        fn duration_ms(&self) -> Option<u64>;
    }
}

type Log = Arc<Mutex<Vec<PlaybackNotification>>>;

fn permissive_engine() -> MockEngine {
    let mut engine = MockEngine::new();
    engine.expect_prepare().returning(|_| Ok(()));
    engine.expect_set_play_when_ready().returning(|_| Ok(()));
    engine.expect_seek_to().returning(|_| Ok(()));
    engine.expect_stop().returning(|| Ok(()));
    engine.expect_release().return_const(());
    engine.expect_current_position_ms().return_const(0u64);
    engine.expect_duration_ms().return_const(Some(120_000u64));
    engine
}

fn player_with(engine: MockEngine) -> (PlaybackCoordinator<MockEngine>, Log) {
    let mut player =
        PlaybackCoordinator::new(engine, Arc::new(SourceResolver::with_default_routes()));
    let log: Log = Arc::default();
    let sink = Arc::clone(&log);
    player.add_listener_fn(move |n| sink.lock().unwrap().push(n.clone()));
    (player, log)
}

fn count(log: &Log, predicate: impl Fn(&PlaybackNotification) -> bool) -> usize {
    log.lock().unwrap().iter().filter(|n| predicate(n)).count()
}

fn states(log: &Log) -> Vec<PlaybackNotificationState> {
    log.lock()
        .unwrap()
        .iter()
        .filter_map(|n| match n {
            PlaybackNotification::StateChanged(state) => Some(*state),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Commands
// ============================================================================

#[test]
fn test_set_media_prepares_resolved_source() {
    let mut engine = MockEngine::new();
    engine
        .expect_prepare()
        .withf(|source| source.kind == SourceKind::Dash && source.uri.ends_with("manifest.mpd"))
        .times(1)
        .returning(|_| Ok(()));

    let (mut player, log) = player_with(engine);
    player.set_media("https://cdn.test/dash/manifest.mpd").unwrap();

    assert_eq!(player.current_source_kind(), Some(SourceKind::Dash));
    assert_eq!(states(&log), vec![PlaybackNotificationState::Preparing]);
}

#[test]
fn test_start_and_pause_toggle_play_when_ready() {
    let mut engine = MockEngine::new();
    engine.expect_prepare().returning(|_| Ok(()));
    engine
        .expect_set_play_when_ready()
        .with(eq(true))
        .times(1)
        .returning(|_| Ok(()));
    engine
        .expect_set_play_when_ready()
        .with(eq(false))
        .times(1)
        .returning(|_| Ok(()));

    let (mut player, _) = player_with(engine);
    player.set_media("https://cdn.test/clip.mp4").unwrap();
    player.start().unwrap();
    player.pause().unwrap();
}

#[test]
fn test_engine_command_failure_is_propagated() {
    let mut engine = MockEngine::new();
    engine.expect_prepare().returning(|_| Ok(()));
    engine
        .expect_seek_to()
        .returning(|_| Err(EngineError::new("not seekable").with_code(7)));

    let (mut player, _) = player_with(engine);
    player.set_media("rtsp://camera.local/live").unwrap();

    let err = player.seek_to(5_000).unwrap_err();
    assert!(err.is_engine_error());
    assert_eq!(err.to_string(), "Engine error: not seekable (code 7)");
    assert_eq!(player.state(), PlaybackNotificationState::Preparing);
    assert_eq!(player.reconciler().most_recent_combined().state(), StateCode::Idle);
}

#[test]
fn test_rejected_seek_leaves_no_pending_seek() {
    let mut engine = MockEngine::new();
    engine.expect_prepare().returning(|_| Ok(()));
    engine
        .expect_seek_to()
        .returning(|_| Err(EngineError::new("not seekable")));
    engine.expect_current_position_ms().return_const(0u64);

    let (mut player, log) = player_with(engine);
    player.set_media("https://cdn.test/clip.mp4").unwrap();
    player.on_engine_state(true, StateCode::Ready);

    assert!(player.seek_to(30_000).is_err());
    assert_eq!(player.state(), PlaybackNotificationState::Playing);
    assert_eq!(
        player.reconciler().most_recent_combined().state(),
        StateCode::Ready
    );

    player.on_engine_state(true, StateCode::Buffering);
    player.on_engine_state(true, StateCode::Ready);
    assert_eq!(
        count(&log, |n| matches!(n, PlaybackNotification::SeekCompleted { .. })),
        0
    );
}

// ============================================================================
// Derived Notifications
// ============================================================================

#[test]
fn test_prepared_fires_once_per_media() {
    let (mut player, log) = player_with(permissive_engine());
    player.set_media("https://cdn.test/clip.mp4").unwrap();

    player.on_engine_state(false, StateCode::Buffering);
    player.on_engine_state(false, StateCode::Ready);
    player.on_engine_state(true, StateCode::Ready);
    player.on_engine_state(true, StateCode::Buffering);
    player.on_engine_state(true, StateCode::Ready);

    assert_eq!(count(&log, |n| *n == PlaybackNotification::Prepared), 1);

    player.set_media("https://cdn.test/next.mp4").unwrap();
    player.on_engine_state(false, StateCode::Ready);
    assert_eq!(count(&log, |n| *n == PlaybackNotification::Prepared), 2);
}

#[test]
fn test_duplicate_callbacks_fire_nothing() {
    let (mut player, log) = player_with(permissive_engine());
    player.set_media("https://cdn.test/clip.mp4").unwrap();
    player.on_engine_state(true, StateCode::Ready);
    let before = log.lock().unwrap().len();

    player.on_engine_state(true, StateCode::Ready);
    player.on_engine_state(true, StateCode::Ready);
    assert_eq!(log.lock().unwrap().len(), before);
}

#[test]
fn test_seek_completed_reports_engine_position() {
    let mut engine = MockEngine::new();
    engine.expect_prepare().returning(|_| Ok(()));
    engine.expect_seek_to().with(eq(42_000)).returning(|_| Ok(()));
    engine.expect_current_position_ms().return_const(42_000u64);

    let (mut player, log) = player_with(engine);
    player.set_media("https://cdn.test/clip.mp4").unwrap();
    player.on_engine_state(true, StateCode::Ready);

    player.seek_to(42_000).unwrap();
    assert_eq!(player.state(), PlaybackNotificationState::Seeking);

    player.on_engine_state(true, StateCode::Buffering);
    player.on_engine_state(true, StateCode::Ready);

    let seeks: Vec<_> = log
        .lock()
        .unwrap()
        .iter()
        .filter_map(|n| match n {
            PlaybackNotification::SeekCompleted { position_ms } => Some(*position_ms),
            _ => None,
        })
        .collect();
    assert_eq!(seeks, vec![42_000]);
    assert_eq!(player.state(), PlaybackNotificationState::Playing);
}

#[test]
fn test_seek_completed_when_buffering_precedes_seek_marker() {
    let (mut player, log) = player_with(permissive_engine());
    player.set_media("https://cdn.test/clip.mp4").unwrap();
    player.on_engine_state(false, StateCode::Ready);
    player.on_engine_state(false, StateCode::Buffering);

    player.seek_to(1_000).unwrap();
    player.on_engine_state(false, StateCode::Ready);

    assert_eq!(
        count(&log, |n| matches!(n, PlaybackNotification::SeekCompleted { .. })),
        1
    );
}

#[test]
fn test_completion_fires_once() {
    let (mut player, log) = player_with(permissive_engine());
    player.set_media("https://cdn.test/clip.mp4").unwrap();
    player.on_engine_state(true, StateCode::Ready);
    player.on_engine_state(true, StateCode::Ended);
    player.on_engine_state(false, StateCode::Ended);

    assert_eq!(count(&log, |n| *n == PlaybackNotification::Completed), 1);
    assert_eq!(player.state(), PlaybackNotificationState::Completed);
    assert!(!player.wants_buffer_updates());
}

#[test]
fn test_completion_fires_again_after_replay() {
    let (mut player, log) = player_with(permissive_engine());
    player.set_media("https://cdn.test/clip.mp4").unwrap();
    player.on_engine_state(true, StateCode::Ready);
    player.on_engine_state(true, StateCode::Ended);

    player.seek_to(0).unwrap();
    player.on_engine_state(true, StateCode::Buffering);
    player.on_engine_state(true, StateCode::Ready);
    assert_eq!(player.state(), PlaybackNotificationState::Playing);
    player.on_engine_state(true, StateCode::Ended);

    assert_eq!(count(&log, |n| *n == PlaybackNotification::Completed), 2);
    assert_eq!(player.state(), PlaybackNotificationState::Completed);
}

#[test]
fn test_completion_rearmed_when_playback_restarts_without_seek() {
    let (mut player, log) = player_with(permissive_engine());
    player.set_media("https://cdn.test/clip.mp4").unwrap();
    player.on_engine_state(true, StateCode::Ready);
    player.on_engine_state(true, StateCode::Ended);
    player.on_engine_state(false, StateCode::Ended);
    assert_eq!(count(&log, |n| *n == PlaybackNotification::Completed), 1);

    player.on_engine_state(true, StateCode::Buffering);
    player.on_engine_state(true, StateCode::Ready);
    player.on_engine_state(true, StateCode::Ended);
    assert_eq!(count(&log, |n| *n == PlaybackNotification::Completed), 2);
}

#[test]
fn test_stop_requires_prepare_again() {
    let (mut player, log) = player_with(permissive_engine());
    player.set_media("https://cdn.test/clip.mp4").unwrap();
    player.on_engine_state(true, StateCode::Ready);
    assert!(player.is_prepared());

    player.stop().unwrap();
    assert!(!player.is_prepared());
    assert_eq!(player.state(), PlaybackNotificationState::Stopped);

    player.on_engine_state(false, StateCode::Buffering);
    assert_eq!(player.state(), PlaybackNotificationState::Preparing);

    player.on_engine_state(false, StateCode::Ready);
    assert_eq!(count(&log, |n| *n == PlaybackNotification::Prepared), 2);
}

#[test]
fn test_state_sequence_for_play_pause() {
    let (mut player, log) = player_with(permissive_engine());
    player.set_media("https://cdn.test/clip.mp4").unwrap();
    player.on_engine_state(false, StateCode::Buffering);
    player.on_engine_state(false, StateCode::Ready);
    player.on_engine_state(true, StateCode::Ready);
    player.on_engine_state(true, StateCode::Buffering);
    player.on_engine_state(true, StateCode::Ready);
    player.on_engine_state(false, StateCode::Ready);

    use PlaybackNotificationState::*;
    assert_eq!(
        states(&log),
        vec![Preparing, Ready, Playing, Buffering, Playing, Paused]
    );
}

#[test]
fn test_buffering_updates_only_inside_window() {
    let (mut player, log) = player_with(permissive_engine());
    player.set_media("https://cdn.test/clip.mp4").unwrap();

    player.on_buffering_update(5);
    assert!(!player.wants_buffer_updates());

    player.on_engine_state(true, StateCode::Ready);
    player.on_buffering_update(20);
    player.on_buffering_update(20);
    player.on_buffering_update(250);
    player.on_buffering_update(-3);

    player.on_engine_state(true, StateCode::Ended);
    player.on_buffering_update(40);

    let updates: Vec<u8> = log
        .lock()
        .unwrap()
        .iter()
        .filter_map(|n| match n {
            PlaybackNotification::BufferingUpdate(p) => Some(*p),
            _ => None,
        })
        .collect();
    assert_eq!(updates, vec![20, 100, 0]);
}

#[test]
fn test_video_size_deduplicated() {
    let (mut player, log) = player_with(permissive_engine());
    player.set_media("https://cdn.test/clip.mp4").unwrap();

    player.on_video_size_changed(VideoSize::new(1280, 720));
    player.on_video_size_changed(VideoSize::new(1280, 720));
    player.on_video_size_changed(VideoSize::new(1280, 720).with_rotation(90));

    assert_eq!(
        count(&log, |n| matches!(n, PlaybackNotification::VideoSizeChanged(_))),
        2
    );
}

// ============================================================================
// Error & Release
// ============================================================================

#[derive(Default)]
struct ErrorCounter {
    errors: Arc<Mutex<Vec<String>>>,
}

impl PlaybackListener for ErrorCounter {
    fn on_error(&mut self, cause: &EngineError) {
        self.errors.lock().unwrap().push(cause.to_string());
    }
}

#[test]
fn test_engine_error_is_absorbing() {
    let (mut player, _) = player_with(permissive_engine());
    let counter = ErrorCounter::default();
    let errors = Arc::clone(&counter.errors);
    player.add_listener(Box::new(counter));

    player.set_media("https://cdn.test/clip.mp4").unwrap();
    player.on_engine_error(EngineError::new("decoder crashed"));
    player.on_engine_error(EngineError::new("second failure"));
    player.on_engine_state(true, StateCode::Ready);

    assert_eq!(*errors.lock().unwrap(), vec!["decoder crashed".to_string()]);
    assert_eq!(player.state(), PlaybackNotificationState::Error);
    assert!(matches!(player.start(), Err(PlaybackError::Errored(_))));

    player.release().unwrap();
    assert_eq!(player.state(), PlaybackNotificationState::Released);
}

#[test]
fn test_release_calls_engine_once() {
    let mut engine = MockEngine::new();
    engine.expect_prepare().returning(|_| Ok(()));
    engine.expect_release().times(1).return_const(());

    let (mut player, log) = player_with(engine);
    player.set_media("https://cdn.test/clip.mp4").unwrap();
    player.release().unwrap();

    assert!(matches!(player.release(), Err(PlaybackError::Released)));
    assert!(matches!(
        player.set_media("https://cdn.test/clip.mp4"),
        Err(PlaybackError::Released)
    ));
    assert_eq!(
        states(&log).last(),
        Some(&PlaybackNotificationState::Released)
    );
}

// ============================================================================
// Event Bus
// ============================================================================

#[tokio::test]
async fn test_events_tagged_with_session() {
    let mut player = PlaybackCoordinator::from_config(permissive_engine(), &PlaybackConfig::default())
        .unwrap();
    let mut events = player.event_bus().unwrap().subscribe();

    let session = player.set_media("https://cdn.test/live/index.m3u8").unwrap();
    player.on_engine_state(false, StateCode::Ready);

    let first = events.recv().await.unwrap();
    assert_eq!(first.session, Some(session));
    assert_eq!(
        first.notification,
        PlaybackNotification::StateChanged(PlaybackNotificationState::Preparing)
    );

    let second = events.recv().await.unwrap();
    assert_eq!(
        second.notification,
        PlaybackNotification::StateChanged(PlaybackNotificationState::Ready)
    );
    let third = events.recv().await.unwrap();
    assert_eq!(third.notification, PlaybackNotification::Prepared);
}

#[test]
fn test_from_config_rejects_invalid_config() {
    let config = PlaybackConfig {
        event_buffer_size: 0,
        ..Default::default()
    };
    let err = PlaybackCoordinator::from_config(MockEngine::new(), &config).unwrap_err();
    assert!(err.is_configuration_error());
}

#[test]
fn test_state_handle_observed_from_other_thread() {
    let (mut player, _) = player_with(permissive_engine());
    let handle = player.state_handle();
    player.set_media("https://cdn.test/clip.mp4").unwrap();
    player.on_engine_state(true, StateCode::Ready);

    let observed = std::thread::spawn(move || *handle.read()).join().unwrap();
    assert_eq!(observed, PlaybackNotificationState::Playing);
}
