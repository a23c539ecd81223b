//! # Playback Coordinator
//!
//! Ties the pieces together: resolves a URI into a media source, drives the
//! [`BackingEngine`], feeds every engine callback through the
//! [`StateReconciler`] and turns the reconciled transitions into
//! [`PlaybackNotification`]s for listeners and the optional event bus.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle ──set_media──► Preparing ──Ready──► Ready/Playing ◄──► Paused
//!                                    │            │
//!                                 seek_to      Ended ──► Completed
//!                                    ▼
//!                                 Seeking
//!
//! any ──engine error──► Error ──release──► Released
//! ```
//!
//! `Released` accepts nothing. `Error` accepts only [`release`].
//!
//! ## Threading Model
//!
//! The coordinator is owned by the playback thread; commands and engine
//! callbacks must be serialized there. Other threads observe the current state
//! through [`state_handle`] or subscribe to the event bus.
//!
//! [`release`]: PlaybackCoordinator::release
//! [`state_handle`]: PlaybackCoordinator::state_handle

use crate::config::PlaybackConfig;
use crate::error::{EngineError, PlaybackError, Result};
use crate::notification::{
    ListenerId, ListenerRegistry, PlaybackListener, PlaybackNotification,
    PlaybackNotificationState, VideoSize,
};
use crate::reconciler::StateReconciler;
use crate::source::{
    MediaSource, MediaSourceAttributes, SourceKind, SourceResolver,
};
use crate::state::{RawStateSample, StateCode};
use crate::traits::BackingEngine;
use core_runtime::events::EventBus;
use core_runtime::logging::redact_uri;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// Identifies one loaded media item. A new id is minted on every
/// [`PlaybackCoordinator::set_media`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A notification tagged with the media session it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackEvent {
    /// `None` for notifications issued with no media loaded.
    pub session: Option<SessionId>,
    pub notification: PlaybackNotification,
}

/// Shared read access to the externally visible state.
pub type PlaybackStateHandle = Arc<RwLock<PlaybackNotificationState>>;

pub struct PlaybackCoordinator<E: BackingEngine> {
    engine: E,
    resolver: Arc<SourceResolver>,
    reconciler: StateReconciler,
    listeners: ListenerRegistry,
    events: Option<EventBus<PlaybackEvent>>,
    state: PlaybackStateHandle,
    user_agent: Option<String>,

    // Per-media tracking, cleared by `set_media` and `reset`.
    // `completed` is re-armed by seeks and by any state other than `Ended`.
    session: Option<SessionId>,
    source: Option<MediaSource>,
    prepared: bool,
    completed: bool,
    has_played: bool,
    seek_pending: bool,
    buffer_updates_active: bool,
    last_buffer_percent: Option<u8>,
    last_video_size: Option<VideoSize>,

    error: Option<EngineError>,
}

impl<E: BackingEngine> PlaybackCoordinator<E> {
    pub fn new(engine: E, resolver: Arc<SourceResolver>) -> Self {
        Self {
            engine,
            resolver,
            reconciler: StateReconciler::new(),
            listeners: ListenerRegistry::new(),
            events: None,
            state: Arc::new(RwLock::new(PlaybackNotificationState::Idle)),
            user_agent: None,
            session: None,
            source: None,
            prepared: false,
            completed: false,
            has_played: false,
            seek_pending: false,
            buffer_updates_active: false,
            last_buffer_percent: None,
            last_video_size: None,
            error: None,
        }
    }

    /// Validate `config` and build a coordinator with its resolver, user
    /// agent and an event bus of the configured capacity.
    pub fn from_config(engine: E, config: &PlaybackConfig) -> Result<Self> {
        config.validate()?;
        let resolver = Arc::new(config.build_resolver()?);

        let mut coordinator = Self::new(engine, resolver)
            .with_event_bus(EventBus::new(config.event_buffer_size));
        coordinator.user_agent = config.user_agent.clone();
        Ok(coordinator)
    }

    /// Broadcast every notification on `bus` in addition to the listeners.
    pub fn with_event_bus(mut self, bus: EventBus<PlaybackEvent>) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    pub fn add_listener(&mut self, listener: Box<dyn PlaybackListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn add_listener_fn<F>(&mut self, f: F) -> ListenerId
    where
        F: FnMut(&PlaybackNotification) + Send + 'static,
    {
        self.listeners.add_fn(f)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn event_bus(&self) -> Option<&EventBus<PlaybackEvent>> {
        self.events.as_ref()
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Resolve `uri`, hand the built source to the engine and start preparing.
    ///
    /// Per-media state (reconciler history, prepared/completed flags, last
    /// buffering and video size) is cleared first. If the engine rejects the
    /// source the coordinator enters the error state.
    pub fn set_media(&mut self, uri: &str) -> Result<SessionId> {
        self.ensure_usable()?;

        let builder = self.resolver.resolve(uri);
        let mut attributes = MediaSourceAttributes::new(uri);
        if let Some(user_agent) = &self.user_agent {
            attributes = attributes.with_user_agent(user_agent.clone());
        }
        let source = builder.build(&attributes);

        self.clear_media_tracking();
        let session = SessionId::new();
        self.session = Some(session);

        info!(
            uri = %redact_uri(uri),
            kind = ?source.kind,
            %session,
            "Loading media"
        );

        self.set_state(PlaybackNotificationState::Preparing);
        let prepared = self.engine.prepare(&source);
        self.source = Some(source);

        if let Err(e) = prepared {
            self.enter_error(e.clone());
            return Err(e.into());
        }
        Ok(session)
    }

    pub fn start(&mut self) -> Result<()> {
        self.ensure_media()?;
        debug!(session = ?self.session, "Start requested");
        self.engine.set_play_when_ready(true)?;
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        self.ensure_media()?;
        debug!(session = ?self.session, "Pause requested");
        self.engine.set_play_when_ready(false)?;
        Ok(())
    }

    /// Seek to `position_ms`.
    ///
    /// Records a synthetic `Seeking` entry so the engine's following
    /// buffering/ready callbacks can be recognized as seek completion. A seek
    /// the engine rejects leaves history and state untouched.
    pub fn seek_to(&mut self, position_ms: u64) -> Result<()> {
        self.ensure_media()?;

        debug!(position_ms, session = ?self.session, "Seek requested");
        self.engine.seek_to(position_ms)?;

        let play_when_ready = self.reconciler.last_play_when_ready();
        self.reconciler
            .record(RawStateSample::new(play_when_ready, StateCode::Seeking));
        self.seek_pending = true;
        self.completed = false;
        self.set_state(PlaybackNotificationState::Seeking);
        Ok(())
    }

    /// Halt playback. The media stays loaded but must be prepared again by
    /// the engine, so the next `Ready` reports `Prepared` once more.
    pub fn stop(&mut self) -> Result<()> {
        self.ensure_usable()?;
        self.engine.stop()?;

        self.reconciler.reset();
        self.prepared = false;
        self.completed = false;
        self.seek_pending = false;
        self.buffer_updates_active = false;
        self.set_state(PlaybackNotificationState::Stopped);
        Ok(())
    }

    /// Stop the engine and unload the current media.
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_usable()?;
        self.engine.stop()?;

        self.clear_media_tracking();
        self.session = None;
        self.source = None;
        self.set_state(PlaybackNotificationState::Idle);
        Ok(())
    }

    /// Free the engine. Terminal: every later command fails with
    /// [`PlaybackError::Released`] and engine callbacks are ignored.
    pub fn release(&mut self) -> Result<()> {
        if self.state() == PlaybackNotificationState::Released {
            return Err(PlaybackError::Released);
        }

        info!(session = ?self.session, "Releasing player");
        self.engine.release();
        self.set_state(PlaybackNotificationState::Released);

        self.listeners.clear();
        self.source = None;
        self.buffer_updates_active = false;
        Ok(())
    }

    // ========================================================================
    // Engine Callbacks
    // ========================================================================

    /// Engine reported `state` with the given play-when-ready flag.
    pub fn on_engine_state(&mut self, play_when_ready: bool, state: StateCode) {
        if self.ignore_callback("state") {
            return;
        }

        if !self
            .reconciler
            .record(RawStateSample::new(play_when_ready, state))
        {
            trace!(?state, play_when_ready, "Duplicate engine state");
            return;
        }
        debug!(?state, play_when_ready, session = ?self.session, "Engine state");

        // Leaving the end of the media re-arms completion.
        if !matches!(state, StateCode::Ended | StateCode::Other(_)) {
            self.completed = false;
        }

        match state {
            StateCode::Ready => self.buffer_updates_active = true,
            StateCode::Idle | StateCode::Ended => self.buffer_updates_active = false,
            _ => {}
        }

        let next = self.derive_state(play_when_ready, state);
        self.set_state(next);
        if next == PlaybackNotificationState::Playing {
            self.has_played = true;
        }

        if state == StateCode::Ready && !self.prepared {
            self.prepared = true;
            self.dispatch(PlaybackNotification::Prepared);
        }

        if self.seek_pending && self.reconciler.is_seek_completed() {
            self.seek_pending = false;
            let position_ms = self.engine.current_position_ms();
            self.dispatch(PlaybackNotification::SeekCompleted { position_ms });
        }

        if state == StateCode::Ended && !self.completed {
            self.completed = true;
            self.dispatch(PlaybackNotification::Completed);
        }
    }

    /// Engine failed. Enters the error state; later failures are dropped.
    pub fn on_engine_error(&mut self, cause: EngineError) {
        if self.ignore_callback("error") {
            return;
        }
        self.enter_error(cause);
    }

    /// Engine reported the buffered percentage. Out-of-range values are
    /// clamped; repeats and reports outside the buffering window are dropped.
    pub fn on_buffering_update(&mut self, percent: i32) {
        if self.ignore_callback("buffering") || !self.buffer_updates_active {
            return;
        }

        let percent = percent.clamp(0, 100) as u8;
        if self.last_buffer_percent == Some(percent) {
            return;
        }
        self.last_buffer_percent = Some(percent);
        self.dispatch(PlaybackNotification::BufferingUpdate(percent));
    }

    pub fn on_video_size_changed(&mut self, size: VideoSize) {
        if self.ignore_callback("video size") || self.last_video_size == Some(size) {
            return;
        }
        self.last_video_size = Some(size);
        self.dispatch(PlaybackNotification::VideoSizeChanged(size));
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn state(&self) -> PlaybackNotificationState {
        *self.state.read()
    }

    pub fn state_handle(&self) -> PlaybackStateHandle {
        Arc::clone(&self.state)
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session
    }

    pub fn current_source(&self) -> Option<&MediaSource> {
        self.source.as_ref()
    }

    pub fn current_source_kind(&self) -> Option<SourceKind> {
        self.source.as_ref().map(|source| source.kind.clone())
    }

    /// Whether buffering percentages are currently forwarded: from the first
    /// `Ready` until `Idle` or `Ended`.
    pub fn wants_buffer_updates(&self) -> bool {
        self.buffer_updates_active
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    pub fn current_position_ms(&self) -> u64 {
        self.engine.current_position_ms()
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.engine.duration_ms()
    }

    pub fn reconciler(&self) -> &StateReconciler {
        &self.reconciler
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn ensure_usable(&self) -> Result<()> {
        match self.state() {
            PlaybackNotificationState::Released => Err(PlaybackError::Released),
            PlaybackNotificationState::Error => Err(PlaybackError::Errored(
                self.error
                    .clone()
                    .unwrap_or_else(|| EngineError::new("unknown engine failure")),
            )),
            _ => Ok(()),
        }
    }

    fn ensure_media(&self) -> Result<()> {
        self.ensure_usable()?;
        if self.source.is_none() {
            return Err(PlaybackError::NoMediaLoaded);
        }
        Ok(())
    }

    fn ignore_callback(&self, kind: &str) -> bool {
        match self.state() {
            PlaybackNotificationState::Released => {
                warn!(callback = kind, "Ignoring engine callback after release");
                true
            }
            PlaybackNotificationState::Error => {
                trace!(callback = kind, "Ignoring engine callback in error state");
                true
            }
            _ => false,
        }
    }

    fn clear_media_tracking(&mut self) {
        self.reconciler.reset();
        self.prepared = false;
        self.completed = false;
        self.has_played = false;
        self.seek_pending = false;
        self.buffer_updates_active = false;
        self.last_buffer_percent = None;
        self.last_video_size = None;
    }

    fn derive_state(&self, play_when_ready: bool, state: StateCode) -> PlaybackNotificationState {
        use PlaybackNotificationState as S;

        let current = self.state();
        match state {
            StateCode::Ended => S::Completed,
            StateCode::Ready if play_when_ready => S::Playing,
            StateCode::Ready => {
                if self.reconciler.is_paused()
                    || self.has_played
                    || matches!(current, S::Paused | S::Playing)
                {
                    S::Paused
                } else {
                    S::Ready
                }
            }
            StateCode::Buffering if self.prepared => S::Buffering,
            StateCode::Buffering => S::Preparing,
            StateCode::Idle if current == S::Stopped => S::Stopped,
            StateCode::Idle => S::Idle,
            StateCode::Seeking => S::Seeking,
            StateCode::Other(_) => current,
        }
    }

    fn enter_error(&mut self, cause: EngineError) {
        warn!(error = %cause, session = ?self.session, "Engine error");
        self.error = Some(cause.clone());
        self.buffer_updates_active = false;
        self.set_state(PlaybackNotificationState::Error);
        self.dispatch(PlaybackNotification::Error(cause));
    }

    /// Returns `true` if the state actually changed.
    fn set_state(&mut self, next: PlaybackNotificationState) -> bool {
        let previous = {
            let mut state = self.state.write();
            let previous = *state;
            if !previous.can_transition_to(next) {
                return false;
            }
            *state = next;
            previous
        };

        debug!(?previous, ?next, session = ?self.session, "Playback state changed");
        self.dispatch(PlaybackNotification::StateChanged(next));
        true
    }

    fn dispatch(&mut self, notification: PlaybackNotification) {
        trace!(notification = notification.name(), "Dispatching");
        self.listeners.dispatch(&notification);

        if let Some(bus) = &self.events {
            let event = PlaybackEvent {
                session: self.session,
                notification,
            };
            if bus.emit(event).is_err() {
                trace!("No event bus subscribers");
            }
        }
    }
}

impl<E: BackingEngine> fmt::Debug for PlaybackCoordinator<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackCoordinator")
            .field("state", &self.state())
            .field("session", &self.session)
            .field("source", &self.current_source_kind())
            .field("prepared", &self.prepared)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}
