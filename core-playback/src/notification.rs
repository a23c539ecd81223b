//! # Playback Notifications
//!
//! The public surface of the reconciler: the externally visible playback
//! state, the notification payloads derived from engine callbacks, and the
//! registry that dispatches them to listeners.
//!
//! Notifications are a single tagged enum ([`PlaybackNotification`]) rather
//! than a family of single-method listener interfaces. Listeners implement
//! only the callbacks they care about; every [`PlaybackListener`] method has
//! a no-op default.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Playback state exposed to clients.
///
/// `Released` and `Error` are terminal: once entered, only `Error -> Released`
/// is still permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackNotificationState {
    Idle,
    Preparing,
    Buffering,
    Seeking,
    Ready,
    Playing,
    Paused,
    Completed,
    Stopped,
    Released,
    Error,
}

impl PlaybackNotificationState {
    /// Returns `true` for `Released` and `Error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Released | Self::Error)
    }

    /// Returns `true` while media is loaded and not finished.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Preparing
                | Self::Buffering
                | Self::Seeking
                | Self::Ready
                | Self::Playing
                | Self::Paused
        )
    }

    /// Whether moving from `self` to `next` is a real, permitted transition.
    pub fn can_transition_to(&self, next: PlaybackNotificationState) -> bool {
        if *self == next {
            return false;
        }
        match self {
            Self::Released => false,
            Self::Error => next == Self::Released,
            _ => true,
        }
    }
}

impl Default for PlaybackNotificationState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Video dimensions as reported by the engine's video renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoSize {
    pub width: u32,
    pub height: u32,
    /// Rotation the renderer did not apply and the surface must apply.
    pub unapplied_rotation_degrees: i32,
    pub pixel_aspect_ratio: f32,
}

impl VideoSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            unapplied_rotation_degrees: 0,
            pixel_aspect_ratio: 1.0,
        }
    }

    pub fn with_rotation(mut self, degrees: i32) -> Self {
        self.unapplied_rotation_degrees = degrees;
        self
    }

    pub fn with_pixel_aspect_ratio(mut self, ratio: f32) -> Self {
        self.pixel_aspect_ratio = ratio;
        self
    }

    /// Display aspect ratio, accounting for non-square pixels.
    ///
    /// Returns `0.0` for a zero height.
    pub fn display_aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f32 * self.pixel_aspect_ratio / self.height as f32
    }
}

/// A single lifecycle notification.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackNotification {
    /// The externally visible state changed.
    StateChanged(PlaybackNotificationState),
    /// The media became ready for the first time since it was set.
    Prepared,
    /// Buffered percentage of the media, `0..=100`.
    BufferingUpdate(u8),
    /// A seek requested by the caller finished.
    SeekCompleted { position_ms: u64 },
    /// Playback reached the end of the media.
    Completed,
    /// The backing engine failed.
    Error(EngineError),
    VideoSizeChanged(VideoSize),
}

impl PlaybackNotification {
    /// Short name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            PlaybackNotification::StateChanged(_) => "state_changed",
            PlaybackNotification::Prepared => "prepared",
            PlaybackNotification::BufferingUpdate(_) => "buffering_update",
            PlaybackNotification::SeekCompleted { .. } => "seek_completed",
            PlaybackNotification::Completed => "completed",
            PlaybackNotification::Error(_) => "error",
            PlaybackNotification::VideoSizeChanged(_) => "video_size_changed",
        }
    }
}

/// Receives lifecycle notifications on the playback thread.
///
/// All methods default to no-ops. Override [`on_notification`] instead to
/// receive the raw tagged payload.
///
/// [`on_notification`]: PlaybackListener::on_notification
pub trait PlaybackListener: Send {
    fn on_state_changed(&mut self, _state: PlaybackNotificationState) {}

    fn on_prepared(&mut self) {}

    fn on_buffering_update(&mut self, _percent: u8) {}

    fn on_seek_completed(&mut self, _position_ms: u64) {}

    fn on_completed(&mut self) {}

    fn on_error(&mut self, _cause: &EngineError) {}

    fn on_video_size_changed(&mut self, _size: VideoSize) {}

    fn on_notification(&mut self, notification: &PlaybackNotification) {
        match notification {
            PlaybackNotification::StateChanged(state) => self.on_state_changed(*state),
            PlaybackNotification::Prepared => self.on_prepared(),
            PlaybackNotification::BufferingUpdate(percent) => self.on_buffering_update(*percent),
            PlaybackNotification::SeekCompleted { position_ms } => {
                self.on_seek_completed(*position_ms)
            }
            PlaybackNotification::Completed => self.on_completed(),
            PlaybackNotification::Error(cause) => self.on_error(cause),
            PlaybackNotification::VideoSizeChanged(size) => self.on_video_size_changed(*size),
        }
    }
}

struct FnListener<F>(F);

impl<F> PlaybackListener for FnListener<F>
where
    F: FnMut(&PlaybackNotification) + Send,
{
    fn on_notification(&mut self, notification: &PlaybackNotification) {
        (self.0)(notification)
    }
}

/// Handle returned by [`ListenerRegistry::add`], used to remove a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Registration slots for playback listeners.
///
/// Listeners are notified in registration order.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: u64,
    listeners: Vec<(ListenerId, Box<dyn PlaybackListener>)>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, listener: Box<dyn PlaybackListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Register a closure receiving every notification.
    pub fn add_fn<F>(&mut self, f: F) -> ListenerId
    where
        F: FnMut(&PlaybackNotification) + Send + 'static,
    {
        self.add(Box::new(FnListener(f)))
    }

    /// Returns `true` if a listener with `id` was registered.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn dispatch(&mut self, notification: &PlaybackNotification) {
        for (_, listener) in &mut self.listeners {
            listener.on_notification(notification);
        }
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
