//! # Playback Reconciliation & Source Resolution
//!
//! The control layer between a host media player API and the backing media
//! engine.
//!
//! ## Overview
//!
//! This module handles:
//! - Reconciling the engine's raw state callbacks into a short history and
//!   detecting seek completion and genuine pauses
//! - Resolving a media URI to a source builder by scheme, extension or loose
//!   pattern, falling back to progressive download
//! - Deriving lifecycle notifications (prepared, completed, seek completed,
//!   buffering, video size) and dispatching them to listeners
//! - Choosing between the media engine and the native player per device

pub mod backend;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod history;
pub mod notification;
pub mod reconciler;
pub mod source;
pub mod state;
pub mod traits;

pub use backend::{BackendSelector, DeviceProfile, NonCompatibleDevice, PlayerBackend};
pub use config::{PlaybackConfig, RouteConfig};
pub use coordinator::{PlaybackCoordinator, PlaybackEvent, PlaybackStateHandle, SessionId};
pub use error::{EngineError, PlaybackError, Result};
pub use history::{StateHistory, HISTORY_LEN};
pub use notification::{
    ListenerId, ListenerRegistry, PlaybackListener, PlaybackNotification,
    PlaybackNotificationState, VideoSize,
};
pub use reconciler::StateReconciler;
pub use source::{
    uri_extension, uri_scheme, MediaSource, MediaSourceAttributes, MediaSourceBuilder,
    SourceKind, SourceResolver, SourceRoute, StandardSourceBuilder,
};
pub use state::{CombinedState, RawStateSample, StateCode, FLAG_PLAY_WHEN_READY};
pub use traits::BackingEngine;
