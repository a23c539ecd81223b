//! # Backing Engine Abstraction
//!
//! The control layer never decodes or renders media itself. It drives a
//! platform media engine through [`BackingEngine`] and receives the engine's
//! callbacks through the `on_engine_*` methods of
//! [`PlaybackCoordinator`](crate::coordinator::PlaybackCoordinator).
//!
//! ## Threading Model
//!
//! Commands and callbacks are serialized on a single playback thread. The
//! trait is synchronous; implementations that talk to an asynchronous
//! platform API queue the command and report the outcome later as a state
//! callback.
//!
//! ## Usage Example
//!
//! ```rust
//! use core_playback::error::EngineError;
//! use core_playback::source::MediaSource;
//! use core_playback::traits::BackingEngine;
//!
//! #[derive(Default)]
//! struct SilentEngine {
//!     position_ms: u64,
//! }
//!
//! impl BackingEngine for SilentEngine {
//!     fn prepare(&mut self, _source: &MediaSource) -> Result<(), EngineError> {
//!         Ok(())
//!     }
//!     fn set_play_when_ready(&mut self, _play_when_ready: bool) -> Result<(), EngineError> {
//!         Ok(())
//!     }
//!     fn seek_to(&mut self, position_ms: u64) -> Result<(), EngineError> {
//!         self.position_ms = position_ms;
//!         Ok(())
//!     }
//!     fn stop(&mut self) -> Result<(), EngineError> {
//!         Ok(())
//!     }
//!     fn release(&mut self) {}
//!     fn current_position_ms(&self) -> u64 {
//!         self.position_ms
//!     }
//!     fn duration_ms(&self) -> Option<u64> {
//!         None
//!     }
//! }
//! ```

use crate::error::EngineError;
use crate::source::MediaSource;

/// Commands the control layer issues to the platform media engine.
pub trait BackingEngine: Send {
    /// Load `source` and start buffering. Playback begins once
    /// play-when-ready is set and the engine reaches ready.
    fn prepare(&mut self, source: &MediaSource) -> Result<(), EngineError>;

    fn set_play_when_ready(&mut self, play_when_ready: bool) -> Result<(), EngineError>;

    /// Request a seek. Completion is observed through state callbacks.
    fn seek_to(&mut self, position_ms: u64) -> Result<(), EngineError>;

    /// Halt playback and drop buffered media. The engine may be prepared again.
    fn stop(&mut self) -> Result<(), EngineError>;

    /// Free all engine resources. Infallible; the engine is unusable afterwards.
    fn release(&mut self);

    fn current_position_ms(&self) -> u64;

    /// Media duration, `None` while unknown or for live streams.
    fn duration_ms(&self) -> Option<u64>;
}

impl<E: BackingEngine + ?Sized> BackingEngine for Box<E> {
    fn prepare(&mut self, source: &MediaSource) -> Result<(), EngineError> {
        (**self).prepare(source)
    }

    fn set_play_when_ready(&mut self, play_when_ready: bool) -> Result<(), EngineError> {
        (**self).set_play_when_ready(play_when_ready)
    }

    fn seek_to(&mut self, position_ms: u64) -> Result<(), EngineError> {
        (**self).seek_to(position_ms)
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        (**self).stop()
    }

    fn release(&mut self) {
        (**self).release()
    }

    fn current_position_ms(&self) -> u64 {
        (**self).current_position_ms()
    }

    fn duration_ms(&self) -> Option<u64> {
        (**self).duration_ms()
    }
}
