//! # Playback Error Types
//!
//! Error types for playback configuration and control operations.
//!
//! The reconciliation and resolution core is total over its inputs: unknown
//! state codes, unmatched seek orderings and unmatched routes are never
//! errors. What remains is configuration validation, lifecycle misuse and
//! opaque failures reported by the backing engine.

use std::fmt;
use thiserror::Error;

/// Failure reported by the backing media engine.
///
/// The core never classifies or retries these; they are forwarded unchanged
/// to error listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    /// Engine-specific error code, when the engine provides one.
    pub code: Option<i32>,
    /// Human-readable description from the engine.
    pub message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {})", self.message, code),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for EngineError {}

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A source route was registered without any matcher.
    #[error("Invalid source route: {0}")]
    InvalidRoute(String),

    /// A loose route pattern failed to compile.
    #[error("Invalid route pattern '{pattern}': {source}")]
    InvalidRoutePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Configuration values failed validation.
    #[error("Invalid playback configuration: {0}")]
    InvalidConfig(String),

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// Attempted a media operation when no media is loaded.
    #[error("No media loaded")]
    NoMediaLoaded,

    /// The player was released; no further operations are accepted.
    #[error("Player has been released")]
    Released,

    /// The player is in the error state; only release is accepted.
    #[error("Player is in the error state: {0}")]
    Errored(EngineError),

    // ========================================================================
    // Engine Errors
    // ========================================================================
    /// The backing engine rejected an operation.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

impl PlaybackError {
    /// Returns `true` if this error originated in the backing engine.
    pub fn is_engine_error(&self) -> bool {
        matches!(self, PlaybackError::Engine(_))
    }

    /// Returns `true` if this error is due to invalid routes or configuration.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::InvalidRoute(_)
                | PlaybackError::InvalidRoutePattern { .. }
                | PlaybackError::InvalidConfig(_)
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
