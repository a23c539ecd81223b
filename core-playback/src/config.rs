//! # Playback Configuration
//!
//! Configuration types for source routing, backend selection and event
//! delivery. Every field has a serde default so partial host configs load.

use crate::backend::{
    default_non_compatible_devices, BackendSelector, NonCompatibleDevice,
    DEFAULT_MIN_ENGINE_API_LEVEL,
};
use crate::error::{PlaybackError, Result};
use crate::source::{SourceKind, SourceResolver, StandardSourceBuilder};
use core_runtime::events::DEFAULT_EVENT_BUFFER_SIZE;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A source route declared in configuration.
///
/// At least one of `scheme`, `extension` or `pattern` must be set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub kind: SourceKind,
    #[serde(default)]
    pub scheme: Option<String>,
    /// With or without the leading dot; matched case-insensitively.
    #[serde(default)]
    pub extension: Option<String>,
    /// Regex searched over the full URI.
    #[serde(default)]
    pub pattern: Option<String>,
}

impl RouteConfig {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            scheme: None,
            extension: None,
            pattern: None,
        }
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    fn has_matcher(&self) -> bool {
        [&self.scheme, &self.extension, &self.pattern]
            .iter()
            .any(|m| m.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

/// Playback core configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Capacity of the playback event broadcast channel.
    ///
    /// Default: 64.
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,

    /// Oldest API level allowed to use the media engine.
    ///
    /// Default: 16.
    #[serde(default = "default_min_engine_api_level")]
    pub min_engine_api_level: u32,

    /// Always use the native player.
    ///
    /// Default: false.
    #[serde(default)]
    pub force_native_backend: bool,

    /// Devices that must use the native player.
    ///
    /// Default: every Amazon device.
    #[serde(default = "default_non_compatible_devices")]
    pub non_compatible_devices: Vec<NonCompatibleDevice>,

    /// Extra routes, registered after the built-in ones.
    #[serde(default)]
    pub routes: Vec<RouteConfig>,

    /// Register the HLS, DASH, SmoothStreaming and RTSP routes.
    ///
    /// Default: true.
    #[serde(default = "default_register_default_routes")]
    pub register_default_routes: bool,

    /// User agent attached to every media source.
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: default_event_buffer_size(),
            min_engine_api_level: default_min_engine_api_level(),
            force_native_backend: false,
            non_compatible_devices: default_non_compatible_devices(),
            routes: Vec::new(),
            register_default_routes: default_register_default_routes(),
            user_agent: None,
        }
    }
}

impl PlaybackConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(PlaybackError::InvalidConfig(
                "event_buffer_size must be > 0".to_string(),
            ));
        }

        if let Some(entry) = self
            .non_compatible_devices
            .iter()
            .find(|d| d.manufacturer.trim().is_empty())
        {
            return Err(PlaybackError::InvalidConfig(format!(
                "non-compatible device entry has an empty manufacturer (model {:?})",
                entry.model
            )));
        }

        for (index, route) in self.routes.iter().enumerate() {
            if !route.has_matcher() {
                return Err(PlaybackError::InvalidConfig(format!(
                    "route #{index} ({:?}) needs a scheme, extension or pattern",
                    route.kind
                )));
            }
            if let Some(pattern) = route.pattern.as_deref() {
                if let Err(e) = Regex::new(pattern) {
                    return Err(PlaybackError::InvalidConfig(format!(
                        "route #{index} pattern '{pattern}' is invalid: {e}"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Build a resolver with the built-in routes (if enabled) followed by the
    /// configured ones.
    pub fn build_resolver(&self) -> Result<SourceResolver> {
        let mut resolver = if self.register_default_routes {
            SourceResolver::with_default_routes()
        } else {
            SourceResolver::new(StandardSourceBuilder::shared(SourceKind::Progressive))
        };

        for route in &self.routes {
            resolver.register_route(
                StandardSourceBuilder::shared(route.kind.clone()),
                route.scheme.as_deref(),
                route.extension.as_deref(),
                route.pattern.as_deref(),
            )?;
        }

        Ok(resolver)
    }

    pub fn build_backend_selector(&self) -> BackendSelector {
        BackendSelector::new(
            self.min_engine_api_level,
            self.force_native_backend,
            self.non_compatible_devices.clone(),
        )
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_event_buffer_size() -> usize {
    DEFAULT_EVENT_BUFFER_SIZE
}

fn default_min_engine_api_level() -> u32 {
    DEFAULT_MIN_ENGINE_API_LEVEL
}

fn default_register_default_routes() -> bool {
    true
}
