//! # Media Source Resolution
//!
//! Picks the transport/container strategy for a URI without the caller
//! having to know whether it points at a progressive file, an HLS playlist,
//! a DASH or SmoothStreaming manifest, or an RTSP stream.
//!
//! ## Resolution order
//!
//! 1. **Scheme**: case-insensitive exact match (`rtsp://...`)
//! 2. **Extension**: of the last meaningful path segment (`.m3u8`, `.mpd`,
//!    `.ism`), case-folded
//! 3. **Loose pattern**: a regex searched over the full URI, catching format
//!    markers in query strings or mid-path tokens
//! 4. **Default**: progressive download
//!
//! Within each step the first registered route wins. Resolution is pure
//! string work: no network I/O and no MIME sniffing.
//!
//! ## Usage
//!
//! ```rust
//! use core_playback::source::{SourceKind, SourceResolver};
//!
//! let resolver = SourceResolver::with_default_routes();
//! assert_eq!(resolver.resolve_kind("https://cdn.example.com/live/index.M3U8"), SourceKind::Hls);
//! assert_eq!(resolver.resolve_kind("https://cdn.example.com/clip.mp4"), SourceKind::Progressive);
//! ```

use crate::error::{PlaybackError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Transport/container family of a media source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Plain file download (MP4, MP3, WebM, ...).
    Progressive,
    /// HTTP Live Streaming playlist.
    Hls,
    /// MPEG-DASH manifest.
    Dash,
    /// Microsoft SmoothStreaming manifest.
    SmoothStreaming,
    /// Real Time Streaming Protocol.
    Rtsp,
    /// Host-provided transport.
    Custom(String),
}

impl SourceKind {
    /// Returns `true` for manifest-driven adaptive formats.
    pub fn is_adaptive(&self) -> bool {
        matches!(self, Self::Hls | Self::Dash | Self::SmoothStreaming)
    }
}

/// Inputs handed to a [`MediaSourceBuilder`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaSourceAttributes {
    pub uri: String,
    pub user_agent: Option<String>,
    pub headers: HashMap<String, String>,
}

impl MediaSourceAttributes {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Default::default()
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Description of a streamable pipeline, consumed by the backing engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSource {
    pub kind: SourceKind,
    pub uri: String,
    pub user_agent: Option<String>,
    pub headers: HashMap<String, String>,
}

impl MediaSource {
    pub fn new(kind: SourceKind, attributes: &MediaSourceAttributes) -> Self {
        Self {
            kind,
            uri: attributes.uri.clone(),
            user_agent: attributes.user_agent.clone(),
            headers: attributes.headers.clone(),
        }
    }
}

/// Factory for one transport family.
///
/// Hosts register additional builders (or replace the built-in ones) through
/// [`SourceResolver::register_route`].
pub trait MediaSourceBuilder: Send + Sync {
    fn kind(&self) -> SourceKind;

    fn build(&self, attributes: &MediaSourceAttributes) -> MediaSource {
        MediaSource::new(self.kind(), attributes)
    }
}

/// Builder that tags the source with a fixed [`SourceKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardSourceBuilder {
    kind: SourceKind,
}

impl StandardSourceBuilder {
    pub fn new(kind: SourceKind) -> Self {
        Self { kind }
    }

    pub fn shared(kind: SourceKind) -> Arc<dyn MediaSourceBuilder> {
        Arc::new(Self::new(kind))
    }
}

impl MediaSourceBuilder for StandardSourceBuilder {
    fn kind(&self) -> SourceKind {
        self.kind.clone()
    }
}

/// A registered route: a builder plus the matchers that select it.
#[derive(Clone)]
pub struct SourceRoute {
    builder: Arc<dyn MediaSourceBuilder>,
    scheme: Option<String>,
    extension: Option<String>,
    pattern: Option<Regex>,
}

impl SourceRoute {
    pub fn builder(&self) -> &Arc<dyn MediaSourceBuilder> {
        &self.builder
    }

    /// Lower-cased scheme, if this route matches by scheme.
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// Lower-cased extension with its leading dot.
    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_ref().map(Regex::as_str)
    }
}

impl fmt::Debug for SourceRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRoute")
            .field("kind", &self.builder.kind())
            .field("scheme", &self.scheme)
            .field("extension", &self.extension)
            .field("pattern", &self.pattern())
            .finish()
    }
}

/// Route registry and resolver.
///
/// Built once while the pipeline is assembled, then shared read-only (for
/// example behind an `Arc`). Routes are append-only.
#[derive(Clone)]
pub struct SourceResolver {
    default_builder: Arc<dyn MediaSourceBuilder>,
    routes: Vec<SourceRoute>,
}

impl SourceResolver {
    /// An empty registry falling back to `default_builder`.
    pub fn new(default_builder: Arc<dyn MediaSourceBuilder>) -> Self {
        Self {
            default_builder,
            routes: Vec::new(),
        }
    }

    /// Progressive default plus the built-in HLS, DASH, SmoothStreaming and
    /// RTSP routes.
    pub fn with_default_routes() -> Self {
        let mut resolver = Self::new(StandardSourceBuilder::shared(SourceKind::Progressive));
        resolver.register_builtin(SourceKind::Hls, None, Some(".m3u8"), Some(r".*\.m3u8.*"));
        resolver.register_builtin(SourceKind::Dash, None, Some(".mpd"), Some(r".*\.mpd.*"));
        resolver.register_builtin(
            SourceKind::SmoothStreaming,
            None,
            Some(".ism"),
            Some(r".*\.ism.*"),
        );
        resolver.register_builtin(SourceKind::Rtsp, Some("rtsp"), None, None);
        resolver
    }

    fn register_builtin(
        &mut self,
        kind: SourceKind,
        scheme: Option<&str>,
        extension: Option<&str>,
        pattern: Option<&str>,
    ) {
        let builder = StandardSourceBuilder::shared(kind);
        if let Err(e) = self.register_route(builder, scheme, extension, pattern) {
            warn!(error = %e, "Skipping built-in source route");
        }
    }

    /// Append a route.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::InvalidRoute`] if no matcher is given
    /// - [`PlaybackError::InvalidRoutePattern`] if `loose_pattern` is not a
    ///   valid regex
    pub fn register_route(
        &mut self,
        builder: Arc<dyn MediaSourceBuilder>,
        scheme: Option<&str>,
        extension: Option<&str>,
        loose_pattern: Option<&str>,
    ) -> Result<()> {
        let scheme = scheme
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_ascii_lowercase);
        let extension = extension.and_then(normalize_extension);

        let pattern = loose_pattern
            .filter(|p| !p.is_empty())
            .map(|p| {
                Regex::new(p).map_err(|source| PlaybackError::InvalidRoutePattern {
                    pattern: p.to_string(),
                    source,
                })
            })
            .transpose()?;

        if scheme.is_none() && extension.is_none() && pattern.is_none() {
            return Err(PlaybackError::InvalidRoute(format!(
                "route for {:?} needs a scheme, extension or pattern",
                builder.kind()
            )));
        }

        debug!(
            kind = ?builder.kind(),
            scheme = ?scheme,
            extension = ?extension,
            pattern = ?loose_pattern,
            "Registered source route"
        );

        self.routes.push(SourceRoute {
            builder,
            scheme,
            extension,
            pattern,
        });
        Ok(())
    }

    /// Pick the builder for `uri`. Never fails; unmatched URIs get the default.
    pub fn resolve(&self, uri: &str) -> Arc<dyn MediaSourceBuilder> {
        self.find_route(uri)
            .map(|route| Arc::clone(&route.builder))
            .unwrap_or_else(|| Arc::clone(&self.default_builder))
    }

    /// Shorthand for `resolve(uri).kind()`.
    pub fn resolve_kind(&self, uri: &str) -> SourceKind {
        self.resolve(uri).kind()
    }

    pub fn routes(&self) -> &[SourceRoute] {
        &self.routes
    }

    pub fn default_builder(&self) -> &Arc<dyn MediaSourceBuilder> {
        &self.default_builder
    }

    fn find_route(&self, uri: &str) -> Option<&SourceRoute> {
        if let Some(scheme) = uri_scheme(uri) {
            if let Some(route) = self
                .routes
                .iter()
                .find(|r| r.scheme.as_deref() == Some(scheme.as_str()))
            {
                return Some(route);
            }
        }

        let extension = uri_extension(uri);
        if !extension.is_empty() {
            if let Some(route) = self
                .routes
                .iter()
                .find(|r| r.extension.as_deref() == Some(extension.as_str()))
            {
                return Some(route);
            }
        }

        self.routes
            .iter()
            .find(|r| r.pattern.as_ref().is_some_and(|re| re.is_match(uri)))
    }
}

impl Default for SourceResolver {
    fn default() -> Self {
        Self::with_default_routes()
    }
}

impl fmt::Debug for SourceResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceResolver")
            .field("default", &self.default_builder.kind())
            .field("routes", &self.routes)
            .finish()
    }
}

/// Lower-cased scheme of an absolute URI.
///
/// URIs the WHATWG parser rejects (out-of-range port, unusual host) still
/// yield their RFC 3986 scheme.
pub fn uri_scheme(uri: &str) -> Option<String> {
    match Url::parse(uri) {
        Ok(url) => Some(url.scheme().to_ascii_lowercase()),
        Err(_) => raw_scheme(uri).map(str::to_ascii_lowercase),
    }
}

/// `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )` before the first `:`.
fn raw_scheme(uri: &str) -> Option<&str> {
    let (scheme, _) = uri.split_once(':')?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

/// Lower-cased extension (with leading dot) of the last meaningful path
/// segment, or an empty string.
///
/// When the last segment has no extension the one before it is checked, so
/// `.../video.ism/manifest` yields `.ism`. Query and fragment are ignored.
pub fn uri_extension(uri: &str) -> String {
    let segments = path_segments(uri);

    let Some(mut candidate) = segments.last() else {
        return String::new();
    };

    if !candidate.contains('.') && segments.len() > 1 {
        candidate = &segments[segments.len() - 2];
    }

    match candidate.rfind('.') {
        Some(index) => candidate[index..].to_lowercase(),
        None => String::new(),
    }
}

/// Non-empty path segments. Unparseable URIs are split by hand after dropping
/// any query, fragment, scheme and authority.
fn path_segments(uri: &str) -> Vec<String> {
    match Url::parse(uri) {
        Ok(url) => url
            .path_segments()
            .map(|segments| {
                segments
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        Err(_) => raw_path(uri)
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

fn raw_path(uri: &str) -> &str {
    let mut rest = uri.split(['?', '#']).next().unwrap_or_default();

    if let Some(scheme) = raw_scheme(rest) {
        rest = &rest[scheme.len() + 1..];
        if let Some(hier) = rest.strip_prefix("//") {
            rest = hier.find('/').map_or("", |index| &hier[index..]);
        }
    }
    rest
}

fn normalize_extension(extension: &str) -> Option<String> {
    let trimmed = extension.trim();
    if trimmed.is_empty() || trimmed == "." {
        return None;
    }
    let lower = trimmed.to_lowercase();
    Some(if lower.starts_with('.') {
        lower
    } else {
        format!(".{lower}")
    })
}
