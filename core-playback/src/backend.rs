//! # Backend Selection
//!
//! Chooses between the full media engine and the platform's native player.
//! Some devices ship firmware the engine cannot run on; those, and devices
//! below the engine's minimum API level, fall back to the native player.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Oldest platform API level the media engine supports.
pub const DEFAULT_MIN_ENGINE_API_LEVEL: u32 = 16;

/// Player implementation used for a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerBackend {
    /// The full media engine (adaptive streaming, custom routes).
    Engine,
    /// The platform's built-in player.
    Native,
}

/// Hardware and OS facts used to pick a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub manufacturer: String,
    pub model: String,
    pub api_level: u32,
}

impl DeviceProfile {
    pub fn new(manufacturer: impl Into<String>, model: impl Into<String>, api_level: u32) -> Self {
        Self {
            manufacturer: manufacturer.into(),
            model: model.into(),
            api_level,
        }
    }
}

/// A device known to misbehave with the media engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonCompatibleDevice {
    pub manufacturer: String,
    /// `None` matches every model from the manufacturer.
    #[serde(default)]
    pub model: Option<String>,
}

impl NonCompatibleDevice {
    pub fn manufacturer(manufacturer: impl Into<String>) -> Self {
        Self {
            manufacturer: manufacturer.into(),
            model: None,
        }
    }

    pub fn model(manufacturer: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            manufacturer: manufacturer.into(),
            model: Some(model.into()),
        }
    }

    /// Case-insensitive match on manufacturer and, if set, model.
    pub fn matches(&self, device: &DeviceProfile) -> bool {
        if !self.manufacturer.eq_ignore_ascii_case(&device.manufacturer) {
            return false;
        }
        self.model
            .as_deref()
            .map_or(true, |model| model.eq_ignore_ascii_case(&device.model))
    }
}

/// Devices excluded from the engine out of the box.
pub fn default_non_compatible_devices() -> Vec<NonCompatibleDevice> {
    vec![NonCompatibleDevice::manufacturer("Amazon")]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSelector {
    min_api_level: u32,
    force_native: bool,
    non_compatible: Vec<NonCompatibleDevice>,
}

impl BackendSelector {
    pub fn new(
        min_api_level: u32,
        force_native: bool,
        non_compatible: Vec<NonCompatibleDevice>,
    ) -> Self {
        Self {
            min_api_level,
            force_native,
            non_compatible,
        }
    }

    /// Whether `device` can run the media engine at all.
    pub fn is_engine_compatible(&self, device: &DeviceProfile) -> bool {
        device.api_level >= self.min_api_level
            && !self.non_compatible.iter().any(|entry| entry.matches(device))
    }

    pub fn select(&self, device: &DeviceProfile) -> PlayerBackend {
        let backend = if !self.force_native && self.is_engine_compatible(device) {
            PlayerBackend::Engine
        } else {
            PlayerBackend::Native
        };

        debug!(
            manufacturer = %device.manufacturer,
            model = %device.model,
            api_level = device.api_level,
            force_native = self.force_native,
            ?backend,
            "Selected player backend"
        );
        backend
    }

    pub fn non_compatible_devices(&self) -> &[NonCompatibleDevice] {
        &self.non_compatible
    }
}

impl Default for BackendSelector {
    fn default() -> Self {
        Self::new(
            DEFAULT_MIN_ENGINE_API_LEVEL,
            false,
            default_non_compatible_devices(),
        )
    }
}
