//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the playback core:
//! - Logging and tracing infrastructure
//! - Generic event bus for broadcasting playback notifications
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the playback crates depend
//! on. It establishes the logging conventions (including host log forwarding
//! for platforms such as Logcat) and the broadcast mechanism used to fan
//! notifications out to observers living outside the playback thread.

pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
