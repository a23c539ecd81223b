//! Workspace facade crate.
//!
//! This crate exposes feature flags that map to the individual workspace
//! crates (`core-playback`, `core-runtime`). Host applications can depend on
//! `playback-workspace` and enable the documented features without wiring
//! each crate individually.

#[cfg(feature = "playback")]
pub use core_playback as playback;

#[cfg(feature = "playback")]
pub use core_runtime as runtime;
