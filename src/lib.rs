//! Warden Core - Streaming Anti-Cheat Detection Engine
//!
//! This crate provides the detection core for a voxel game server anti-cheat:
//! - Per-player telemetry pipeline (movement packets and combat attacks)
//! - Ring-buffer / rolling-window / EWMA history substrate
//! - Heuristic checks (packet timing, movement physics, prediction drift,
//!   combat aim/reach/click-pattern analysis)
//! - Confidence aggregation with dual thresholds (confidence + severity)
//! - Mitigation policy (exemption windows, cooldowns, whitelist, gamemode)
//! - Async analytics uplink (newline-delimited JSON)
//!
//! The host game integration (event sourcing, chat broadcast, kick/mute) is
//! connected through the traits in [`engine`] and [`actions`]; the engine
//! itself performs no I/O on the ingest path.

pub mod actions;
pub mod aggregate;
pub mod analytics;
pub mod checks;
pub mod clock;
pub mod config;
pub mod constants;
pub mod context;
pub mod engine;
pub mod error;
pub mod features;
pub mod history;
pub mod logging;
pub mod mitigation;
pub mod model;
pub mod stats;
