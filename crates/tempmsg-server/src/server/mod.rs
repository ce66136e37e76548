//! HTTP server internals.
//!
//! ## Structure
//!
//! - [`config`] - CLI/env arguments and the validated [`config::ServerConfig`].
//! - [`handler`] - axum routes for sharing and querying records.
//! - [`telemetry`] - log subscriber setup.

pub mod config;
pub mod handler;
pub mod telemetry;
