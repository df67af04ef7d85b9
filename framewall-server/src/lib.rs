//! # Framewall Server
//!
//! HTTP surface and wiring for the framewall live-view relay.
//!
//! ## Overview
//!
//! The server ingests encoded frames published on named bus topics, buffers
//! each topic independently ([`framewall_core`]), and re-exposes the latest
//! frames as per-topic `multipart/x-mixed-replace` (MJPEG) streams:
//!
//! - **Live-view streaming**: one long-lived stream endpoint per topic,
//!   sharded across `ceil(topics / streams_per_port)` listening ports.
//! - **Discovery**: `/topics` lists the configured topic names; `/` renders
//!   a landing page of stream links.
//! - **Provisioning**: a dashboard with one panel per topic plus datasource
//!   and INI artifacts are generated at startup for the external dashboard
//!   stack to pick up.
//!
//! ## Architecture
//!
//! Built on axum and tokio; TLS terminates in-process via axum-server and
//! rustls from in-memory PEM material when not in development mode.

pub mod bootstrap;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod provisioning;
pub mod routes;
pub mod state;
pub mod tls;

pub use errors::{AppError, AppResult};
pub use state::AppState;
