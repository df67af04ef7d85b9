//! Tower middleware for the relay's HTTP surface.

pub mod security;

pub use security::{SecurityHeadersConfig, SecurityHeadersLayer};
