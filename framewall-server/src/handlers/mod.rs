//! HTTP handlers for the relay surface.

pub mod pages;
pub mod stream;
