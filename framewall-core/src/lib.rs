//! # Framewall Core
//!
//! Core building blocks for the framewall live-view relay:
//!
//! - **Frame buffers**: bounded, single-writer/multi-reader per-topic FIFOs
//!   with a drop-newest overflow policy ([`buffer`]).
//! - **Registry**: the write-once topic → buffer map shared by ingest and
//!   egress ([`registry`]).
//! - **Bus seam**: traits the relay uses to consume a publish/subscribe
//!   message bus, plus TCP and in-process adapters ([`bus`]).
//! - **Subscriber workers**: one long-running task per topic moving frames
//!   from the bus into its buffer ([`relay`]).
//! - **Dashboard generation**: the pure panel-per-topic transformation over
//!   a template panel ([`dashboard`]).
//! - **Placeholder rendering**: the synthetic "no signal" JPEG served before
//!   a topic delivers its first frame ([`placeholder`]).
//!
//! The HTTP surface that drains the buffers lives in `framewall-server`.

pub mod buffer;
pub mod bus;
pub mod dashboard;
pub mod placeholder;
pub mod registry;
pub mod relay;

pub use buffer::{FrameBuffer, PushOutcome};
pub use registry::{FrameRegistry, RegistryBuilder, RegistryError};
