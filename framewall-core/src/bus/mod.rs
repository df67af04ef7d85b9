//! Message-bus seam.
//!
//! The relay consumes the bus through two narrow traits: a [`BusConnector`]
//! that opens one subscription per configured topic, and the resulting
//! [`BusSubscriber`] that yields `(metadata, frame)` envelopes until the
//! transport fails. The wire protocol itself is an adapter concern:
//! [`tcp`] is the production adapter, [`channel`] an in-process bus for
//! tests and local demos.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod channel;
pub mod tcp;

/// Per-frame metadata published alongside the payload.
pub type FrameMetadata = serde_json::Map<String, serde_json::Value>;

/// One message received from a subscription.
#[derive(Debug, Clone)]
pub struct FrameEnvelope {
    /// Publisher-supplied metadata; logged by the relay, never routed on.
    pub metadata: FrameMetadata,
    /// The raw encoded frame payload.
    pub frame: Bytes,
}

/// One configured subscription: the topic name and where to reach its
/// publisher. The position of an entry in the configured list is
/// order-significant (it drives panel layout and port sharding).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    /// Topic name on the bus.
    pub topic: String,
    /// Transport endpoint for this topic's publisher, e.g. `127.0.0.1:5568`.
    pub endpoint: String,
}

/// Transport-level subscription errors.
#[derive(Debug, Error)]
pub enum BusError {
    /// The initial connection to a publisher endpoint failed.
    #[error("failed to connect to bus endpoint {endpoint}: {source}")]
    Connect {
        /// The endpoint that refused the connection.
        endpoint: String,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// The peer closed the subscription.
    #[error("subscription closed by peer")]
    Closed,

    /// A receive failed at the transport level.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The metadata half of a message was not valid JSON.
    #[error("malformed metadata frame: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Opens subscriptions on the bus.
#[async_trait]
pub trait BusConnector: Send + Sync {
    /// Connect and subscribe to one topic.
    async fn connect(
        &self,
        subscription: &SubscriptionConfig,
    ) -> Result<Box<dyn BusSubscriber>, BusError>;
}

/// One live subscription handle.
#[async_trait]
pub trait BusSubscriber: Send {
    /// Receive the next `(metadata, frame)` envelope.
    ///
    /// Blocks until a message arrives or the transport fails; a failure is
    /// terminal for the subscription.
    async fn receive(&mut self) -> Result<FrameEnvelope, BusError>;

    /// Release the subscription handle.
    async fn close(&mut self);
}
