//! In-process bus adapter.
//!
//! Backs subscriptions with a `tokio::sync::mpsc` channel per topic.
//! Intended for tests and local demos where no external publisher exists;
//! the publishing side is obtained with [`ChannelBus::publisher`] and
//! dropping every publisher handle surfaces as a closed subscription, which
//! is exactly how a lost transport looks to the worker.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{
    BusConnector, BusError, BusSubscriber, FrameEnvelope, FrameMetadata,
    SubscriptionConfig,
};

const CHANNEL_DEPTH: usize = 64;

/// In-process bus: connector and publisher factory in one.
#[derive(Debug, Default)]
pub struct ChannelBus {
    senders: Mutex<HashMap<String, mpsc::Sender<FrameEnvelope>>>,
}

impl ChannelBus {
    /// Create an empty in-process bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishing handle for `topic`.
    ///
    /// The channel is created on first use from either side, so publishers
    /// and subscribers may attach in any order as long as the subscriber
    /// connects before frames should be observed.
    pub fn publisher(&self, topic: &str) -> ChannelPublisher {
        ChannelPublisher {
            sender: self.sender_for(topic),
            topic: topic.to_string(),
        }
    }

    /// Drop the bus-held sender for `topic`.
    ///
    /// Once every publisher handle is dropped too, the topic's subscriber
    /// observes a closed subscription.
    pub fn disconnect(&self, topic: &str) {
        self.senders.lock().remove(topic);
    }

    fn sender_for(&self, topic: &str) -> mpsc::Sender<FrameEnvelope> {
        let mut senders = self.senders.lock();
        if let Some(sender) = senders.get(topic) {
            return sender.clone();
        }
        let (sender, _receiver) = mpsc::channel(CHANNEL_DEPTH);
        senders.insert(topic.to_string(), sender.clone());
        sender
    }
}

#[async_trait]
impl BusConnector for ChannelBus {
    async fn connect(
        &self,
        subscription: &SubscriptionConfig,
    ) -> Result<Box<dyn BusSubscriber>, BusError> {
        let (sender, receiver) = mpsc::channel(CHANNEL_DEPTH);
        self.senders
            .lock()
            .insert(subscription.topic.clone(), sender);
        Ok(Box::new(ChannelSubscriber { receiver }))
    }
}

/// Publishing side of the in-process bus.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    sender: mpsc::Sender<FrameEnvelope>,
    topic: String,
}

impl ChannelPublisher {
    /// Publish one frame with its metadata.
    pub async fn publish(
        &self,
        metadata: FrameMetadata,
        frame: Bytes,
    ) -> Result<(), BusError> {
        self.sender
            .send(FrameEnvelope { metadata, frame })
            .await
            .map_err(|_| BusError::Closed)
    }

    /// The topic this handle publishes on.
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[derive(Debug)]
struct ChannelSubscriber {
    receiver: mpsc::Receiver<FrameEnvelope>,
}

#[async_trait]
impl BusSubscriber for ChannelSubscriber {
    async fn receive(&mut self) -> Result<FrameEnvelope, BusError> {
        self.receiver.recv().await.ok_or(BusError::Closed)
    }

    async fn close(&mut self) {
        self.receiver.close();
    }
}
