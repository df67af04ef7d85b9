//! Per-topic subscriber worker.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::{
    buffer::{FrameBuffer, PushOutcome},
    bus::{BusError, BusSubscriber},
};

/// Long-running ingest task for one topic.
///
/// Pulls `(metadata, frame)` envelopes from its bus subscription and pushes
/// the frames into the topic's buffer. Workers share nothing across topics
/// beyond their own buffer slot, so a stalled or dead bus connection for one
/// topic never blocks delivery on another.
///
/// Lifecycle: `Connecting -> Receiving (loop) -> Closed`. A transport error
/// ends the worker; there is no auto-reconnect, and the topic's stream then
/// serves its last-known frame (or the placeholder) until process restart.
pub struct SubscriberWorker {
    topic: String,
    buffer: Arc<FrameBuffer>,
    subscriber: Box<dyn BusSubscriber>,
}

impl std::fmt::Debug for SubscriberWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberWorker")
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}

impl SubscriberWorker {
    /// Bind a connected subscription to its topic's buffer.
    pub fn new(
        topic: impl Into<String>,
        buffer: Arc<FrameBuffer>,
        subscriber: Box<dyn BusSubscriber>,
    ) -> Self {
        Self {
            topic: topic.into(),
            buffer,
            subscriber,
        }
    }

    /// Receive until the transport fails, then close the subscription.
    pub async fn run(mut self) {
        info!(topic = %self.topic, "subscriber worker receiving");

        loop {
            match self.subscriber.receive().await {
                Ok(envelope) => {
                    let crate::bus::FrameEnvelope { metadata, frame } =
                        envelope;
                    // Metadata is logged for operators, never routed on.
                    debug!(
                        topic = %self.topic,
                        bytes = frame.len(),
                        metadata = %serde_json::Value::Object(metadata),
                        "frame received"
                    );
                    if self.buffer.push(frame) == PushOutcome::Dropped {
                        warn!(
                            topic = %self.topic,
                            capacity = self.buffer.capacity(),
                            "frame buffer full, dropping newest frame"
                        );
                    }
                }
                Err(BusError::Closed) => {
                    error!(topic = %self.topic, "subscription closed by peer");
                    break;
                }
                Err(err) => {
                    error!(
                        topic = %self.topic,
                        error = %err,
                        "bus receive failed, terminating subscriber worker"
                    );
                    break;
                }
            }
        }

        self.subscriber.close().await;
        info!(topic = %self.topic, "subscriber worker closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{
        channel::ChannelBus, BusConnector, FrameMetadata, SubscriptionConfig,
    };
    use bytes::Bytes;

    fn subscription(topic: &str) -> SubscriptionConfig {
        SubscriptionConfig {
            topic: topic.to_string(),
            endpoint: "in-process".to_string(),
        }
    }

    #[tokio::test]
    async fn relays_frames_into_the_buffer_in_order() {
        let bus = ChannelBus::new();
        let subscriber = bus.connect(&subscription("cam1")).await.unwrap();
        let publisher = bus.publisher("cam1");
        let buffer = Arc::new(FrameBuffer::with_capacity(10));

        let worker =
            SubscriberWorker::new("cam1", Arc::clone(&buffer), subscriber);
        let handle = tokio::spawn(worker.run());

        publisher
            .publish(FrameMetadata::new(), Bytes::from_static(b"f1"))
            .await
            .unwrap();
        publisher
            .publish(FrameMetadata::new(), Bytes::from_static(b"f2"))
            .await
            .unwrap();

        // Dropping every sender terminates the worker via BusError::Closed.
        drop(publisher);
        drop(bus);
        handle.await.unwrap();

        assert_eq!(buffer.try_pop(), Some(Bytes::from_static(b"f1")));
        assert_eq!(buffer.try_pop(), Some(Bytes::from_static(b"f2")));
        assert_eq!(buffer.try_pop(), None);
    }

    #[tokio::test]
    async fn transport_error_terminates_only_this_worker() {
        let bus = ChannelBus::new();
        let cam1_sub = bus.connect(&subscription("cam1")).await.unwrap();
        let cam2_sub = bus.connect(&subscription("cam2")).await.unwrap();
        let cam1_pub = bus.publisher("cam1");
        let cam2_pub = bus.publisher("cam2");

        let cam1_buffer = Arc::new(FrameBuffer::with_capacity(10));
        let cam2_buffer = Arc::new(FrameBuffer::with_capacity(10));

        let cam1 = tokio::spawn(
            SubscriberWorker::new("cam1", Arc::clone(&cam1_buffer), cam1_sub)
                .run(),
        );
        let _cam2 = tokio::spawn(
            SubscriberWorker::new("cam2", Arc::clone(&cam2_buffer), cam2_sub)
                .run(),
        );

        cam1_pub
            .publish(FrameMetadata::new(), Bytes::from_static(b"f1"))
            .await
            .unwrap();

        // Kill cam1's transport. The bus keeps a sender for cam1 internally,
        // so remove it by replacing the subscription side entirely.
        drop(cam1_pub);
        let _ = bus.connect(&subscription("cam1")).await.unwrap();
        cam1.await.unwrap();

        // cam1's delivered frame is still drainable.
        assert_eq!(cam1_buffer.try_pop(), Some(Bytes::from_static(b"f1")));

        // cam2 is unaffected and keeps receiving.
        cam2_pub
            .publish(FrameMetadata::new(), Bytes::from_static(b"g1"))
            .await
            .unwrap();
        tokio::task::yield_now().await;
        tokio::time::timeout(std::time::Duration::from_secs(1), async {
            loop {
                if let Some(frame) = cam2_buffer.try_pop() {
                    assert_eq!(frame, Bytes::from_static(b"g1"));
                    break;
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn full_buffer_drops_newest_and_keeps_running() {
        let bus = ChannelBus::new();
        let subscriber = bus.connect(&subscription("cam1")).await.unwrap();
        let publisher = bus.publisher("cam1");
        let buffer = Arc::new(FrameBuffer::with_capacity(2));

        let handle = tokio::spawn(
            SubscriberWorker::new("cam1", Arc::clone(&buffer), subscriber)
                .run(),
        );

        for tag in [b"f1" as &[u8], b"f2", b"f3"] {
            publisher
                .publish(FrameMetadata::new(), Bytes::copy_from_slice(tag))
                .await
                .unwrap();
        }
        drop(publisher);
        drop(bus);
        handle.await.unwrap();

        assert_eq!(buffer.try_pop(), Some(Bytes::from_static(b"f1")));
        assert_eq!(buffer.try_pop(), Some(Bytes::from_static(b"f2")));
        assert_eq!(buffer.try_pop(), None);
    }
}
