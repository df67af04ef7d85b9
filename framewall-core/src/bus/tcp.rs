//! Length-delimited TCP bus adapter.
//!
//! Connects to one publisher endpoint per topic and speaks a minimal
//! adapter framing on top of [`LengthDelimitedCodec`]: on connect the
//! subscriber sends the topic name as a single frame, and every published
//! message then arrives as two frames, the metadata JSON object followed by
//! the raw encoded payload. This framing is an adapter detail of this crate,
//! not a bus protocol definition.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::{io::AsyncWriteExt, net::TcpStream};
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::debug;

use super::{
    BusConnector, BusError, BusSubscriber, FrameEnvelope, SubscriptionConfig,
};

/// Connector for the TCP adapter.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpBusConnector;

impl TcpBusConnector {
    /// Create the connector.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BusConnector for TcpBusConnector {
    async fn connect(
        &self,
        subscription: &SubscriptionConfig,
    ) -> Result<Box<dyn BusSubscriber>, BusError> {
        let stream = TcpStream::connect(&subscription.endpoint)
            .await
            .map_err(|source| BusError::Connect {
                endpoint: subscription.endpoint.clone(),
                source,
            })?;

        let mut framed = Framed::new(stream, LengthDelimitedCodec::new());
        framed
            .send(bytes::Bytes::copy_from_slice(
                subscription.topic.as_bytes(),
            ))
            .await?;

        debug!(
            topic = %subscription.topic,
            endpoint = %subscription.endpoint,
            "tcp bus subscription established"
        );

        Ok(Box::new(TcpSubscriber { framed }))
    }
}

struct TcpSubscriber {
    framed: Framed<TcpStream, LengthDelimitedCodec>,
}

impl TcpSubscriber {
    async fn next_frame(&mut self) -> Result<bytes::BytesMut, BusError> {
        match self.framed.next().await {
            Some(Ok(frame)) => Ok(frame),
            Some(Err(err)) => Err(BusError::Transport(err)),
            None => Err(BusError::Closed),
        }
    }
}

#[async_trait]
impl BusSubscriber for TcpSubscriber {
    async fn receive(&mut self) -> Result<FrameEnvelope, BusError> {
        let metadata_frame = self.next_frame().await?;
        let metadata = serde_json::from_slice(&metadata_frame)?;
        let payload = self.next_frame().await?;
        Ok(FrameEnvelope {
            metadata,
            frame: payload.freeze(),
        })
    }

    async fn close(&mut self) {
        let _ = self.framed.get_mut().shutdown().await;
    }
}
