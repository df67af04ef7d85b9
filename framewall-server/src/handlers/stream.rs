//! Per-topic MJPEG live-view streaming.
//!
//! `GET /{topic}` resolves the topic against the shared registry and
//! returns a `multipart/x-mixed-replace` response whose body is a lazy,
//! unbounded chunk sequence. Each iteration does a non-blocking pop of the
//! topic's buffer: a popped frame becomes the current frame; otherwise the
//! previous one is re-emitted, so a slow consumer sees a stale frame rather
//! than stalling the producer side. Dropping the response body (client
//! disconnect) drops the generator with it.

use std::{sync::Arc, time::Duration};

use axum::{
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::Response,
};
use bytes::{Bytes, BytesMut};
use framewall_core::FrameBuffer;
use futures_util::Stream;
use tracing::{info, warn};

use crate::{
    config::FirstFramePolicy,
    errors::{AppError, AppResult},
    state::AppState,
};

/// Multipart boundary used by every stream response.
pub const BOUNDARY: &str = "frame";

const CHUNK_HEADER: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";
const CHUNK_TRAILER: &[u8] = b"\r\n";

pub async fn stream_topic(
    State(state): State<AppState>,
    Path(topic): Path<String>,
) -> AppResult<Response> {
    let Some(buffer) = state.registry.get(&topic) else {
        warn!(%topic, "stream requested for unconfigured topic");
        return Err(AppError::bad_request(format!(
            "Invalid Request: topic {topic:?} is not configured"
        )));
    };

    info!(%topic, "live view stream opened");

    let chunks = frame_chunks(
        buffer,
        state.placeholder.clone(),
        state.config.relay.first_frame_policy,
        Duration::from_millis(state.config.relay.poll_interval_ms),
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/x-mixed-replace; boundary={BOUNDARY}"),
        )
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(chunks))
        .map_err(|err| AppError::internal(err.to_string()))
}

/// The lazy chunk sequence behind one stream response.
///
/// Runs until dropped. Before the first real frame it either emits the
/// placeholder or, under [`FirstFramePolicy::Wait`], polls silently.
fn frame_chunks(
    buffer: Arc<FrameBuffer>,
    placeholder: Bytes,
    policy: FirstFramePolicy,
    pace: Duration,
) -> impl Stream<Item = Result<Bytes, std::convert::Infallible>> {
    async_stream::stream! {
        let mut current: Option<Bytes> = None;
        loop {
            if let Some(frame) = buffer.try_pop() {
                current = Some(frame);
            }
            match (&current, policy) {
                (Some(frame), _) => yield Ok(encode_chunk(frame)),
                (None, FirstFramePolicy::Placeholder) => {
                    yield Ok(encode_chunk(&placeholder));
                }
                (None, FirstFramePolicy::Wait) => {}
            }
            tokio::time::sleep(pace).await;
        }
    }
}

/// Frame one payload as a multipart chunk: boundary marker, content-type
/// header, blank line, frame bytes, trailing separator.
fn encode_chunk(frame: &Bytes) -> Bytes {
    let mut chunk = BytesMut::with_capacity(
        CHUNK_HEADER.len() + frame.len() + CHUNK_TRAILER.len(),
    );
    chunk.extend_from_slice(CHUNK_HEADER);
    chunk.extend_from_slice(frame);
    chunk.extend_from_slice(CHUNK_TRAILER);
    chunk.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[test]
    fn chunk_framing_wraps_the_payload() {
        let chunk = encode_chunk(&Bytes::from_static(b"jpegbytes"));
        assert!(chunk.starts_with(CHUNK_HEADER));
        assert!(chunk.ends_with(b"jpegbytes\r\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn placeholder_policy_emits_before_first_frame() {
        let buffer = Arc::new(FrameBuffer::with_capacity(10));
        let placeholder = Bytes::from_static(b"placeholder");
        let chunks = frame_chunks(
            Arc::clone(&buffer),
            placeholder,
            FirstFramePolicy::Placeholder,
            Duration::from_millis(100),
        );
        tokio::pin!(chunks);

        let first = chunks.next().await.unwrap().unwrap();
        assert!(first.ends_with(b"placeholder\r\n"));

        // A real frame replaces the placeholder on the next iteration.
        buffer.push(Bytes::from_static(b"f1"));
        let second = chunks.next().await.unwrap().unwrap();
        assert!(second.ends_with(b"f1\r\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_policy_emits_nothing_until_first_frame() {
        let buffer = Arc::new(FrameBuffer::with_capacity(10));
        let chunks = frame_chunks(
            Arc::clone(&buffer),
            Bytes::from_static(b"placeholder"),
            FirstFramePolicy::Wait,
            Duration::from_millis(10),
        );
        tokio::pin!(chunks);

        buffer.push(Bytes::from_static(b"f1"));
        let first = chunks.next().await.unwrap().unwrap();
        assert!(first.ends_with(b"f1\r\n"));
        assert!(!first.ends_with(b"placeholder\r\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_frame_is_reemitted_when_buffer_is_empty() {
        let buffer = Arc::new(FrameBuffer::with_capacity(10));
        buffer.push(Bytes::from_static(b"f1"));

        let chunks = frame_chunks(
            Arc::clone(&buffer),
            Bytes::from_static(b"placeholder"),
            FirstFramePolicy::Placeholder,
            Duration::from_millis(100),
        );
        tokio::pin!(chunks);

        let first = chunks.next().await.unwrap().unwrap();
        let second = chunks.next().await.unwrap().unwrap();
        assert!(first.ends_with(b"f1\r\n"));
        // Buffer is now empty; the relay keeps serving the last frame.
        assert_eq!(first, second);
    }
}
