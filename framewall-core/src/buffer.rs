//! Bounded per-topic frame buffer.
//!
//! Each topic owns exactly one [`FrameBuffer`]: a fixed-capacity FIFO of
//! encoded frame payloads. The subscriber worker is the single logical
//! writer; any number of concurrent stream connections may read. Both sides
//! are non-blocking: `push` discards the incoming frame when the buffer is
//! full (drop-newest, never drop-oldest, so readers only ever observe
//! publish order) and `try_pop` returns `None` instead of waiting.

use std::collections::VecDeque;

use bytes::Bytes;
use parking_lot::Mutex;

/// Default number of frames a topic buffer holds before dropping.
pub const DEFAULT_CAPACITY: usize = 10;

/// Result of a non-blocking push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The frame was enqueued.
    Accepted,
    /// The buffer was full; the incoming frame was discarded.
    Dropped,
}

/// Fixed-capacity FIFO of encoded frames for one topic.
///
/// Created once at registry-population time and never resized. The lock is
/// held only for the enqueue/dequeue itself, so readers on one topic can
/// never starve the writer.
#[derive(Debug)]
pub struct FrameBuffer {
    frames: Mutex<VecDeque<Bytes>>,
    capacity: usize,
}

impl FrameBuffer {
    /// Create a buffer holding at most `capacity` frames (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Enqueue a frame without blocking.
    ///
    /// On a full buffer the *incoming* frame is discarded and
    /// [`PushOutcome::Dropped`] is returned; this is a non-fatal condition
    /// the caller is expected to log and move past.
    pub fn push(&self, frame: Bytes) -> PushOutcome {
        let mut frames = self.frames.lock();
        if frames.len() >= self.capacity {
            return PushOutcome::Dropped;
        }
        frames.push_back(frame);
        PushOutcome::Accepted
    }

    /// Dequeue the oldest frame, or `None` when the buffer is empty.
    pub fn try_pop(&self) -> Option<Bytes> {
        self.frames.lock().pop_front()
    }

    /// Number of frames currently buffered.
    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    /// Whether the buffer currently holds no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }

    /// The fixed capacity this buffer was created with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(tag: u8) -> Bytes {
        Bytes::from(vec![tag; 4])
    }

    #[test]
    fn drains_in_publish_order() {
        let buffer = FrameBuffer::with_capacity(10);
        for tag in 0..5u8 {
            assert_eq!(buffer.push(frame(tag)), PushOutcome::Accepted);
        }
        for tag in 0..5u8 {
            assert_eq!(buffer.try_pop(), Some(frame(tag)));
        }
        assert_eq!(buffer.try_pop(), None);
    }

    #[test]
    fn overflow_drops_the_newest_frame() {
        let buffer = FrameBuffer::with_capacity(3);
        assert_eq!(buffer.push(frame(0)), PushOutcome::Accepted);
        assert_eq!(buffer.push(frame(1)), PushOutcome::Accepted);
        assert_eq!(buffer.push(frame(2)), PushOutcome::Accepted);
        assert_eq!(buffer.push(frame(3)), PushOutcome::Dropped);

        // The first `capacity` frames survive, the overflowing one does not.
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.try_pop(), Some(frame(0)));
        assert_eq!(buffer.try_pop(), Some(frame(1)));
        assert_eq!(buffer.try_pop(), Some(frame(2)));
        assert_eq!(buffer.try_pop(), None);
    }

    #[test]
    fn pop_after_drain_does_not_block_or_panic() {
        let buffer = FrameBuffer::with_capacity(10);
        buffer.push(frame(1));
        buffer.push(frame(2));
        assert_eq!(buffer.try_pop(), Some(frame(1)));
        assert_eq!(buffer.try_pop(), Some(frame(2)));
        assert_eq!(buffer.try_pop(), None);
        assert!(buffer.is_empty());
    }

    #[test]
    fn capacity_is_never_exceeded() {
        let buffer = FrameBuffer::with_capacity(2);
        for tag in 0..20u8 {
            buffer.push(frame(tag));
            assert!(buffer.len() <= buffer.capacity());
        }
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let buffer = FrameBuffer::with_capacity(0);
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.push(frame(1)), PushOutcome::Accepted);
        assert_eq!(buffer.push(frame(2)), PushOutcome::Dropped);
    }
}
