//! Topic → frame buffer registry.
//!
//! Populated once during bootstrap through [`RegistryBuilder`], then frozen
//! into a [`FrameRegistry`] that is shared read-only by every subscriber
//! worker and HTTP handler. Lookups after the freeze take no lock; an
//! unknown topic is a query-time `None`, never a panic, and never allocates
//! an entry.

use std::{collections::HashMap, sync::Arc};

use thiserror::Error;

use crate::buffer::FrameBuffer;

/// Errors raised while populating the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The same topic was registered twice during bootstrap.
    #[error("topic {0:?} is already registered")]
    DuplicateTopic(String),
}

/// Bootstrap-only construction side of the registry.
#[derive(Debug)]
pub struct RegistryBuilder {
    buffer_capacity: usize,
    buffers: HashMap<String, Arc<FrameBuffer>>,
    order: Vec<String>,
}

impl RegistryBuilder {
    /// Start a builder whose buffers each hold `buffer_capacity` frames.
    pub fn new(buffer_capacity: usize) -> Self {
        Self {
            buffer_capacity,
            buffers: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a topic and create its buffer.
    ///
    /// Must only be called before workers start; the returned handle is the
    /// single-writer slot handed to that topic's subscriber worker.
    pub fn register(
        &mut self,
        topic: impl Into<String>,
    ) -> Result<Arc<FrameBuffer>, RegistryError> {
        let topic = topic.into();
        if self.buffers.contains_key(&topic) {
            return Err(RegistryError::DuplicateTopic(topic));
        }
        let buffer = Arc::new(FrameBuffer::with_capacity(self.buffer_capacity));
        self.buffers.insert(topic.clone(), Arc::clone(&buffer));
        self.order.push(topic);
        Ok(buffer)
    }

    /// Freeze the topic set. No topic can be added or removed afterwards.
    pub fn build(self) -> FrameRegistry {
        FrameRegistry {
            buffers: self.buffers,
            order: self.order,
        }
    }
}

/// Read-only topic → buffer mapping, fixed for the process lifetime.
#[derive(Debug)]
pub struct FrameRegistry {
    buffers: HashMap<String, Arc<FrameBuffer>>,
    order: Vec<String>,
}

impl FrameRegistry {
    /// Look up the buffer for `topic`.
    pub fn get(&self, topic: &str) -> Option<Arc<FrameBuffer>> {
        self.buffers.get(topic).cloned()
    }

    /// Configured topic names in subscription order.
    pub fn topics(&self) -> &[String] {
        &self.order
    }

    /// Number of configured topics.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no topics were configured.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
