use std::{fmt, sync::Arc};

use bytes::Bytes;
use framewall_core::FrameRegistry;

use crate::config::Config;

/// Shared handler state: the frozen topic registry, the composed
/// configuration and the pre-rendered placeholder frame. Cloning is cheap;
/// every shard listener serves the same state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<FrameRegistry>,
    pub config: Arc<Config>,
    pub placeholder: Bytes,
}

impl AppState {
    pub fn new(
        registry: Arc<FrameRegistry>,
        config: Arc<Config>,
        placeholder: Bytes,
    ) -> Self {
        Self {
            registry,
            config,
            placeholder,
        }
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
