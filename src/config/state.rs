// Application state module
// Immutable state shared by every request handler

use std::sync::Arc;

use super::types::Config;
use crate::upstream::StreamSource;

/// Application state, built once at startup and never mutated
pub struct AppState {
    pub config: Config,
    /// Upstream live-streaming API
    pub upstream: Arc<dyn StreamSource>,
}

impl AppState {
    pub fn new(config: Config, upstream: Arc<dyn StreamSource>) -> Self {
        Self { config, upstream }
    }
}
