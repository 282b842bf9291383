// Upstream error types

use thiserror::Error;

/// Errors reported by a [`StreamSource`](super::StreamSource).
///
/// The metadata proxy collapses every variant into the offline payload;
/// the distinction only matters for logging.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("Channel is not broadcasting")]
    NotBroadcasting,

    #[error("Upstream returned no stream for channel {0}")]
    StreamMissing(String),

    #[error("Upstream returned no session for stream {0}")]
    SessionMissing(String),

    #[error("Upstream SDK error: {0}")]
    Sdk(String),
}
