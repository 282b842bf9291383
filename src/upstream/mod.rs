//! Upstream live-streaming API module
//!
//! Defines the SDK-independent view of the two read operations the backend
//! consumes ("get stream" and "get stream session") and the [`StreamSource`]
//! trait that the metadata proxy depends on. The production implementation
//! talks to Amazon IVS, see [`ivs::IvsClient`].

mod error;
pub mod ivs;

pub use error::UpstreamError;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A live stream as reported by "get stream"
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveStream {
    pub channel_arn: Option<String>,
    pub stream_id: Option<String>,
    pub playback_url: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    /// Upstream state value, e.g. `LIVE`
    pub state: String,
    /// Upstream health value, e.g. `HEALTHY`, `STARVING`
    pub health: String,
    pub viewer_count: i64,
}

/// A stream session as reported by "get stream session"
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamSession {
    pub ingest: Option<IngestConfiguration>,
}

/// Encoder settings of the incoming feed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestConfiguration {
    pub video: Option<VideoIngest>,
    pub audio: Option<AudioIngest>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoIngest {
    pub codec: Option<String>,
    pub width: i64,
    pub height: i64,
    pub target_framerate: i64,
    pub target_bitrate: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioIngest {
    pub codec: Option<String>,
    pub target_bitrate: i64,
    pub channels: i64,
    pub sample_rate: i64,
}

/// Read access to the upstream live-streaming API
#[async_trait]
pub trait StreamSource: Send + Sync {
    /// Fetch the current stream of a channel.
    ///
    /// An offline channel is reported as an error, never as `Ok`.
    async fn get_stream(&self, channel_arn: &str) -> Result<LiveStream, UpstreamError>;

    /// Fetch the session details of a stream on a channel
    async fn get_stream_session(
        &self,
        channel_arn: &str,
        stream_id: &str,
    ) -> Result<StreamSession, UpstreamError>;
}
