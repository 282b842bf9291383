//! Stream metadata module
//!
//! Flattens the upstream "get stream" and "get stream session" results into
//! the JSON contract the frontend consumes. Upstream failures never surface
//! to the caller: a failing stream lookup yields [`StreamStatus::offline`],
//! a failing session lookup just leaves out the `ingest` block.

pub mod handler;

use serde::Serialize;

use crate::logger;
use crate::upstream::{IngestConfiguration, LiveStream, StreamSource};

pub use handler::handle_metadata;

pub const STATE_OFFLINE: &str = "OFFLINE";
pub const HEALTH_UNKNOWN: &str = "UNKNOWN";

/// Start time format: ISO-8601, UTC, millisecond precision
const START_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Current status of the configured channel
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStatus {
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    pub viewer_count: u64,
    pub health: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playback_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingest: Option<IngestInfo>,
}

/// Encoder settings of the incoming feed
///
/// Video and audio fields are filled independently; fields of a missing
/// sub-block are left out of the JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_width: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_height: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_framerate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_bitrate: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_bitrate: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_channels: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_sample_rate: Option<i64>,
}

/// Error body for requests the metadata endpoint cannot serve
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl StreamStatus {
    /// Status reported whenever the stream lookup fails
    pub fn offline() -> Self {
        Self {
            state: STATE_OFFLINE.to_string(),
            start_time: None,
            viewer_count: 0,
            health: HEALTH_UNKNOWN.to_string(),
            stream_id: None,
            playback_url: None,
            channel_arn: None,
            ingest: None,
        }
    }

    fn from_stream(stream: LiveStream) -> Self {
        Self {
            state: stream.state,
            start_time: stream
                .start_time
                .map(|t| t.format(START_TIME_FORMAT).to_string()),
            viewer_count: u64::try_from(stream.viewer_count).unwrap_or(0),
            health: stream.health,
            stream_id: non_empty(stream.stream_id),
            playback_url: non_empty(stream.playback_url),
            channel_arn: non_empty(stream.channel_arn),
            ingest: None,
        }
    }
}

impl From<&IngestConfiguration> for IngestInfo {
    fn from(config: &IngestConfiguration) -> Self {
        let mut info = Self::default();

        if let Some(video) = &config.video {
            info.video_codec = video.codec.clone();
            info.video_width = Some(saturate_i32(video.width));
            info.video_height = Some(saturate_i32(video.height));
            #[allow(clippy::cast_precision_loss)]
            {
                info.video_framerate = Some(video.target_framerate as f64);
            }
            info.video_bitrate = Some(video.target_bitrate);
        }

        if let Some(audio) = &config.audio {
            info.audio_codec = audio.codec.clone();
            info.audio_bitrate = Some(audio.target_bitrate);
            info.audio_channels = Some(saturate_i32(audio.channels));
            info.audio_sample_rate = Some(audio.sample_rate);
        }

        info
    }
}

/// Fetch the current status of `channel_arn`
///
/// Never fails: every upstream error degrades to the offline status or to a
/// status without ingest details.
pub async fn fetch_stream_status(source: &dyn StreamSource, channel_arn: &str) -> StreamStatus {
    let stream = match source.get_stream(channel_arn).await {
        Ok(stream) => stream,
        Err(e) => {
            logger::log_debug(&format!("[Metadata] Reporting offline: {e}"));
            return StreamStatus::offline();
        }
    };

    let mut status = StreamStatus::from_stream(stream);

    if let Some(stream_id) = status.stream_id.as_deref() {
        match source.get_stream_session(channel_arn, stream_id).await {
            Ok(session) => status.ingest = session.ingest.as_ref().map(IngestInfo::from),
            Err(e) => logger::log_debug(&format!("[Metadata] Session lookup skipped: {e}")),
        }
    }

    status
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn saturate_i32(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}
