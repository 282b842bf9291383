//! Amazon IVS implementation of [`StreamSource`]
//!
//! Credentials and region discovery follow the default AWS provider chain:
//! 1. Environment variables (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`)
//! 2. AWS credentials file (`~/.aws/credentials`)
//! 3. IAM instance profile / IRSA
//!
//! An explicit region from configuration takes precedence over discovery.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ivs::error::DisplayErrorContext;
use aws_sdk_ivs::primitives::DateTime as AwsDateTime;
use aws_sdk_ivs::types;
use aws_sdk_ivs::Client;
use chrono::{DateTime, Utc};

use super::{
    AudioIngest, IngestConfiguration, LiveStream, StreamSession, StreamSource, UpstreamError,
    VideoIngest,
};
use crate::logger;

/// IVS client wrapper
pub struct IvsClient {
    client: Client,
}

impl IvsClient {
    /// Build a client from the default AWS configuration chain
    pub async fn new(region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        let sdk_config = loader.load().await;

        match sdk_config.region() {
            Some(r) => logger::log_info(&format!("[IVS] Client initialized for region {r}")),
            None => logger::log_warning("[IVS] No AWS region configured or discovered"),
        }

        Self {
            client: Client::new(&sdk_config),
        }
    }
}

#[async_trait]
impl StreamSource for IvsClient {
    async fn get_stream(&self, channel_arn: &str) -> Result<LiveStream, UpstreamError> {
        let output = self
            .client
            .get_stream()
            .channel_arn(channel_arn)
            .send()
            .await
            .map_err(|e| {
                let service_err = e.into_service_error();
                if service_err.is_channel_not_broadcasting() {
                    UpstreamError::NotBroadcasting
                } else {
                    UpstreamError::Sdk(DisplayErrorContext(&service_err).to_string())
                }
            })?;

        let stream = output
            .stream()
            .ok_or_else(|| UpstreamError::StreamMissing(channel_arn.to_string()))?;

        Ok(LiveStream {
            channel_arn: stream.channel_arn().map(ToString::to_string),
            stream_id: stream.stream_id().map(ToString::to_string),
            playback_url: stream.playback_url().map(ToString::to_string),
            start_time: stream.start_time().and_then(to_chrono),
            state: stream
                .state()
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
            health: stream
                .health()
                .map(|h| h.as_str().to_string())
                .unwrap_or_default(),
            viewer_count: stream.viewer_count(),
        })
    }

    async fn get_stream_session(
        &self,
        channel_arn: &str,
        stream_id: &str,
    ) -> Result<StreamSession, UpstreamError> {
        let output = self
            .client
            .get_stream_session()
            .channel_arn(channel_arn)
            .stream_id(stream_id)
            .send()
            .await
            .map_err(|e| UpstreamError::Sdk(DisplayErrorContext(&e).to_string()))?;

        let session = output
            .stream_session()
            .ok_or_else(|| UpstreamError::SessionMissing(stream_id.to_string()))?;

        Ok(StreamSession {
            ingest: session.ingest_configuration().map(convert_ingest),
        })
    }
}

fn convert_ingest(config: &types::IngestConfiguration) -> IngestConfiguration {
    IngestConfiguration {
        video: config.video().map(|v| VideoIngest {
            codec: v.codec().map(ToString::to_string),
            width: v.video_width(),
            height: v.video_height(),
            target_framerate: v.target_framerate(),
            target_bitrate: v.target_bitrate(),
        }),
        audio: config.audio().map(|a| AudioIngest {
            codec: a.codec().map(ToString::to_string),
            target_bitrate: a.target_bitrate(),
            channels: a.channels(),
            sample_rate: a.sample_rate(),
        }),
    }
}

/// Convert an SDK timestamp to chrono, dropping values chrono cannot represent
fn to_chrono(t: &AwsDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(t.secs(), t.subsec_nanos())
}
