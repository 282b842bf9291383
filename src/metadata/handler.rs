//! HTTP handler for `/api/stream/metadata`
//!
//! Always answers 200 with a [`StreamStatus`] for GET/HEAD, so the frontend
//! tells live from offline by the `state` field alone. Methods other than
//! GET, HEAD and OPTIONS get 405 with an [`ErrorResponse`] body.

use hyper::{Method, Response, StatusCode};

use super::{fetch_stream_status, ErrorResponse};
use crate::config::AppState;
use crate::http::cache::CachePolicy;
use crate::http::response::{build_json_response, with_cors};
use crate::http::HttpResponse;
use crate::logger;

pub const METADATA_PATH: &str = "/api/stream/metadata";

/// Serve the metadata endpoint
pub async fn handle_metadata(method: &Method, state: &AppState) -> HttpResponse {
    match *method {
        Method::OPTIONS => with_cors(Response::builder().status(StatusCode::OK))
            .header("Content-Length", 0)
            .body(http_body_util::Full::default())
            .unwrap_or_else(|e| {
                logger::log_error(&format!("Failed to build preflight response: {e}"));
                Response::default()
            }),
        Method::GET | Method::HEAD => {
            let status =
                fetch_stream_status(state.upstream.as_ref(), &state.config.stream.channel_arn)
                    .await;
            let builder = with_cors(Response::builder().status(StatusCode::OK))
                .header("Cache-Control", CachePolicy::NoStore.to_header_value());
            build_json_response(builder, &status, *method == Method::HEAD)
        }
        _ => {
            logger::log_warning(&format!("Method not allowed on {METADATA_PATH}: {method}"));
            let builder = with_cors(Response::builder().status(StatusCode::METHOD_NOT_ALLOWED))
                .header("Allow", "GET, HEAD, OPTIONS");
            let body = ErrorResponse {
                error: format!("Method {method} not allowed"),
            };
            build_json_response(builder, &body, false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use crate::metadata::tests::{live_stream, FakeSource};
    use crate::upstream::{StreamSession, UpstreamError};
    use http_body_util::BodyExt;
    use hyper::body::Bytes;
    use std::sync::Arc;

    fn state(source: FakeSource) -> AppState {
        AppState::new(test_config("dist"), Arc::new(source))
    }

    async fn body_bytes(response: HttpResponse) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    fn assert_cors(response: &HttpResponse) {
        let headers = response.headers();
        assert_eq!(headers["Access-Control-Allow-Origin"], "*");
        assert_eq!(headers["Access-Control-Allow-Methods"], "GET, OPTIONS");
        assert_eq!(headers["Access-Control-Allow-Headers"], "Content-Type");
    }

    #[tokio::test]
    async fn test_options_preflight() {
        // Upstream state must not matter for preflight
        let response = handle_metadata(&Method::OPTIONS, &state(FakeSource::offline())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_cors(&response);
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_get_offline_is_200() {
        let response = handle_metadata(&Method::GET, &state(FakeSource::offline())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["Content-Type"], "application/json");
        assert_eq!(response.headers()["Cache-Control"], "no-store");
        assert_cors(&response);

        let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"state": "OFFLINE", "viewerCount": 0, "health": "UNKNOWN"})
        );
    }

    #[tokio::test]
    async fn test_get_live() {
        let source = FakeSource::new(Ok(live_stream()), Ok(StreamSession::default()));
        let response = handle_metadata(&Method::GET, &state(source)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(json["state"], "LIVE");
        assert_eq!(json["viewerCount"], 17);
        assert!(json.get("ingest").is_none());
    }

    #[tokio::test]
    async fn test_head_has_length_without_body() {
        let response = handle_metadata(&Method::HEAD, &state(FakeSource::offline())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_cors(&response);

        let expected = r#"{"state":"OFFLINE","viewerCount":0,"health":"UNKNOWN"}"#.len();
        assert_eq!(
            response.headers()["Content-Length"],
            expected.to_string().as_str()
        );
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_other_methods_rejected() {
        let source = FakeSource::new(
            Err(UpstreamError::NotBroadcasting),
            Err(UpstreamError::NotBroadcasting),
        );
        let response = handle_metadata(&Method::POST, &state(source)).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_cors(&response);

        let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(json, serde_json::json!({"error": "Method POST not allowed"}));
    }
}
