//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: body size validation, dispatch
//! to the metadata API, health probes or the static application, and access
//! logging.

use crate::config::AppState;
use crate::handler::static_files;
use crate::http::{self, HttpResponse};
use crate::logger::{self, AccessLogEntry};
use crate::metadata::{self, handler::METADATA_PATH};
use hyper::body::Body;
use hyper::header::{HeaderValue, SERVER};
use hyper::http::request::Parts;
use hyper::{HeaderMap, Method, Request};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

/// Request context encapsulating information needed for static file serving
pub struct RequestContext<'a> {
    pub path: &'a str,
    pub is_head: bool,
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<String>,
    pub range_header: Option<String>,
}

impl<'a> RequestContext<'a> {
    fn new(path: &'a str, method: &Method, headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };

        Self {
            path,
            is_head: *method == Method::HEAD,
            if_none_match: header("if-none-match"),
            if_modified_since: header("if-modified-since"),
            range_header: header("range"),
        }
    }
}

/// Main entry point for HTTP request handling
///
/// The request body is never read, so any body type is accepted.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: Option<SocketAddr>,
) -> Result<HttpResponse, Infallible> {
    let (parts, _body) = req.into_parts();

    let mut entry = state.config.logging.access_log.then(|| {
        AccessLogEntry::start(
            peer_addr,
            &parts.method,
            &parts.uri,
            parts.version,
            &parts.headers,
        )
    });

    let mut response = route_request(&parts, &state).await;

    if let Ok(server_name) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, server_name);
    }

    if let Some(entry) = entry.as_mut() {
        entry.finish(response.status().as_u16(), body_len(&response));
        logger::log_access(entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Route request based on path and method
async fn route_request(parts: &Parts, state: &AppState) -> HttpResponse {
    let method = &parts.method;
    let path = parts.uri.path();

    // 1. Check body size
    if let Some(resp) = check_body_size(&parts.headers, state.config.http.max_body_size) {
        return resp;
    }

    // 2. Metadata API (handles its own methods and CORS)
    if path == METADATA_PATH {
        return metadata::handle_metadata(method, state).await;
    }

    // 3. Health check endpoints
    let health = &state.config.routes.health;
    if health.enabled && (path == health.liveness_path || path == health.readiness_path) {
        return http::build_health_response("ok");
    }

    // 4. Static application
    if let Some(resp) = check_http_method(method) {
        return resp;
    }
    let ctx = RequestContext::new(path, method, &parts.headers);
    static_files::serve_spa(
        &ctx,
        &state.config.static_files.root,
        &state.config.static_files.fallback,
    )
    .await
}

/// Check HTTP method and return appropriate response for non-GET/HEAD methods
fn check_http_method(method: &Method) -> Option<HttpResponse> {
    match *method {
        Method::GET | Method::HEAD => None,
        Method::OPTIONS => Some(http::build_options_response()),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(headers: &HeaderMap, max_body_size: u64) -> Option<HttpResponse> {
    let content_length = headers.get("content-length")?;
    let Ok(size_str) = content_length.to_str() else {
        logger::log_warning("Content-Length header contains non-ASCII characters");
        return None;
    };
    match size_str.parse::<u64>() {
        Ok(size) if size > max_body_size => {
            logger::log_warning(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            Some(http::build_413_response())
        }
        Ok(_) => None,
        Err(_) => {
            logger::log_warning(&format!(
                "Invalid Content-Length value: '{size_str}', skipping size check"
            ));
            None
        }
    }
}

fn body_len(response: &HttpResponse) -> usize {
    response
        .body()
        .size_hint()
        .exact()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use crate::metadata::tests::FakeSource;
    use http_body_util::{BodyExt, Empty};
    use hyper::body::Bytes;
    use hyper::StatusCode;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<AppState>) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>app</html>").unwrap();
        std::fs::write(dir.path().join("robots.txt"), "User-agent: *").unwrap();
        let config = test_config(dir.path().to_str().unwrap());
        let state = Arc::new(AppState::new(config, Arc::new(FakeSource::offline())));
        (dir, state)
    }

    fn request(method: Method, path: &str) -> Request<Empty<Bytes>> {
        Request::builder()
            .method(method)
            .uri(path)
            .body(Empty::new())
            .unwrap()
    }

    async fn send(state: &Arc<AppState>, req: Request<Empty<Bytes>>) -> (StatusCode, HeaderMap, String) {
        let response = handle_request(req, Arc::clone(state), None).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_metadata_route() {
        let (_dir, state) = setup();
        let (status, headers, body) = send(&state, request(Method::GET, METADATA_PATH)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["Content-Type"], "application/json");
        assert_eq!(headers[SERVER], "test-server");
        assert_eq!(body, r#"{"state":"OFFLINE","viewerCount":0,"health":"UNKNOWN"}"#);
    }

    #[tokio::test]
    async fn test_metadata_preflight() {
        let (_dir, state) = setup();
        let (status, headers, body) = send(&state, request(Method::OPTIONS, METADATA_PATH)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["Access-Control-Allow-Origin"], "*");
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_spa_fallback_and_assets() {
        let (_dir, state) = setup();

        let (status, _, body) = send(&state, request(Method::GET, "/dashboard/settings")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<html>app</html>");

        let (status, _, body) = send(&state, request(Method::GET, "/robots.txt")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "User-agent: *");

        // Unknown API paths belong to the client router too
        let (status, _, body) = send(&state, request(Method::GET, "/api/unknown")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<html>app</html>");
    }

    #[tokio::test]
    async fn test_health_probes() {
        let (_dir, state) = setup();
        let (status, _, body) = send(&state, request(Method::GET, "/healthz")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");

        let (status, _, _) = send(&state, request(Method::GET, "/readyz")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_static_methods() {
        let (_dir, state) = setup();
        let (status, headers, _) = send(&state, request(Method::OPTIONS, "/")).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(headers["Allow"], "GET, HEAD, OPTIONS");

        let (status, _, _) = send(&state, request(Method::DELETE, "/index.html")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_body_too_large() {
        let (_dir, state) = setup();
        let req = Request::builder()
            .method(Method::GET)
            .uri("/")
            .header("content-length", "4096")
            .body(Empty::<Bytes>::new())
            .unwrap();
        let (status, _, _) = send(&state, req).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }
}
