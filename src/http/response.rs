//! HTTP response building module
//!
//! Provides builders for the responses the server emits, decoupled from the
//! handlers that choose them.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::http::response::Builder;
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::cache::CachePolicy;
use super::range::ByteRange;

pub type HttpResponse = Response<Full<Bytes>>;

/// Validators and caching headers shared by full, partial and 304 responses
#[derive(Debug, Clone)]
pub struct AssetHeaders<'a> {
    pub content_type: &'a str,
    pub etag: &'a str,
    pub last_modified: Option<&'a str>,
    pub cache: CachePolicy,
}

impl AssetHeaders<'_> {
    fn apply(&self, mut builder: Builder) -> Builder {
        builder = builder
            .header("ETag", self.etag)
            .header("Cache-Control", self.cache.to_header_value());
        if let Some(date) = self.last_modified {
            builder = builder.header("Last-Modified", date);
        }
        builder
    }
}

/// Add the CORS headers the frontend needs for the metadata API
pub fn with_cors(builder: Builder) -> Builder {
    builder
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type")
}

/// Build 304 Not Modified response
pub fn build_304_response(headers: &AssetHeaders<'_>) -> HttpResponse {
    finish(
        "304",
        headers.apply(Response::builder().status(StatusCode::NOT_MODIFIED)),
        Bytes::new(),
    )
}

/// Build a 200 response carrying a whole file
pub fn build_file_response(data: Bytes, headers: &AssetHeaders<'_>, is_head: bool) -> HttpResponse {
    let builder = Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", headers.content_type)
        .header("Content-Length", data.len())
        .header("Accept-Ranges", "bytes");
    let body = if is_head { Bytes::new() } else { data };
    finish("200", headers.apply(builder), body)
}

/// Build 206 Partial Content response; `data` must hold the whole file
pub fn build_partial_response(
    data: &Bytes,
    range: ByteRange,
    headers: &AssetHeaders<'_>,
    is_head: bool,
) -> HttpResponse {
    let builder = Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header("Content-Type", headers.content_type)
        .header("Content-Length", range.content_length())
        .header("Content-Range", range.content_range(data.len()))
        .header("Accept-Ranges", "bytes");
    let body = if is_head {
        Bytes::new()
    } else {
        data.slice(range.start..=range.end)
    };
    finish("206", headers.apply(builder), body)
}

/// Build 416 Range Not Satisfiable response
pub fn build_416_response(file_size: usize) -> HttpResponse {
    plain_text(StatusCode::RANGE_NOT_SATISFIABLE, "416 Range Not Satisfiable")
        .map(|mut r| {
            if let Ok(v) = format!("bytes */{file_size}").parse() {
                r.headers_mut().insert("Content-Range", v);
            }
            r
        })
        .unwrap_or_else(|| fallback(StatusCode::RANGE_NOT_SATISFIABLE))
}

/// Build 403 Forbidden response
pub fn build_403_response() -> HttpResponse {
    plain_text(StatusCode::FORBIDDEN, "403 Forbidden")
        .unwrap_or_else(|| fallback(StatusCode::FORBIDDEN))
}

/// Build 404 Not Found response
pub fn build_404_response() -> HttpResponse {
    plain_text(StatusCode::NOT_FOUND, "404 Not Found")
        .unwrap_or_else(|| fallback(StatusCode::NOT_FOUND))
}

/// Build 405 Method Not Allowed response for static content
pub fn build_405_response() -> HttpResponse {
    plain_text(StatusCode::METHOD_NOT_ALLOWED, "405 Method Not Allowed")
        .map(|mut r| {
            r.headers_mut()
                .insert("Allow", hyper::header::HeaderValue::from_static("GET, HEAD, OPTIONS"));
            r
        })
        .unwrap_or_else(|| fallback(StatusCode::METHOD_NOT_ALLOWED))
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> HttpResponse {
    plain_text(StatusCode::PAYLOAD_TOO_LARGE, "413 Payload Too Large")
        .unwrap_or_else(|| fallback(StatusCode::PAYLOAD_TOO_LARGE))
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> HttpResponse {
    plain_text(StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error")
        .unwrap_or_else(|| fallback(StatusCode::INTERNAL_SERVER_ERROR))
}

/// Build OPTIONS response for static paths
pub fn build_options_response() -> HttpResponse {
    finish(
        "OPTIONS",
        Response::builder()
            .status(StatusCode::NO_CONTENT)
            .header("Allow", "GET, HEAD, OPTIONS"),
        Bytes::new(),
    )
}

/// Build health check response
pub fn build_health_response(status: &str) -> HttpResponse {
    finish(
        "health",
        Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "text/plain")
            .header("Cache-Control", CachePolicy::NoStore.to_header_value()),
        Bytes::from(status.to_string()),
    )
}

/// Build JSON response from a builder that already carries status and headers
pub fn build_json_response<T: Serialize>(builder: Builder, body: &T, is_head: bool) -> HttpResponse {
    let json = match serde_json::to_vec(body) {
        Ok(j) => j,
        Err(e) => {
            crate::logger::log_error(&format!("Failed to serialize response: {e}"));
            return finish(
                "500",
                Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .header("Content-Type", "application/json"),
                Bytes::from_static(br#"{"error":"Internal server error"}"#),
            );
        }
    };

    let builder = builder
        .header("Content-Type", "application/json")
        .header("Content-Length", json.len());
    let body = if is_head { Bytes::new() } else { Bytes::from(json) };
    finish("JSON", builder, body)
}

fn plain_text(status: StatusCode, message: &'static str) -> Option<HttpResponse> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from_static(message.as_bytes())))
        .map_err(|e| log_build_error(status.as_str(), &e))
        .ok()
}

fn finish(label: &str, builder: Builder, body: Bytes) -> HttpResponse {
    builder.body(Full::new(body)).unwrap_or_else(|e| {
        log_build_error(label, &e);
        fallback(StatusCode::INTERNAL_SERVER_ERROR)
    })
}

fn fallback(status: StatusCode) -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
