//! Static file serving module
//!
//! Serves the built single-page application. Paths that do not exist under
//! the root fall back to the entry page so client-side routing can take
//! over; resolved paths are confined to the root directory.

use crate::handler::router::RequestContext;
use crate::http::cache::{self, CachePolicy};
use crate::http::response::{
    build_304_response, build_file_response, build_partial_response, AssetHeaders,
};
use crate::http::{self, mime, HttpResponse, RangeParseResult};
use crate::logger;
use hyper::body::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;

/// Outcome of mapping a request path onto the static root
#[derive(Debug, PartialEq, Eq)]
pub enum Resolved {
    /// An existing file inside the root
    File(PathBuf),
    /// Nothing on disk matches; serve the fallback page
    Fallback(PathBuf),
    /// The path exists but is not readable
    Forbidden,
    /// The request cannot be mapped into the root
    NotFound,
}

/// Serve the single-page application rooted at `root`
pub async fn serve_spa(ctx: &RequestContext<'_>, root: &str, fallback: &str) -> HttpResponse {
    match resolve(root, ctx.path, fallback).await {
        Resolved::File(path) => serve_file(ctx, &path).await,
        Resolved::Fallback(path) => {
            logger::log_debug(&format!("[Static] {} -> {}", ctx.path, path.display()));
            serve_file(ctx, &path).await
        }
        Resolved::Forbidden => http::build_403_response(),
        Resolved::NotFound => http::build_404_response(),
    }
}

/// Map a request path to a file under `root`
pub async fn resolve(root: &str, request_path: &str, fallback: &str) -> Resolved {
    let root = match fs::canonicalize(root).await {
        Ok(p) => p,
        Err(e) => {
            logger::log_warning(&format!(
                "Static directory not found or inaccessible '{root}': {e}"
            ));
            return Resolved::NotFound;
        }
    };
    let fallback_path = root.join(fallback);

    // Undecodable paths cannot name a file on disk
    let Ok(decoded) = urlencoding::decode(request_path) else {
        return Resolved::Fallback(fallback_path);
    };
    if decoded.contains('\0') {
        return Resolved::Fallback(fallback_path);
    }

    let relative = decoded.trim_start_matches('/');
    if relative.is_empty() {
        return Resolved::Fallback(fallback_path);
    }

    let candidate = match fs::canonicalize(root.join(relative)).await {
        Ok(p) => p,
        Err(e) if e.kind() == ErrorKind::PermissionDenied => return Resolved::Forbidden,
        Err(_) => return Resolved::Fallback(fallback_path),
    };

    if !candidate.starts_with(&root) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {} -> {}",
            request_path,
            candidate.display()
        ));
        return Resolved::NotFound;
    }

    if candidate.is_dir() {
        let index = candidate.join(fallback);
        return if index.is_file() {
            Resolved::File(index)
        } else {
            Resolved::Fallback(fallback_path)
        };
    }

    Resolved::File(candidate)
}

/// Read a file and build a response with validators and range support
async fn serve_file(ctx: &RequestContext<'_>, path: &Path) -> HttpResponse {
    let content = match fs::read(path).await {
        Ok(c) => Bytes::from(c),
        Err(e) => return read_error_response(path, &e),
    };
    let modified = fs::metadata(path)
        .await
        .ok()
        .and_then(|m| m.modified().ok());

    build_static_file_response(ctx, &content, mime::content_type_for(path), modified)
}

fn read_error_response(path: &Path, err: &std::io::Error) -> HttpResponse {
    match err.kind() {
        ErrorKind::NotFound => {
            logger::log_warning(&format!("File disappeared or fallback missing: '{}'", path.display()));
            http::build_404_response()
        }
        ErrorKind::PermissionDenied => {
            logger::log_error(&format!("Permission denied reading '{}'", path.display()));
            http::build_403_response()
        }
        _ => {
            logger::log_error(&format!("Failed to read file '{}': {err}", path.display()));
            http::build_500_response()
        }
    }
}

/// HTML entry points must be revalidated so new deployments are picked up
fn cache_policy_for(content_type: &str) -> CachePolicy {
    if content_type.starts_with("text/html") {
        CachePolicy::NoCache
    } else {
        CachePolicy::default()
    }
}

/// Build static file response with `ETag`, `Last-Modified` and Range support
fn build_static_file_response(
    ctx: &RequestContext<'_>,
    data: &Bytes,
    content_type: &str,
    modified: Option<SystemTime>,
) -> HttpResponse {
    let etag = cache::generate_etag(data);
    let last_modified = modified.map(cache::format_http_date);
    let headers = AssetHeaders {
        content_type,
        etag: &etag,
        last_modified: last_modified.as_deref(),
        cache: cache_policy_for(content_type),
    };

    if cache::is_not_modified(
        ctx.if_none_match.as_deref(),
        ctx.if_modified_since.as_deref(),
        &etag,
        modified,
    ) {
        return build_304_response(&headers);
    }

    match http::parse_range_header(ctx.range_header.as_deref(), data.len()) {
        RangeParseResult::Valid(range) => {
            build_partial_response(data, range, &headers, ctx.is_head)
        }
        RangeParseResult::NotSatisfiable => http::build_416_response(data.len()),
        RangeParseResult::None => build_file_response(data.clone(), &headers, ctx.is_head),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use hyper::StatusCode;
    use tempfile::TempDir;

    const INDEX: &str = "<!doctype html><div id=\"app\"></div>";
    const SCRIPT: &str = "console.log('app')";

    fn dist() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), INDEX).unwrap();
        std::fs::create_dir_all(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets/app.js"), SCRIPT).unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/index.html"), "docs").unwrap();
        dir
    }

    fn ctx(path: &str) -> RequestContext<'_> {
        RequestContext {
            path,
            is_head: false,
            if_none_match: None,
            if_modified_since: None,
            range_header: None,
        }
    }

    async fn body_string(response: HttpResponse) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn root(dir: &TempDir) -> &str {
        dir.path().to_str().unwrap()
    }

    #[tokio::test]
    async fn test_missing_path_serves_index() {
        let dir = dist();
        let response = serve_spa(&ctx("/dashboard/settings"), root(&dir), "index.html").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["Content-Type"], "text/html; charset=utf-8");
        assert_eq!(response.headers()["Cache-Control"], "no-cache");
        assert_eq!(body_string(response).await, INDEX);
    }

    #[tokio::test]
    async fn test_existing_file_served_directly() {
        let dir = dist();
        let response = serve_spa(&ctx("/assets/app.js"), root(&dir), "index.html").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["Content-Type"],
            "text/javascript; charset=utf-8"
        );
        assert!(response.headers().contains_key("Last-Modified"));
        assert_eq!(body_string(response).await, SCRIPT);
    }

    #[tokio::test]
    async fn test_root_and_directories() {
        let dir = dist();
        let canonical = dir.path().canonicalize().unwrap();

        assert_eq!(
            resolve(root(&dir), "/", "index.html").await,
            Resolved::Fallback(canonical.join("index.html"))
        );
        assert_eq!(
            resolve(root(&dir), "/docs/", "index.html").await,
            Resolved::File(canonical.join("docs/index.html"))
        );
        // Directory without its own index falls back to the root entry page
        assert_eq!(
            resolve(root(&dir), "/assets", "index.html").await,
            Resolved::Fallback(canonical.join("index.html"))
        );
    }

    #[tokio::test]
    async fn test_percent_encoded_path() {
        let dir = dist();
        std::fs::write(dir.path().join("my file.txt"), "spaced").unwrap();
        let response = serve_spa(&ctx("/my%20file.txt"), root(&dir), "index.html").await;
        assert_eq!(body_string(response).await, "spaced");
    }

    #[tokio::test]
    async fn test_traversal_blocked() {
        let outer = tempfile::tempdir().unwrap();
        std::fs::write(outer.path().join("secret.txt"), "secret").unwrap();
        std::fs::create_dir_all(outer.path().join("dist")).unwrap();
        std::fs::write(outer.path().join("dist/index.html"), INDEX).unwrap();
        let root = outer.path().join("dist");
        let root = root.to_str().unwrap();

        assert_eq!(
            resolve(root, "/../secret.txt", "index.html").await,
            Resolved::NotFound
        );
        assert_eq!(
            resolve(root, "/%2e%2e/secret.txt", "index.html").await,
            Resolved::NotFound
        );
        let response = serve_spa(&ctx("/../secret.txt"), root, "index.html").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_undecodable_path_serves_index() {
        let dir = dist();
        let index = dir.path().canonicalize().unwrap().join("index.html");

        assert_eq!(
            resolve(root(&dir), "/watch/%FF", "index.html").await,
            Resolved::Fallback(index.clone())
        );
        assert_eq!(
            resolve(root(&dir), "/watch/%00", "index.html").await,
            Resolved::Fallback(index)
        );

        let response = serve_spa(&ctx("/watch/%FF"), root(&dir), "index.html").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, INDEX);
    }

    #[tokio::test]
    async fn test_missing_fallback_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let response = serve_spa(&ctx("/anything"), root(&dir), "index.html").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_missing_root_is_404() {
        let response = serve_spa(&ctx("/"), "/nonexistent/dist/root", "index.html").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_etag_revalidation() {
        let dir = dist();
        let first = serve_spa(&ctx("/assets/app.js"), root(&dir), "index.html").await;
        let etag = first.headers()["ETag"].to_str().unwrap().to_string();

        let mut conditional = ctx("/assets/app.js");
        conditional.if_none_match = Some(etag);
        let response = serve_spa(&conditional, root(&dir), "index.html").await;
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert!(body_string(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_if_modified_since() {
        let dir = dist();
        let first = serve_spa(&ctx("/assets/app.js"), root(&dir), "index.html").await;
        let last_modified = first.headers()["Last-Modified"]
            .to_str()
            .unwrap()
            .to_string();

        let mut conditional = ctx("/assets/app.js");
        conditional.if_modified_since = Some(last_modified);
        let response = serve_spa(&conditional, root(&dir), "index.html").await;
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn test_range_request() {
        let dir = dist();
        let mut ranged = ctx("/assets/app.js");
        ranged.range_header = Some("bytes=0-6".to_string());
        let response = serve_spa(&ranged, root(&dir), "index.html").await;

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            response.headers()["Content-Range"],
            format!("bytes 0-6/{}", SCRIPT.len()).as_str()
        );
        assert_eq!(body_string(response).await, "console");

        let mut unsatisfiable = ctx("/assets/app.js");
        unsatisfiable.range_header = Some("bytes=9999-".to_string());
        let response = serve_spa(&unsatisfiable, root(&dir), "index.html").await;
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    }

    #[tokio::test]
    async fn test_head_request() {
        let dir = dist();
        let mut head = ctx("/assets/app.js");
        head.is_head = true;
        let response = serve_spa(&head, root(&dir), "index.html").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["Content-Length"],
            SCRIPT.len().to_string().as_str()
        );
        assert!(body_string(response).await.is_empty());
    }
}
