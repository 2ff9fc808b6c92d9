use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::{header, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use rand::Rng;
use std::fmt::Write;
use std::time::Instant;

/// Trace id stored in request extensions and echoed in `X-Trace-Id`.
#[derive(Clone)]
pub struct TraceId(pub String);

impl std::ops::Deref for TraceId {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

/// 16 hex characters (8 random bytes).
fn generate_trace_id() -> String {
    let bytes: [u8; 8] = rand::thread_rng().gen();
    let mut s = String::with_capacity(16);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

const MAX_BODY_LOG_CHARS: usize = 200;
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;
const TRACE_ID_HEADER: HeaderName = HeaderName::from_static("x-trace-id");

/// Truncates to at most `max` bytes on a char boundary.
fn truncate_body(bytes: &[u8], max: usize) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) if s.len() > max => {
            let mut end = max;
            while end > 0 && !s.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &s[..end])
        }
        Ok(s) => s.to_string(),
        Err(_) => "<non-utf8 body>".to_string(),
    }
}

fn format_elapsed(elapsed_us: u128) -> String {
    if elapsed_us < 1000 {
        format!("{elapsed_us}µs")
    } else if elapsed_us < 1_000_000 {
        format!("{}ms", elapsed_us / 1000)
    } else {
        format!("{:.1}s", elapsed_us as f64 / 1_000_000.0)
    }
}

/// Bodies on these paths carry admin mailing lists and are never logged.
fn is_sensitive(path: &str) -> bool {
    path.starts_with("/api/config")
}

/// Buffers a body so it can be logged and then replayed.
async fn buffer(body: Body, limit: usize) -> (Bytes, String) {
    let bytes = axum::body::to_bytes(body, limit).await.unwrap_or_default();
    let snippet = if bytes.is_empty() {
        String::new()
    } else {
        truncate_body(&bytes, MAX_BODY_LOG_CHARS)
    };
    (bytes, snippet)
}

/// Request/response logging middleware.
///
/// Headers are not logged, so the `X-API-Key` value never reaches the logs.
pub async fn request_logging(mut req: Request, next: Next) -> Response {
    let trace_id = generate_trace_id();
    req.extensions_mut().insert(TraceId(trace_id.clone()));

    let path = req.uri().path().to_string();
    if path.starts_with("/docs") {
        return next.run(req).await;
    }
    let method = req.method().clone();
    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| path.clone());
    let sensitive = is_sensitive(&path);

    let req = if !sensitive && matches!(method.as_str(), "POST" | "PUT" | "PATCH") {
        let (parts, body) = req.into_parts();
        let (bytes, snippet) = buffer(body, MAX_REQUEST_BODY_BYTES).await;
        tracing::info!(trace_id = %trace_id, method = %method, path = %target, body = %snippet, "--> request");
        Request::from_parts(parts, Body::from(bytes))
    } else {
        tracing::info!(trace_id = %trace_id, method = %method, path = %target, "--> request");
        req
    };

    let started = Instant::now();
    let response = next.run(req).await;
    let elapsed = format_elapsed(started.elapsed().as_micros());
    let status = response.status().as_u16();

    let (mut parts, body) = response.into_parts();
    let is_json = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));
    let (bytes, snippet) = buffer(body, usize::MAX).await;
    let snippet = if sensitive || !is_json { "" } else { snippet.as_str() };

    match status {
        500.. => tracing::error!(trace_id = %trace_id, status, elapsed = %elapsed, body = %snippet, "<-- response"),
        400..=499 => tracing::warn!(trace_id = %trace_id, status, elapsed = %elapsed, body = %snippet, "<-- response"),
        _ => tracing::info!(trace_id = %trace_id, status, elapsed = %elapsed, "<-- response"),
    }

    if let Ok(val) = HeaderValue::from_str(&trace_id) {
        parts.headers.insert(TRACE_ID_HEADER, val);
    }
    Response::from_parts(parts, Body::from(bytes))
}
