use axum::http::HeaderValue;
use axum::{extract::Request, middleware::Next, response::Response};
use uuid::Uuid;

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Upper bound on caller-supplied correlation ids; longer values are replaced.
const MAX_CORRELATION_ID_LEN: usize = 128;

/// Correlation id supplied by the caller, or a fresh one.
pub fn resolve_correlation_id(req: &Request) -> String {
    req.headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.len() <= MAX_CORRELATION_ID_LEN)
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Makes sure every request carries a correlation id header and echoes it back
/// on the response.
pub async fn correlation_id_middleware(mut req: Request, next: Next) -> Response {
    let correlation_id = resolve_correlation_id(&req);

    if let Ok(header_value) = HeaderValue::from_str(&correlation_id) {
        req.headers_mut()
            .insert(CORRELATION_ID_HEADER, header_value);
    }

    let mut response = next.run(req).await;

    if let Ok(header_value) = HeaderValue::from_str(&correlation_id) {
        response
            .headers_mut()
            .insert(CORRELATION_ID_HEADER, header_value);
    }

    response
}
