//! Completes problem-details error bodies with request-scoped data.
//!
//! Errors are rendered deep inside handlers and extractors where the request
//! path and correlation id are not at hand. This middleware runs on the way
//! out, fills `instance` and `correlationId`, and converts plain-text error
//! bodies (framework rejections) into the same shape.

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::BodyExt;

use super::tracing::CORRELATION_ID_HEADER;
use crate::error::{PROBLEM_JSON, ProblemDetails};

/// Error bodies larger than this are passed through untouched.
const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;

pub async fn problem_details_middleware(req: Request, next: Next) -> Response {
    let instance = req.uri().path().to_string();
    let correlation_id = req
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let response = next.run(req).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let is_problem = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with(PROBLEM_JSON))
        .unwrap_or(false);

    let (mut parts, body) = response.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read error body");
            return Response::from_parts(parts, Body::empty());
        }
    };

    if bytes.len() > MAX_ERROR_BODY_BYTES {
        return Response::from_parts(parts, Body::from(bytes));
    }

    let mut problem = if is_problem {
        match serde_json::from_slice::<ProblemDetails>(&bytes) {
            Ok(problem) => problem,
            Err(_) => return Response::from_parts(parts, Body::from(bytes)),
        }
    } else {
        let detail = String::from_utf8_lossy(&bytes).trim().to_string();
        let title = status.canonical_reason().unwrap_or("Error");
        let detail = if detail.is_empty() {
            title.to_string()
        } else {
            detail
        };
        ProblemDetails::new(status, &slug_for(status), title, detail)
    };

    if problem.instance.is_none() {
        problem.instance = Some(instance);
    }
    if problem.correlation_id.is_none() {
        problem.correlation_id = correlation_id;
    }

    let (_, body) = problem.into_response().into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts
        .headers
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(PROBLEM_JSON));
    Response::from_parts(parts, body)
}

fn slug_for(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("error")
        .to_lowercase()
        .replace(' ', "-")
}
