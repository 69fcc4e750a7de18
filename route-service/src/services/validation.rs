//! Content validation and conflict helpers.

use url::Url;

use super::error::GatewayError;
use crate::models::Route;

pub const CLONE_SUFFIX: &str = "-copy";

/// Trimmed, non-empty route path.
pub fn normalize_path(path: &str) -> Result<String, GatewayError> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(GatewayError::validation("Route path must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// Completeness checks a route must pass before it can enter review.
pub fn validate_for_submission(route: &Route) -> Result<(), GatewayError> {
    let mut problems = Vec::new();

    if route.methods.is_empty() {
        problems.push("at least one HTTP method is required".to_string());
    }
    if route.path.trim().is_empty() {
        problems.push("path must not be empty".to_string());
    }
    if let Err(reason) = check_upstream_url(&route.upstream_url) {
        problems.push(reason);
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(GatewayError::validation(format!(
            "Route is not ready for submission: {}",
            problems.join("; ")
        )))
    }
}

fn check_upstream_url(raw: &str) -> Result<(), String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("upstream URL must not be empty".to_string());
    }
    let url = Url::parse(raw).map_err(|e| format!("upstream URL is malformed ({})", e))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err("upstream URL must use http or https".to_string());
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err("upstream URL must include a host".to_string());
    }
    Ok(())
}

/// Path for a clone of `source_path`.
///
/// `existing` holds every stored path starting with `source_path + "-copy"`.
/// The first clone takes the bare `-copy` suffix; later ones append
/// `-N` with N one above the highest numeric suffix already taken. Paths that
/// merely share the prefix (`-copyright`, `-copy-v2`) are not siblings.
pub fn next_clone_path(source_path: &str, existing: &[String]) -> String {
    let base = format!("{}{}", source_path, CLONE_SUFFIX);
    if !existing.iter().any(|p| p == &base) {
        return base;
    }

    let sibling_prefix = format!("{}-", base);
    let highest = existing
        .iter()
        .filter_map(|p| p.strip_prefix(&sibling_prefix))
        .filter(|suffix| !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|suffix| suffix.parse::<u64>().ok())
        .max()
        .unwrap_or(1)
        .max(1);

    format!("{}-{}", base, highest + 1)
}

pub fn validate_policy(
    name: &str,
    requests_per_second: i32,
    burst_size: i32,
) -> Result<String, GatewayError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GatewayError::validation(
            "Rate limit policy name must not be empty",
        ));
    }
    if requests_per_second <= 0 {
        return Err(GatewayError::validation(
            "requestsPerSecond must be greater than 0",
        ));
    }
    if burst_size < requests_per_second {
        return Err(GatewayError::validation(
            "burstSize must be greater than or equal to requestsPerSecond",
        ));
    }
    Ok(name.to_string())
}
