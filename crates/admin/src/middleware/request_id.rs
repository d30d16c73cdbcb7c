//! Request ID middleware.
//!
//! Reuses a well-formed `x-request-id` from an upstream proxy, otherwise
//! generates a UUID v4. The ID is recorded on the request span, tagged on the
//! Sentry scope and echoed in the response.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

/// Incoming IDs are only trusted if short and made of token characters.
fn is_acceptable(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_REQUEST_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|id| is_acceptable(id))
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    Span::current().record("request_id", request_id.as_str());
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_uuid_and_proxy_ids() {
        assert!(is_acceptable("5f0c7f3e-6a1b-4b7e-9f7a-0d7c2b9e4a11"));
        assert!(is_acceptable("cf-ray_8a1b2c3d.syd"));
    }

    #[test]
    fn test_rejects_empty_long_and_odd_ids() {
        assert!(!is_acceptable(""));
        assert!(!is_acceptable(&"a".repeat(MAX_REQUEST_ID_LEN + 1)));
        assert!(!is_acceptable("abc def"));
        assert!(!is_acceptable("<script>"));
    }
}
