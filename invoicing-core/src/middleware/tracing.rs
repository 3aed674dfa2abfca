use axum::http::{HeaderMap, HeaderValue};
use axum::{extract::Request, middleware::Next, response::Response};
use tracing::Instrument;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

/// Caller-supplied request ID, if it is short printable ASCII.
fn inbound_request_id(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(REQUEST_ID_HEADER)?.to_str().ok()?;
    let valid = !value.is_empty()
        && value.len() <= MAX_REQUEST_ID_LEN
        && value.bytes().all(|b| b.is_ascii_graphic());
    valid.then(|| value.to_owned())
}

/// Tag each request with an `x-request-id` and run it inside a span carrying it.
///
/// Malformed inbound IDs are replaced rather than propagated into logs.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let request_id =
        inbound_request_id(req.headers()).unwrap_or_else(|| Uuid::new_v4().to_string());
    let header_value = HeaderValue::from_str(&request_id).ok();

    if let Some(ref value) = header_value {
        req.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
    }

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path()
    );
    let mut response = next.run(req).instrument(span).await;

    if let Some(value) = header_value {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_inbound_request_id_is_kept_when_valid() {
        assert_eq!(
            inbound_request_id(&headers("req-42")).as_deref(),
            Some("req-42")
        );
    }

    #[test]
    fn test_malformed_request_id_is_dropped() {
        assert!(inbound_request_id(&HeaderMap::new()).is_none());
        assert!(inbound_request_id(&headers("has space")).is_none());
        assert!(inbound_request_id(&headers(&"x".repeat(MAX_REQUEST_ID_LEN + 1))).is_none());
    }
}
