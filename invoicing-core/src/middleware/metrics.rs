use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use metrics::{counter, histogram};
use std::time::Instant;

/// Count and time HTTP requests through the `metrics` facade.
///
/// Requests are labelled by route template, not raw path, so IDs in the
/// path never create new series.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let method = req.method().as_str().to_owned();
    let start = Instant::now();

    let response = next.run(req).await;

    let labels = [
        ("method", method),
        ("route", route),
        ("status", response.status().as_u16().to_string()),
    ];
    counter!("invoicing_http_requests_total", &labels).increment(1);
    histogram!("invoicing_http_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());

    response
}
