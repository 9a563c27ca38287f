//! Per-request metrics.

use axum::{extract::MatchedPath, http::Request, middleware::Next, response::IntoResponse};
use std::time::Instant;

/// Count requests and record their latency, labeled by method, matched
/// route and status.
pub async fn track<B>(req: Request<B>, next: Next<B>) -> impl IntoResponse {
    let start = Instant::now();
    let path = if let Some(matched_path) = req.extensions().get::<MatchedPath>() {
        matched_path.as_str().to_owned()
    } else {
        req.uri().path().to_owned()
    };
    let method = req.method().clone();

    let response = next.run(req).await;
    let latency = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    let labels = [
        ("method", method.to_string()),
        ("request_path", path),
        ("status", status),
    ];

    metrics::increment_counter!("lapmart_http_requests_total", &labels);
    metrics::histogram!("lapmart_http_requests_duration_seconds", latency, &labels);

    response
}
