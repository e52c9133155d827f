use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

pub async fn metrics_middleware(
    matched_path: Option<MatchedPath>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    // Matched route template keeps label cardinality bounded (`/confessions/:id`).
    let path = matched_path
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;

    let labels = [
        ("method", method),
        ("path", path),
        ("status", response.status().as_u16().to_string()),
    ];

    counter!("spill_http_requests_total", &labels).increment(1);
    histogram!("spill_http_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());

    response
}

/// Record the outcome of a vote toggle: `up`, `down` or `none`.
pub fn record_vote(state: &'static str) {
    counter!("spill_votes_total", "state" => state).increment(1);
}

pub fn record_confession_created() {
    counter!("spill_confessions_created_total").increment(1);
}

pub fn record_report_filed() {
    counter!("spill_reports_filed_total").increment(1);
}

pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    Ok(handle)
}
