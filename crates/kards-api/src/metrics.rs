//! Prometheus metrics: HTTP traffic plus study engine events.

use std::{sync::LazyLock, time::Instant};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use regex::Regex;

static UUID_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .expect("uuid pattern compiles")
});

static NUMERIC_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/\d+(/|$)").expect("numeric pattern compiles")
});

/// Install the Prometheus recorder
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        )?
        .install_recorder()?;

    Ok(handle)
}

/// Middleware recording request counts, latency and in-flight requests
pub async fn track_metrics(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());

    gauge!("http_requests_in_flight", "method" => method.clone(), "path" => path.clone())
        .increment(1.0);
    let response = next.run(req).await;
    gauge!("http_requests_in_flight", "method" => method.clone(), "path" => path.clone())
        .decrement(1.0);

    let status = response.status().as_u16().to_string();
    counter!(
        "http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status.clone()
    )
    .increment(1);
    histogram!(
        "http_request_duration_seconds",
        "method" => method,
        "path" => path,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());

    response
}

/// Replace ids in a path so every session or deck shares one series
pub fn normalize_path(path: &str) -> String {
    let normalized = UUID_SEGMENT.replace_all(path, ":id");
    NUMERIC_SEGMENT
        .replace_all(&normalized, "/:id$1")
        .into_owned()
}

/// Handler for `GET /metrics`
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

pub fn record_review(correct: bool) {
    counter!("study_reviews_total", "correct" => correct.to_string()).increment(1);
}

/// `event` is `created` or `ended`
pub fn record_session_event(event: &'static str) {
    counter!("study_sessions_total", "event" => event).increment(1);
}

/// `outcome` is `applied`, `duplicate` or `conflict`
pub fn record_speed_submission(outcome: &'static str) {
    counter!("study_speed_submissions_total", "outcome" => outcome).increment(1);
}
