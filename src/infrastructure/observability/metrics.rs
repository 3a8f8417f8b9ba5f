//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::MetricsConfig;
use crate::domain::quota::{LimitDecision, Tier};

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Initialize Prometheus metrics
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("guidance_gateway_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
            tracing::info!("Prometheus metrics initialized at /metrics");

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

/// Create the metrics router
pub fn create_metrics_router(metrics: PrometheusMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record an HTTP request metric
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    if status >= 500 {
        counter!("http_server_errors_total", &labels).increment(1);
    }
}

/// Record the outcome of a quota evaluation
pub fn record_quota_decision(decision: &LimitDecision) {
    counter!(
        "quota_decisions_total",
        "tier" => decision.tier.as_str(),
        "allowed" => if decision.allowed { "true" } else { "false" }
    )
    .increment(1);
}

/// Record a ledger failure that was absorbed by failing open
pub fn record_fail_open(tier: Tier, stage: &'static str) {
    counter!("quota_fail_open_total", "tier" => tier.as_str(), "stage" => stage).increment(1);
}

/// Record a finished chat turn (`completed`, `limit_reached`, `generation_failed`, ...)
pub fn record_chat_turn(outcome: &'static str, tier: Tier) {
    counter!("chat_turns_total", "outcome" => outcome, "tier" => tier.as_str()).increment(1);
}

/// Record a failed post-turn side effect (`crm`, `tts`)
pub fn record_side_effect_failure(kind: &'static str) {
    counter!("side_effect_failures_total", "kind" => kind).increment(1);
}

/// Replace id-like path segments so label cardinality stays bounded
fn sanitize_path(path: &str) -> String {
    let path = path
        .split('/')
        .map(|segment| {
            if uuid::Uuid::parse_str(segment).is_ok()
                || (!segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()))
            {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/");

    if path.len() > 50 {
        path.chars().take(50).collect()
    } else {
        path
    }
}
