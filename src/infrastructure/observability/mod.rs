//! Observability infrastructure - Prometheus metrics

mod metrics;

pub use metrics::{
    create_metrics_router, init_metrics, record_chat_turn, record_fail_open,
    record_http_request, record_quota_decision, record_side_effect_failure, PrometheusMetrics,
};
