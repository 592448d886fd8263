//! Metrics and observability utilities
//!
//! Prometheus metrics with SLO-aligned histograms and the `agora_` prefix.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

use crate::policy::PaperStatus;

/// Metrics prefix for all Agora metrics
pub const METRICS_PREFIX: &str = "agora";

/// SLO-aligned histogram buckets for request latency (in seconds)
/// Targets: P50 < 50ms, P99 < 250ms
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms - P50 target
    0.100,  // 100ms
    0.250,  // 250ms - P99 target
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
];

/// Outcome label of an authorization decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied,
}

impl Decision {
    pub fn from_allowed(allowed: bool) -> Self {
        if allowed { Decision::Allowed } else { Decision::Denied }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allowed => "allowed",
            Decision::Denied => "denied",
        }
    }
}

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_authorization_decisions_total", METRICS_PREFIX),
        Unit::Count,
        "Authorization decisions by operation and outcome"
    );

    describe_counter!(
        format!("{}_shared_link_accesses_total", METRICS_PREFIX),
        Unit::Count,
        "Shared link access attempts by outcome"
    );

    describe_counter!(
        format!("{}_status_transitions_total", METRICS_PREFIX),
        Unit::Count,
        "Applied paper status transitions"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Count one authorization decision, e.g. `("transition", Denied)`
pub fn record_authorization(operation: &'static str, decision: Decision) {
    counter!(
        format!("{}_authorization_decisions_total", METRICS_PREFIX),
        "operation" => operation,
        "outcome" => decision.as_str()
    )
    .increment(1);
}

/// Count a shared link access; outcome is "granted", "inactive", "expired" or "unknown"
pub fn record_shared_link_access(outcome: &'static str) {
    counter!(
        format!("{}_shared_link_accesses_total", METRICS_PREFIX),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_transition(from: PaperStatus, to: PaperStatus) {
    counter!(
        format!("{}_status_transitions_total", METRICS_PREFIX),
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }

        assert!(LATENCY_BUCKETS.contains(&0.050));
        assert!(LATENCY_BUCKETS.contains(&0.250));
    }

    #[test]
    fn test_decision_labels() {
        assert_eq!(Decision::from_allowed(true).as_str(), "allowed");
        assert_eq!(Decision::from_allowed(false).as_str(), "denied");
    }

    #[test]
    fn test_recorders_without_exporter() {
        // No recorder installed: every call is a no-op
        let metrics = RequestMetrics::start("GET", "/v1/papers");
        metrics.finish(200);
        record_authorization("view_paper", Decision::Denied);
        record_shared_link_access("expired");
        record_transition(PaperStatus::Draft, PaperStatus::Submitted);
    }
}
