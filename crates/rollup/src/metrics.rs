//! Prometheus metrics for rollup call dispatch.

use metrics::{Counter, Histogram};
use metrics_derive::Metrics;

use crate::request::Operation;

/// Per-operation dispatch metrics.
#[derive(Metrics, Clone)]
#[metrics(scope = "zkbnb_rollup")]
pub struct DispatchMetrics {
    /// Calls accepted by the node for broadcast.
    pub submissions_total: Counter,
    /// Calls that failed in options, signing, encoding or broadcast.
    pub failures_total: Counter,
    /// Pending nonce lookups made on behalf of callers that left the nonce unset.
    pub nonce_lookups_total: Counter,
    /// Time from dispatch to broadcast acceptance, in seconds.
    pub submit_duration_seconds: Histogram,
}

impl DispatchMetrics {
    pub(crate) fn for_operation(operation: Operation) -> Self {
        Self::new_with_labels(&[("operation", operation.as_str())])
    }
}
