//! Prometheus metrics for the remote signing path.

use metrics::{Counter, Histogram};
use metrics_derive::Metrics;

/// Metrics for KMS-backed signing.
#[derive(Metrics, Clone)]
#[metrics(scope = "zkbnb_signer")]
pub struct SignerMetrics {
    /// Total remote sign operations that produced a signature.
    pub kms_sign_success_total: Counter,
    /// Total remote sign operations that failed for any reason.
    pub kms_sign_failure_total: Counter,
    /// Total remote sign operations that hit the caller deadline.
    pub kms_sign_timeout_total: Counter,
    /// Signatures where neither recovery id matched the expected address.
    pub kms_recovery_mismatch_total: Counter,
    /// KMS signatures returned in high-s form and folded to low-s.
    pub kms_high_s_normalized_total: Counter,
    /// Remote signing latency in seconds (request to recovered signature).
    pub kms_sign_latency_seconds: Histogram,
}
