//! Metrics instrumentation for zonegate.
//!
//! All metrics are prefixed with `zonegate.`

use metrics::{counter, histogram};
use std::time::Instant;

/// Authentication outcome label for metrics.
#[derive(Debug, Clone, Copy)]
pub enum AuthOutcome {
    /// Signature validated.
    Authenticated,
    /// No credentials on the request.
    CredentialsMissing,
    /// Credentials present but rejected.
    CredentialsRejected,
}

/// Record one authentication attempt.
pub fn record_authentication(outcome: AuthOutcome, duration: std::time::Duration) {
    let outcome_str = match outcome {
        AuthOutcome::Authenticated => "authenticated",
        AuthOutcome::CredentialsMissing => "credentials_missing",
        AuthOutcome::CredentialsRejected => "credentials_rejected",
    };

    counter!("zonegate.auth.count", "outcome" => outcome_str).increment(1);
    histogram!("zonegate.auth.duration.seconds").record(duration.as_secs_f64());
}

/// Record a zone build attempt and how many field errors it produced.
pub fn record_zone_validation(error_count: usize) {
    let result_str = if error_count == 0 { "valid" } else { "invalid" };
    counter!("zonegate.zone.validation.count", "result" => result_str).increment(1);
    if error_count > 0 {
        histogram!("zonegate.zone.validation.errors").record(error_count as f64);
    }
}

/// Record a PTR membership decision.
pub fn record_ptr_check(in_zone: bool) {
    let result_str = if in_zone { "in_zone" } else { "rejected" };
    counter!("zonegate.reverse.ptr_check.count", "result" => result_str).increment(1);
}

/// Helper for timing operations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration since timer start.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}
