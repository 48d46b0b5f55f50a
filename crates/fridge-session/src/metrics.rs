//! Renewal metrics
//!
//! Emitted through the `metrics` facade; they are no-ops until the host
//! application installs a recorder.
//!
//! - `session_renewals_total` (counter): label `outcome`
//! - `session_renewal_waiters_total` (counter): requests that joined an in-flight renewal
//! - `session_replays_total` (counter): requests resent after a renewal

/// Record a settled renewal with its outcome label.
pub fn record_renewal(outcome: &'static str) {
    metrics::counter!("session_renewals_total", "outcome" => outcome).increment(1);
}

/// Record a request that joined a renewal someone else started.
pub fn record_waiter() {
    metrics::counter!("session_renewal_waiters_total").increment(1);
}

/// Record a request replayed with a renewed token.
pub fn record_replay() {
    metrics::counter!("session_replays_total").increment(1);
}
