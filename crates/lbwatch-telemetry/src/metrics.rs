//! Prometheus metrics for the position monitor.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent
//! failure. These panics only occur during static initialization, never at
//! runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_int_counter, register_int_gauge, CounterVec, IntCounter,
    IntGauge,
};

/// Completed polls by outcome (success, transport, private_positions,
/// user_not_found, malformed_payload).
pub static POLLS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "lbwatch_polls_total",
        "Completed position polls by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Open positions as of the last successful poll.
pub static OPEN_POSITIONS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "lbwatch_open_positions",
        "Open positions as of the last successful poll"
    )
    .unwrap()
});

/// Position transitions observed.
pub static TRANSITIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "lbwatch_transitions_total",
        "Position transitions by kind (opened/closed)",
        &["kind"]
    )
    .unwrap()
});

/// Live mark-price ticks applied to the snapshot.
pub static LIVE_TICKS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "lbwatch_live_ticks_total",
        "Live mark-price ticks applied to the snapshot"
    )
    .unwrap()
});

/// Monitoring sessions started.
pub static SESSIONS_STARTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "lbwatch_sessions_started_total",
        "Monitoring sessions started"
    )
    .unwrap()
});

/// Metrics facade used by the application.
pub struct Metrics;

impl Metrics {
    pub fn poll_completed(outcome: &str) {
        POLLS_TOTAL.with_label_values(&[outcome]).inc();
    }

    pub fn open_positions(count: usize) {
        OPEN_POSITIONS.set(count as i64);
    }

    pub fn position_opened() {
        TRANSITIONS_TOTAL.with_label_values(&["opened"]).inc();
    }

    pub fn position_closed() {
        TRANSITIONS_TOTAL.with_label_values(&["closed"]).inc();
    }

    pub fn live_tick() {
        LIVE_TICKS_TOTAL.inc();
    }

    pub fn session_started() {
        SESSIONS_STARTED_TOTAL.inc();
    }
}
