//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Active gateway connection gauge
//! - Routed message counts by target kind
//! - Live call session gauge
//! - Relayed signaling envelope counts
//! - Client event counts by event name

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Active gateway connections gauge
pub static GATEWAY_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new(
            "gateway_connections_active",
            "Number of active gateway connections",
        )
        .namespace("parley"),
    )
    .expect("Failed to create GATEWAY_CONNECTIONS_ACTIVE metric")
});

/// Routed message counter by target kind ("direct" or "group")
pub static MESSAGES_ROUTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("messages_routed_total", "Total number of routed messages")
            .namespace("parley"),
        &["target"],
    )
    .expect("Failed to create MESSAGES_ROUTED_TOTAL metric")
});

/// Live call sessions gauge
pub static CALL_SESSIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("call_sessions_active", "Number of live call sessions").namespace("parley"),
    )
    .expect("Failed to create CALL_SESSIONS_ACTIVE metric")
});

/// Relayed signaling envelope counter
pub static SIGNALS_RELAYED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new(
            "signals_relayed_total",
            "Total number of relayed signaling envelopes",
        )
        .namespace("parley"),
    )
    .expect("Failed to create SIGNALS_RELAYED_TOTAL metric")
});

/// Client event counter by event name
pub static CLIENT_EVENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("client_events_total", "Total number of received client events")
            .namespace("parley"),
        &["event"],
    )
    .expect("Failed to create CLIENT_EVENTS_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(GATEWAY_CONNECTIONS_ACTIVE.clone()))
        .expect("Failed to register GATEWAY_CONNECTIONS_ACTIVE");
    registry
        .register(Box::new(MESSAGES_ROUTED_TOTAL.clone()))
        .expect("Failed to register MESSAGES_ROUTED_TOTAL");
    registry
        .register(Box::new(CALL_SESSIONS_ACTIVE.clone()))
        .expect("Failed to register CALL_SESSIONS_ACTIVE");
    registry
        .register(Box::new(SIGNALS_RELAYED_TOTAL.clone()))
        .expect("Failed to register SIGNALS_RELAYED_TOTAL");
    registry
        .register(Box::new(CLIENT_EVENTS_TOTAL.clone()))
        .expect("Failed to register CLIENT_EVENTS_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("Failed to encode metrics");
    String::from_utf8(buffer).expect("Metrics should be valid UTF-8")
}

/// Helper to update the gateway connection count
pub fn set_gateway_connections(count: usize) {
    GATEWAY_CONNECTIONS_ACTIVE.set(count as i64);
}

/// Helper to record a routed message
pub fn inc_messages_routed(target: &'static str) {
    MESSAGES_ROUTED_TOTAL.with_label_values(&[target]).inc();
}

/// Helper to update the live call session count
pub fn set_call_sessions(count: usize) {
    CALL_SESSIONS_ACTIVE.set(count as i64);
}

/// Helper to record a relayed signaling envelope
pub fn inc_signals_relayed() {
    SIGNALS_RELAYED_TOTAL.inc();
}

/// Helper to record a received client event
pub fn inc_client_event(event: &str) {
    CLIENT_EVENTS_TOTAL.with_label_values(&[event]).inc();
}
