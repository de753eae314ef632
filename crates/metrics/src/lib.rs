//! Metrics facade for fogmesh.
//!
//! Provides a [`MetricsRecorder`] trait with domain-specific methods and default
//! no-op implementations. A global singleton recorder is accessed via [`recorder()`],
//! and convenience free functions delegate to it.
//!
//! # Usage
//!
//! Callers record metrics via free functions:
//! ```ignore
//! fogmesh_metrics::record_network_usage(latency_secs, bytes);
//! fogmesh_metrics::record_placement_cycle(placed, pending);
//! ```
//!
//! At startup, install a backend (optional, defaults to no-op):
//! ```ignore
//! fogmesh_metrics_prometheus::install()?;
//! ```

use std::sync::OnceLock;

// ═══════════════════════════════════════════════════════════════════════
// Trait
// ═══════════════════════════════════════════════════════════════════════

/// Domain-specific metrics recording trait.
///
/// All methods have default no-op implementations so backends only need
/// to override the metrics they care about.
#[allow(unused_variables)]
pub trait MetricsRecorder: Send + Sync + 'static {
    // ── Network ──────────────────────────────────────────────────────

    /// Record a message put on a link (`uplink`, `downlink` or `cluster`).
    fn record_message_transmitted(&self, link: &str, bytes: u64) {}

    /// Record network usage of one transmission (latency × size).
    fn record_network_usage(&self, latency_secs: f64, bytes: u64) {}

    /// Record a dropped message.
    fn record_message_dropped(&self, reason: &str) {}

    /// Record a message arriving at a cloud device.
    fn record_cloud_traffic(&self) {}

    // ── Placement ────────────────────────────────────────────────────

    /// Record one orchestrator placement cycle.
    fn record_placement_cycle(&self, placed_requests: usize, pending_requests: usize) {}

    /// Record a failed shift-upstream attempt.
    fn record_shift_failure(&self) {}

    /// Record a microservice instance launched on a device.
    fn record_instance_launched(&self, microservice: &str) {}

    /// Record a service discovery entry appended on a device.
    fn record_discovery_update(&self) {}

    // ── Execution ────────────────────────────────────────────────────

    /// Record the CPU time a message of `tuple_type` spent executing.
    fn record_execution(&self, tuple_type: &str, cpu_secs: f64) {}

    /// Record an end-to-end application loop latency.
    fn record_loop_latency(&self, loop_id: u32, latency_secs: f64) {}
}

// ═══════════════════════════════════════════════════════════════════════
// Global singleton
// ═══════════════════════════════════════════════════════════════════════

struct NoopRecorder;
impl MetricsRecorder for NoopRecorder {}

static RECORDER: OnceLock<Box<dyn MetricsRecorder>> = OnceLock::new();

/// Install a global metrics recorder.
///
/// Can only be called once. Subsequent calls are silently ignored.
pub fn set_global_recorder(recorder: Box<dyn MetricsRecorder>) {
    let _ = RECORDER.set(recorder);
}

/// Get the global metrics recorder.
///
/// Returns a no-op recorder if none has been installed.
#[inline]
fn recorder() -> &'static dyn MetricsRecorder {
    RECORDER.get().map(|r| r.as_ref()).unwrap_or(&NoopRecorder)
}

// ═══════════════════════════════════════════════════════════════════════
// Convenience free functions
// ═══════════════════════════════════════════════════════════════════════

// ── Network ──────────────────────────────────────────────────────────

/// Record a message put on a link.
#[inline]
pub fn record_message_transmitted(link: &str, bytes: u64) {
    recorder().record_message_transmitted(link, bytes);
}

/// Record network usage of one transmission.
#[inline]
pub fn record_network_usage(latency_secs: f64, bytes: u64) {
    recorder().record_network_usage(latency_secs, bytes);
}

/// Record a dropped message.
#[inline]
pub fn record_message_dropped(reason: &str) {
    recorder().record_message_dropped(reason);
}

/// Record a message arriving at a cloud device.
#[inline]
pub fn record_cloud_traffic() {
    recorder().record_cloud_traffic();
}

// ── Placement ────────────────────────────────────────────────────────

/// Record one orchestrator placement cycle.
#[inline]
pub fn record_placement_cycle(placed_requests: usize, pending_requests: usize) {
    recorder().record_placement_cycle(placed_requests, pending_requests);
}

/// Record a failed shift-upstream attempt.
#[inline]
pub fn record_shift_failure() {
    recorder().record_shift_failure();
}

/// Record a microservice instance launched.
#[inline]
pub fn record_instance_launched(microservice: &str) {
    recorder().record_instance_launched(microservice);
}

/// Record a service discovery entry appended.
#[inline]
pub fn record_discovery_update() {
    recorder().record_discovery_update();
}

// ── Execution ────────────────────────────────────────────────────────

/// Record execution CPU time for a tuple type.
#[inline]
pub fn record_execution(tuple_type: &str, cpu_secs: f64) {
    recorder().record_execution(tuple_type, cpu_secs);
}

/// Record an application loop latency.
#[inline]
pub fn record_loop_latency(loop_id: u32, latency_secs: f64) {
    recorder().record_loop_latency(loop_id, latency_secs);
}
