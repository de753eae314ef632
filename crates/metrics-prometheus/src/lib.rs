//! Prometheus metrics backend for fogmesh.
//!
//! Implements [`fogmesh_metrics::MetricsRecorder`] using native Prometheus
//! counters and histograms.
//!
//! # Usage
//!
//! Call [`install()`] once at startup before any metrics are recorded, and
//! [`encode_metrics()`] to export them:
//! ```ignore
//! fogmesh_metrics_prometheus::install()?;
//! // ... run the simulation ...
//! let (_content_type, body) = fogmesh_metrics_prometheus::encode_metrics()?;
//! ```

use fogmesh_metrics::MetricsRecorder;
use prometheus::core::Collector;
use prometheus::{
    Counter, CounterVec, Encoder, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};

/// Domain-specific Prometheus metrics.
pub struct Metrics {
    // === Network ===
    pub messages_transmitted: CounterVec,
    pub bytes_transmitted: CounterVec,
    pub network_usage: Counter,
    pub messages_dropped: CounterVec,
    pub cloud_traffic: Counter,

    // === Placement ===
    pub placement_cycles: Counter,
    pub requests_placed: Counter,
    pub requests_pending: Histogram,
    pub shift_failures: Counter,
    pub instances_launched: CounterVec,
    pub discovery_updates: Counter,

    // === Execution ===
    pub execution_cpu: HistogramVec,
    pub loop_latency: HistogramVec,
}

fn register<C: Collector + Clone + 'static>(registry: &Registry, collector: C) -> prometheus::Result<C> {
    registry.register(Box::new(collector.clone()))?;
    Ok(collector)
}

impl Metrics {
    /// Create every metric and register it with `registry`.
    pub fn register(registry: &Registry) -> prometheus::Result<Self> {
        let latency_buckets = vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
        ];
        let queue_buckets = vec![0.0, 1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0];

        Ok(Self {
            // Network
            messages_transmitted: register(
                registry,
                CounterVec::new(
                    Opts::new(
                        "fogmesh_messages_transmitted_total",
                        "Messages put on a link, by link class",
                    ),
                    &["link"],
                )?,
            )?,
            bytes_transmitted: register(
                registry,
                CounterVec::new(
                    Opts::new(
                        "fogmesh_transmitted_bytes_total",
                        "Bytes put on a link, by link class",
                    ),
                    &["link"],
                )?,
            )?,
            network_usage: register(
                registry,
                Counter::new(
                    "fogmesh_network_usage_total",
                    "Sum of latency (s) times size (bytes) over all transmissions",
                )?,
            )?,
            messages_dropped: register(
                registry,
                CounterVec::new(
                    Opts::new("fogmesh_messages_dropped_total", "Dropped messages, by reason"),
                    &["reason"],
                )?,
            )?,
            cloud_traffic: register(
                registry,
                Counter::new(
                    "fogmesh_cloud_traffic_total",
                    "Messages arriving at a cloud device",
                )?,
            )?,

            // Placement
            placement_cycles: register(
                registry,
                Counter::new(
                    "fogmesh_placement_cycles_total",
                    "Placement cycles that ran over a non-empty queue",
                )?,
            )?,
            requests_placed: register(
                registry,
                Counter::new(
                    "fogmesh_placement_requests_placed_total",
                    "Placement requests fully placed",
                )?,
            )?,
            requests_pending: register(
                registry,
                Histogram::with_opts(
                    HistogramOpts::new(
                        "fogmesh_placement_requests_pending",
                        "Requests left queued after a placement cycle",
                    )
                    .buckets(queue_buckets),
                )?,
            )?,
            shift_failures: register(
                registry,
                Counter::new(
                    "fogmesh_shift_failures_total",
                    "Shift-upstream attempts that reached the domain root",
                )?,
            )?,
            instances_launched: register(
                registry,
                CounterVec::new(
                    Opts::new(
                        "fogmesh_instances_launched_total",
                        "Microservice instances launched, by microservice",
                    ),
                    &["microservice"],
                )?,
            )?,
            discovery_updates: register(
                registry,
                Counter::new(
                    "fogmesh_discovery_updates_total",
                    "Service discovery entries appended",
                )?,
            )?,

            // Execution
            execution_cpu: register(
                registry,
                HistogramVec::new(
                    HistogramOpts::new(
                        "fogmesh_execution_cpu_seconds",
                        "CPU time spent executing a message, by tuple type",
                    )
                    .buckets(latency_buckets.clone()),
                    &["tuple_type"],
                )?,
            )?,
            loop_latency: register(
                registry,
                HistogramVec::new(
                    HistogramOpts::new(
                        "fogmesh_loop_latency_seconds",
                        "End-to-end application loop latency",
                    )
                    .buckets(latency_buckets),
                    &["loop"],
                )?,
            )?,
        })
    }
}

/// Prometheus-backed [`MetricsRecorder`].
pub struct PrometheusRecorder {
    metrics: Metrics,
}

impl PrometheusRecorder {
    /// Register the metrics with `registry`.
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        Ok(Self {
            metrics: Metrics::register(registry)?,
        })
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

impl MetricsRecorder for PrometheusRecorder {
    // ── Network ──────────────────────────────────────────────────────

    fn record_message_transmitted(&self, link: &str, bytes: u64) {
        self.metrics
            .messages_transmitted
            .with_label_values(&[link])
            .inc();
        self.metrics
            .bytes_transmitted
            .with_label_values(&[link])
            .inc_by(bytes as f64);
    }

    fn record_network_usage(&self, latency_secs: f64, bytes: u64) {
        self.metrics.network_usage.inc_by(latency_secs * bytes as f64);
    }

    fn record_message_dropped(&self, reason: &str) {
        self.metrics
            .messages_dropped
            .with_label_values(&[reason])
            .inc();
    }

    fn record_cloud_traffic(&self) {
        self.metrics.cloud_traffic.inc();
    }

    // ── Placement ────────────────────────────────────────────────────

    fn record_placement_cycle(&self, placed_requests: usize, pending_requests: usize) {
        self.metrics.placement_cycles.inc();
        self.metrics.requests_placed.inc_by(placed_requests as f64);
        self.metrics
            .requests_pending
            .observe(pending_requests as f64);
    }

    fn record_shift_failure(&self) {
        self.metrics.shift_failures.inc();
    }

    fn record_instance_launched(&self, microservice: &str) {
        self.metrics
            .instances_launched
            .with_label_values(&[microservice])
            .inc();
    }

    fn record_discovery_update(&self) {
        self.metrics.discovery_updates.inc();
    }

    // ── Execution ────────────────────────────────────────────────────

    fn record_execution(&self, tuple_type: &str, cpu_secs: f64) {
        self.metrics
            .execution_cpu
            .with_label_values(&[tuple_type])
            .observe(cpu_secs);
    }

    fn record_loop_latency(&self, loop_id: u32, latency_secs: f64) {
        self.metrics
            .loop_latency
            .with_label_values(&[loop_id.to_string().as_str()])
            .observe(latency_secs);
    }
}

/// Register the metrics with the default Prometheus registry and install the
/// recorder as the global metrics backend.
///
/// Fails with `AlreadyReg` when called a second time.
pub fn install() -> prometheus::Result<()> {
    let recorder = PrometheusRecorder::new(prometheus::default_registry())?;
    fogmesh_metrics::set_global_recorder(Box::new(recorder));
    Ok(())
}

/// Gather and encode all metrics of the default registry as text format.
///
/// Returns `(content_type, encoded_body)`.
pub fn encode_metrics() -> prometheus::Result<(String, Vec<u8>)> {
    encode(prometheus::default_registry())
}

fn encode(registry: &Registry) -> prometheus::Result<(String, Vec<u8>)> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    Ok((encoder.format_type().to_string(), buffer))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Registry, PrometheusRecorder) {
        let registry = Registry::new();
        let recorder = PrometheusRecorder::new(&registry).unwrap();
        (registry, recorder)
    }

    #[test]
    fn test_network_metrics_are_labelled_by_link() {
        let (_registry, recorder) = recorder();
        recorder.record_message_transmitted("uplink", 1000);
        recorder.record_message_transmitted("uplink", 500);
        recorder.record_message_transmitted("cluster", 10);
        recorder.record_network_usage(0.1, 1000);

        let m = recorder.metrics();
        assert_eq!(m.messages_transmitted.with_label_values(&["uplink"]).get(), 2.0);
        assert_eq!(m.bytes_transmitted.with_label_values(&["uplink"]).get(), 1500.0);
        assert_eq!(m.messages_transmitted.with_label_values(&["cluster"]).get(), 1.0);
        assert!((m.network_usage.get() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_placement_and_execution_metrics() {
        let (_registry, recorder) = recorder();
        recorder.record_placement_cycle(2, 1);
        recorder.record_shift_failure();
        recorder.record_instance_launched("ingest");
        recorder.record_execution("RAW", 4.0);
        recorder.record_loop_latency(0, 5.5);
        recorder.record_message_dropped("stale_pin");

        let m = recorder.metrics();
        assert_eq!(m.placement_cycles.get(), 1.0);
        assert_eq!(m.requests_placed.get(), 2.0);
        assert_eq!(m.requests_pending.get_sample_count(), 1);
        assert_eq!(m.shift_failures.get(), 1.0);
        assert_eq!(m.instances_launched.with_label_values(&["ingest"]).get(), 1.0);
        assert_eq!(m.execution_cpu.with_label_values(&["RAW"]).get_sample_sum(), 4.0);
        assert_eq!(m.loop_latency.with_label_values(&["0"]).get_sample_count(), 1);
        assert_eq!(m.messages_dropped.with_label_values(&["stale_pin"]).get(), 1.0);
    }

    #[test]
    fn test_encode_text_format() {
        let (registry, recorder) = recorder();
        recorder.record_cloud_traffic();
        let (content_type, body) = encode(&registry).unwrap();
        let body = String::from_utf8(body).unwrap();
        assert!(content_type.starts_with("text/plain"));
        assert!(body.contains("fogmesh_cloud_traffic_total 1"));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = Registry::new();
        PrometheusRecorder::new(&registry).unwrap();
        assert!(PrometheusRecorder::new(&registry).is_err());
    }
}
