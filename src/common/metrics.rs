//! Per-node metrics
//!
//! Replication counters and per-endpoint latency histograms, rendered in the
//! Prometheus text format at `GET /metrics`.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Histogram bucket boundaries for latency measurements (in milliseconds)
const LATENCY_BUCKETS: [f64; 9] = [1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 1000.0, 5000.0];

/// Monotonic counter
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Latency histogram with fixed buckets
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<AtomicU64>,
    sum_micros: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self {
            buckets: (0..=LATENCY_BUCKETS.len())
                .map(|_| AtomicU64::new(0))
                .collect(),
            sum_micros: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }
}

impl Histogram {
    pub fn observe(&self, duration: Duration) {
        let ms = duration.as_secs_f64() * 1000.0;
        let idx = LATENCY_BUCKETS
            .iter()
            .position(|&boundary| ms <= boundary)
            .unwrap_or(LATENCY_BUCKETS.len());
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
        self.sum_micros
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Cumulative (upper bound in ms, count) pairs, ending with +Inf
    pub fn cumulative(&self) -> Vec<(f64, u64)> {
        let mut running = 0;
        LATENCY_BUCKETS
            .iter()
            .copied()
            .chain(std::iter::once(f64::INFINITY))
            .zip(&self.buckets)
            .map(|(le, bucket)| {
                running += bucket.load(Ordering::Relaxed);
                (le, running)
            })
            .collect()
    }

    pub fn sum_ms(&self) -> f64 {
        self.sum_micros.load(Ordering::Relaxed) as f64 / 1000.0
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
pub struct EndpointMetrics {
    pub requests: Counter,
    pub errors: Counter,
    pub latency: Histogram,
}

/// Counters for one node
#[derive(Debug)]
pub struct NodeMetrics {
    pub puts_total: Counter,
    pub puts_quorum_reached: Counter,
    pub puts_stale: Counter,
    pub gets_total: Counter,
    pub replicate_accepted: Counter,
    pub replicate_rejected: Counter,
    pub batch_replicate_total: Counter,
    pub gossip_rounds: Counter,
    pub gossip_keys_flushed: Counter,
    pub gossip_peers_skipped: Counter,
    pub peer_failures: Counter,
    pub crashes_total: Counter,
    pub unavailable_rejections: Counter,
    endpoints: Mutex<BTreeMap<String, Arc<EndpointMetrics>>>,
    start_time: Instant,
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self {
            puts_total: Counter::default(),
            puts_quorum_reached: Counter::default(),
            puts_stale: Counter::default(),
            gets_total: Counter::default(),
            replicate_accepted: Counter::default(),
            replicate_rejected: Counter::default(),
            batch_replicate_total: Counter::default(),
            gossip_rounds: Counter::default(),
            gossip_keys_flushed: Counter::default(),
            gossip_peers_skipped: Counter::default(),
            peer_failures: Counter::default(),
            crashes_total: Counter::default(),
            unavailable_rejections: Counter::default(),
            endpoints: Mutex::new(BTreeMap::new()),
            start_time: Instant::now(),
        }
    }
}

impl NodeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn endpoint(&self, path: &str) -> Arc<EndpointMetrics> {
        self.endpoints
            .lock()
            .entry(path.to_string())
            .or_default()
            .clone()
    }

    pub fn record_request(&self, path: &str, duration: Duration, success: bool) {
        let endpoint = self.endpoint(path);
        endpoint.requests.inc();
        endpoint.latency.observe(duration);
        if !success {
            endpoint.errors.inc();
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Render every metric; `gauges` carries point-in-time values owned elsewhere
    pub fn to_prometheus(&self, node_id: &str, gauges: &[(&str, u64)]) -> String {
        let mut out = String::new();
        let counters: [(&str, &str, &Counter); 13] = [
            ("dynamo_puts_total", "Put requests coordinated", &self.puts_total),
            ("dynamo_puts_quorum_reached_total", "Puts that reached W replicas", &self.puts_quorum_reached),
            ("dynamo_puts_stale_total", "Puts rejected locally as stale", &self.puts_stale),
            ("dynamo_gets_total", "Get requests coordinated", &self.gets_total),
            ("dynamo_replicate_accepted_total", "Replicate calls holding the version", &self.replicate_accepted),
            ("dynamo_replicate_rejected_total", "Replicate calls rejected as stale", &self.replicate_rejected),
            ("dynamo_batch_replicate_total", "BatchReplicate calls served", &self.batch_replicate_total),
            ("dynamo_gossip_rounds_total", "Gossip cycles run", &self.gossip_rounds),
            ("dynamo_gossip_keys_flushed_total", "Pending keys delivered by gossip", &self.gossip_keys_flushed),
            ("dynamo_gossip_peers_skipped_total", "Unreachable peers skipped by gossip", &self.gossip_peers_skipped),
            ("dynamo_peer_failures_total", "Failed calls to peers", &self.peer_failures),
            ("dynamo_crashes_total", "Crash windows started", &self.crashes_total),
            ("dynamo_unavailable_rejections_total", "Requests refused while crashed", &self.unavailable_rejections),
        ];
        for (name, help, counter) in counters {
            let _ = writeln!(out, "# HELP {} {}", name, help);
            let _ = writeln!(out, "# TYPE {} counter", name);
            let _ = writeln!(out, "{}{{node=\"{}\"}} {}", name, node_id, counter.get());
        }

        for (name, value) in gauges {
            let _ = writeln!(out, "# TYPE {} gauge", name);
            let _ = writeln!(out, "{}{{node=\"{}\"}} {}", name, node_id, value);
        }

        let _ = writeln!(out, "# TYPE dynamo_uptime_seconds gauge");
        let _ = writeln!(
            out,
            "dynamo_uptime_seconds{{node=\"{}\"}} {}",
            node_id,
            self.uptime_seconds()
        );

        let endpoints = self.endpoints.lock();
        let _ = writeln!(out, "# TYPE dynamo_endpoint_requests_total counter");
        for (path, m) in endpoints.iter() {
            let _ = writeln!(
                out,
                "dynamo_endpoint_requests_total{{path=\"{}\"}} {}",
                path,
                m.requests.get()
            );
        }
        let _ = writeln!(out, "# TYPE dynamo_endpoint_errors_total counter");
        for (path, m) in endpoints.iter() {
            let _ = writeln!(
                out,
                "dynamo_endpoint_errors_total{{path=\"{}\"}} {}",
                path,
                m.errors.get()
            );
        }
        let _ = writeln!(out, "# TYPE dynamo_request_duration_ms histogram");
        for (path, m) in endpoints.iter() {
            for (le, count) in m.latency.cumulative() {
                let le = if le.is_infinite() {
                    "+Inf".to_string()
                } else {
                    le.to_string()
                };
                let _ = writeln!(
                    out,
                    "dynamo_request_duration_ms_bucket{{path=\"{}\",le=\"{}\"}} {}",
                    path, le, count
                );
            }
            let _ = writeln!(
                out,
                "dynamo_request_duration_ms_sum{{path=\"{}\"}} {}",
                path,
                m.latency.sum_ms()
            );
            let _ = writeln!(
                out,
                "dynamo_request_duration_ms_count{{path=\"{}\"}} {}",
                path,
                m.latency.count()
            );
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_cumulative() {
        let hist = Histogram::default();
        hist.observe(Duration::from_millis(3));
        hist.observe(Duration::from_millis(40));
        hist.observe(Duration::from_secs(10));

        assert_eq!(hist.count(), 3);
        let buckets = hist.cumulative();
        assert_eq!(buckets.len(), LATENCY_BUCKETS.len() + 1);
        assert_eq!(buckets[1], (5.0, 1));
        assert_eq!(buckets.last().unwrap().1, 3);
    }

    #[test]
    fn test_record_request() {
        let metrics = NodeMetrics::new();
        metrics.record_request("/put", Duration::from_millis(5), true);
        metrics.record_request("/put", Duration::from_millis(5), false);

        let endpoint = metrics.endpoint("/put");
        assert_eq!(endpoint.requests.get(), 2);
        assert_eq!(endpoint.errors.get(), 1);
    }

    #[test]
    fn test_prometheus_output() {
        let metrics = NodeMetrics::new();
        metrics.puts_total.add(2);
        metrics.record_request("/get/:key", Duration::from_millis(1), true);

        let out = metrics.to_prometheus("n1", &[("dynamo_pending_gossip_keys", 4)]);
        assert!(out.contains("dynamo_puts_total{node=\"n1\"} 2"));
        assert!(out.contains("dynamo_pending_gossip_keys{node=\"n1\"} 4"));
        assert!(out.contains("dynamo_endpoint_requests_total{path=\"/get/:key\"} 1"));
        assert!(out.contains("le=\"+Inf\""));
    }
}
