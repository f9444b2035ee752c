//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics for hot-path operations to avoid mutex contention.
//! All counter updates are lock-free; reporting is the only operation
//! that resets anything (via atomic swap).
//!
//! NOTE: All atomics use Relaxed ordering intentionally, these are
//! statistical counters only.

use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Request latency bucket boundaries (microseconds)
/// Buckets: ≤25, ≤50, ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, >12800
const BUCKET_BOUNDS: [u64; 10] = [25, 50, 100, 200, 400, 800, 1600, 3200, 6400, 12800];
const NUM_BUCKETS: usize = 11;

/// Rejection reasons, in the order their counters are stored
pub const REJECTION_REASONS: [&str; 7] = [
    "too_early",
    "invalid_date",
    "future_date",
    "unknown_store",
    "unknown_sensor",
    "closed",
    "bad_request",
];

/// Maximum number of stores with a dedicated query counter
pub const MAX_STORES: usize = 32;

/// Compute bucket index for a latency value using binary search
#[inline]
fn bucket_index(latency_us: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Swap all buckets to zero and return their values
#[inline]
fn swap_buckets(buckets: &[AtomicU64; NUM_BUCKETS]) -> [u64; NUM_BUCKETS] {
    let mut result = [0u64; NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.swap(0, Ordering::Relaxed);
    }
    result
}

/// Load all bucket values without resetting
#[inline]
fn load_buckets(buckets: &[AtomicU64; NUM_BUCKETS]) -> [u64; NUM_BUCKETS] {
    let mut result = [0u64; NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.load(Ordering::Relaxed);
    }
    result
}

/// Compute percentile from histogram buckets
/// Returns the upper bound of the bucket containing the percentile
fn percentile_from_buckets(buckets: &[u64; NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = (total as f64 * percentile) as u64;
    let mut cumulative = 0u64;

    // Last bucket uses 2x the previous bound
    const BUCKET_UPPER_BOUNDS: [u64; NUM_BUCKETS] =
        [25, 50, 100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[NUM_BUCKETS - 1]
}

/// Lock-free metrics collector for the traffic API
pub struct Metrics {
    /// Total requests ever received (monotonic)
    requests_total: AtomicU64,
    /// Requests since last report (reset on report)
    requests_since_report: AtomicU64,
    /// Requests answered with a count (monotonic)
    answered_total: AtomicU64,
    /// Whole-store queries answered (monotonic)
    store_queries_total: AtomicU64,
    /// Single-sensor queries answered (monotonic)
    sensor_queries_total: AtomicU64,
    /// Rejected requests, indexed like REJECTION_REASONS (monotonic)
    rejections: [AtomicU64; REJECTION_REASONS.len()],
    /// Sum of request latencies in microseconds (reset on report)
    latency_sum_us: AtomicU64,
    /// Max request latency in microseconds (reset on report)
    latency_max_us: AtomicU64,
    /// Request latency histogram buckets (reset on report)
    latency_buckets: [AtomicU64; NUM_BUCKETS],
    /// Sum of request latencies since start (monotonic, for exposition)
    latency_total_sum_us: AtomicU64,
    /// Latency histogram buckets since start (monotonic, for exposition)
    latency_total_buckets: [AtomicU64; NUM_BUCKETS],
    /// Answered queries per store, index from store_index (monotonic)
    store_queries: [AtomicU64; MAX_STORES],
    /// Store names in registry order (set once at init)
    store_names: parking_lot::Mutex<Vec<String>>,
    /// Store name to counter index
    store_index: parking_lot::RwLock<FxHashMap<String, usize>>,
    /// Last report time (only accessed from reporter)
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            requests_since_report: AtomicU64::new(0),
            answered_total: AtomicU64::new(0),
            store_queries_total: AtomicU64::new(0),
            sensor_queries_total: AtomicU64::new(0),
            rejections: std::array::from_fn(|_| AtomicU64::new(0)),
            latency_sum_us: AtomicU64::new(0),
            latency_max_us: AtomicU64::new(0),
            latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            latency_total_sum_us: AtomicU64::new(0),
            latency_total_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            store_queries: std::array::from_fn(|_| AtomicU64::new(0)),
            store_names: parking_lot::Mutex::new(Vec::new()),
            store_index: parking_lot::RwLock::new(FxHashMap::default()),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    /// Register the stores that get a per-store counter.
    /// Stores beyond MAX_STORES are counted only in the totals.
    pub fn set_stores<S: AsRef<str>>(&self, names: &[S]) {
        let names: Vec<String> =
            names.iter().take(MAX_STORES).map(|n| n.as_ref().to_string()).collect();
        let mut index = FxHashMap::default();
        for (i, name) in names.iter().enumerate() {
            index.insert(name.clone(), i);
        }
        *self.store_index.write() = index;
        *self.store_names.lock() = names;
    }

    /// Record a received request and its handling latency
    pub fn record_request(&self, latency_us: u64) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.requests_since_report.fetch_add(1, Ordering::Relaxed);
        self.latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        update_atomic_max(&self.latency_max_us, latency_us);
        let bucket = bucket_index(latency_us);
        self.latency_buckets[bucket].fetch_add(1, Ordering::Relaxed);
        self.latency_total_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        self.latency_total_buckets[bucket].fetch_add(1, Ordering::Relaxed);
    }

    /// Record a query answered with a visitor count
    pub fn record_answer(&self, store: &str, sensor_query: bool) {
        self.answered_total.fetch_add(1, Ordering::Relaxed);
        if sensor_query {
            self.sensor_queries_total.fetch_add(1, Ordering::Relaxed);
        } else {
            self.store_queries_total.fetch_add(1, Ordering::Relaxed);
        }
        if let Some(&idx) = self.store_index.read().get(store) {
            self.store_queries[idx].fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a rejected request; unknown reasons count as bad_request
    pub fn record_rejection(&self, reason: &str) {
        let idx = REJECTION_REASONS
            .iter()
            .position(|&r| r == reason)
            .unwrap_or(REJECTION_REASONS.len() - 1);
        self.rejections[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn answered_total(&self) -> u64 {
        self.answered_total.load(Ordering::Relaxed)
    }

    pub fn rejections(&self, reason: &str) -> u64 {
        REJECTION_REASONS
            .iter()
            .position(|&r| r == reason)
            .map(|idx| self.rejections[idx].load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Answered query count per registered store, in registry order
    pub fn store_queries(&self) -> Vec<(String, u64)> {
        let names = self.store_names.lock();
        names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), self.store_queries[i].load(Ordering::Relaxed)))
            .collect()
    }

    /// Latency histogram since start; never reset by `report()`
    pub fn latency_histogram(&self) -> LatencyHistogram {
        LatencyHistogram {
            buckets: load_buckets(&self.latency_total_buckets),
            sum_us: self.latency_total_sum_us.load(Ordering::Relaxed),
        }
    }

    /// Calculate and return metrics summary, then reset periodic counters
    ///
    /// This is the only method that resets counters. It uses atomic swap
    /// to get a consistent snapshot while allowing concurrent updates.
    pub fn report(&self) -> MetricsSummary {
        let requests_count = self.requests_since_report.swap(0, Ordering::Relaxed);
        let latency_sum = self.latency_sum_us.swap(0, Ordering::Relaxed);
        let max_latency = self.latency_max_us.swap(0, Ordering::Relaxed);
        let lat_buckets = swap_buckets(&self.latency_buckets);

        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };
        let requests_per_sec = if elapsed.as_secs_f64() > 0.0 {
            requests_count as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        self.summarize(requests_count, requests_per_sec, latency_sum, max_latency, lat_buckets)
    }

    /// Current values without resetting anything (for scrapes)
    pub fn snapshot(&self) -> MetricsSummary {
        let requests_count = self.requests_since_report.load(Ordering::Relaxed);
        let latency_sum = self.latency_sum_us.load(Ordering::Relaxed);
        let max_latency = self.latency_max_us.load(Ordering::Relaxed);
        let lat_buckets = load_buckets(&self.latency_buckets);
        // Rate is only meaningful over a report interval
        self.summarize(requests_count, 0.0, latency_sum, max_latency, lat_buckets)
    }

    fn summarize(
        &self,
        requests_count: u64,
        requests_per_sec: f64,
        latency_sum: u64,
        max_latency: u64,
        lat_buckets: [u64; NUM_BUCKETS],
    ) -> MetricsSummary {
        let avg_latency = if requests_count > 0 { latency_sum / requests_count } else { 0 };

        let mut rejections = [0u64; REJECTION_REASONS.len()];
        for (i, counter) in self.rejections.iter().enumerate() {
            rejections[i] = counter.load(Ordering::Relaxed);
        }

        MetricsSummary {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_per_sec,
            answered_total: self.answered_total.load(Ordering::Relaxed),
            store_queries_total: self.store_queries_total.load(Ordering::Relaxed),
            sensor_queries_total: self.sensor_queries_total.load(Ordering::Relaxed),
            rejections,
            avg_latency_us: avg_latency,
            max_latency_us: max_latency,
            lat_p50_us: percentile_from_buckets(&lat_buckets, 0.50),
            lat_p99_us: percentile_from_buckets(&lat_buckets, 0.99),
            lat_buckets,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Exported bucket bounds for Prometheus formatting
pub const METRICS_BUCKET_BOUNDS: [u64; 10] = BUCKET_BOUNDS;

/// Cumulative request latency histogram
#[derive(Debug, Clone, PartialEq)]
pub struct LatencyHistogram {
    pub buckets: [u64; NUM_BUCKETS],
    pub sum_us: u64,
}

impl LatencyHistogram {
    pub fn count(&self) -> u64 {
        self.buckets.iter().sum()
    }

    pub fn p99_us(&self) -> u64 {
        percentile_from_buckets(&self.buckets, 0.99)
    }
}

#[derive(Debug)]
pub struct MetricsSummary {
    pub requests_total: u64,
    pub requests_per_sec: f64,
    pub answered_total: u64,
    pub store_queries_total: u64,
    pub sensor_queries_total: u64,
    /// Rejections, indexed like REJECTION_REASONS
    pub rejections: [u64; REJECTION_REASONS.len()],
    pub avg_latency_us: u64,
    pub max_latency_us: u64,
    /// Request latency histogram buckets for this interval
    pub lat_buckets: [u64; NUM_BUCKETS],
    pub lat_p50_us: u64,
    pub lat_p99_us: u64,
}

impl MetricsSummary {
    pub fn rejected_total(&self) -> u64 {
        self.rejections.iter().sum()
    }

    pub fn log(&self) {
        info!(
            requests_total = %self.requests_total,
            requests_per_sec = format!("{:.1}", self.requests_per_sec),
            answered = %self.answered_total,
            rejected = %self.rejected_total(),
            store_queries = %self.store_queries_total,
            sensor_queries = %self.sensor_queries_total,
            avg_latency_us = %self.avg_latency_us,
            max_latency_us = %self.max_latency_us,
            p99_us = %self.lat_p99_us,
            "metrics"
        );
    }
}
