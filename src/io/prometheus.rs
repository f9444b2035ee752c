//! Prometheus text exposition for the traffic API metrics
//!
//! Served at /metrics by the HTTP server in `io::http`.

use crate::infra::metrics::{
    LatencyHistogram, Metrics, MetricsSummary, METRICS_BUCKET_BOUNDS, REJECTION_REASONS,
};
use std::fmt::Write;

/// Prometheus metric type
enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

/// Write a simple metric (counter or gauge) with site label
fn write_metric(
    output: &mut String,
    name: &str,
    help: &str,
    typ: MetricType,
    site: &str,
    val: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {}", typ.as_str());
    let _ = writeln!(output, "{name}{{site=\"{site}\"}} {val}");
}

/// Write a cumulative histogram with buckets, sum, and count
fn write_histogram(
    output: &mut String,
    name: &str,
    help: &str,
    site: &str,
    histogram: &LatencyHistogram,
    bounds: &[u64; 10],
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} histogram");

    let mut cumulative = 0u64;
    for (count, &bound) in histogram.buckets.iter().zip(bounds.iter()) {
        cumulative += count;
        let _ = writeln!(output, "{name}_bucket{{site=\"{site}\",le=\"{bound}\"}} {cumulative}");
    }
    let count = histogram.count();
    let _ = writeln!(output, "{name}_bucket{{site=\"{site}\",le=\"+Inf\"}} {count}");
    let _ = writeln!(output, "{name}_sum{{site=\"{site}\"}} {}", histogram.sum_us);
    let _ = writeln!(output, "{name}_count{{site=\"{site}\"}} {count}");
}

/// Format metrics in Prometheus text exposition format
pub fn format_prometheus_metrics(metrics: &Metrics, site_id: &str) -> String {
    let summary = metrics.snapshot();
    let mut output = String::with_capacity(4096);

    write_request_metrics(&mut output, site_id, &summary, &metrics.latency_histogram());
    write_rejection_metrics(&mut output, site_id, &summary);
    write_store_metrics(&mut output, site_id, metrics);

    output
}

fn write_request_metrics(
    output: &mut String,
    site: &str,
    summary: &MetricsSummary,
    latency: &LatencyHistogram,
) {
    write_metric(
        output,
        "traffic_requests_total",
        "Total visitor count requests received",
        MetricType::Counter,
        site,
        summary.requests_total,
    );
    write_metric(
        output,
        "traffic_answered_total",
        "Requests answered with a visitor count",
        MetricType::Counter,
        site,
        summary.answered_total,
    );
    write_metric(
        output,
        "traffic_store_queries_total",
        "Whole-store queries answered",
        MetricType::Counter,
        site,
        summary.store_queries_total,
    );
    write_metric(
        output,
        "traffic_sensor_queries_total",
        "Single-sensor queries answered",
        MetricType::Counter,
        site,
        summary.sensor_queries_total,
    );
    write_histogram(
        output,
        "traffic_request_latency_us",
        "Request handling latency in microseconds",
        site,
        latency,
        &METRICS_BUCKET_BOUNDS,
    );
    write_metric(
        output,
        "traffic_request_latency_p99_us",
        "99th percentile request latency",
        MetricType::Gauge,
        site,
        latency.p99_us(),
    );
}

fn write_rejection_metrics(output: &mut String, site: &str, summary: &MetricsSummary) {
    let _ = writeln!(output, "# HELP traffic_rejected_total Requests rejected, by reason");
    let _ = writeln!(output, "# TYPE traffic_rejected_total counter");
    for (reason, count) in REJECTION_REASONS.iter().zip(summary.rejections.iter()) {
        let _ = writeln!(
            output,
            "traffic_rejected_total{{site=\"{site}\",reason=\"{reason}\"}} {count}"
        );
    }
}

fn write_store_metrics(output: &mut String, site: &str, metrics: &Metrics) {
    let _ = writeln!(output, "# HELP traffic_store_answered_total Queries answered per store");
    let _ = writeln!(output, "# TYPE traffic_store_answered_total counter");
    for (store, count) in metrics.store_queries() {
        let _ = writeln!(
            output,
            "traffic_store_answered_total{{site=\"{site}\",store=\"{store}\"}} {count}"
        );
    }
}
