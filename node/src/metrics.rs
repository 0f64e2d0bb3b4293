//! Prometheus metrics for the EMBER node.
//!
//! Exposes counters and gauges covering ingestion, aggregation and
//! publishing.  The [`NodeMetrics`] struct owns a dedicated [`Registry`]; the
//! daemon encodes it into the Prometheus text exposition format on shutdown.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge,
    Opts, Registry, TextEncoder,
};

/// Central collection of all node-level Prometheus metrics.
pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Block records fetched from the ledger and written to the cache.
    pub records_cached: IntCounter,
    /// Block records served from the cache instead of the ledger.
    pub records_reused: IntCounter,
    /// Uncle records fetched and written to the cache.
    pub uncles_cached: IntCounter,
    /// Ingestion cycles abandoned because of an error.
    pub ingestion_failures: IntCounter,
    /// Records consumed by the processor.
    pub records_processed: IntCounter,
    /// Reports written to pending.
    pub reports_written: IntCounter,
    /// Reports moved to published.
    pub reports_published: IntCounter,
    /// Sink or store failures while publishing.
    pub publish_failures: IntCounter,
    /// Failed spot price lookups.
    pub price_failures: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Latest head block reported by the ledger.
    pub head_block: IntGauge,
    /// Highest block written to (or confirmed in) the cache.
    pub last_cached_block: IntGauge,
    /// Highest block consumed by the processor.
    pub last_processed_block: IntGauge,
    /// Cumulative burned ETH, whole units.
    pub cumulative_burned_eth: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Wall time of one ingestion cycle, in seconds.
    pub ingestion_cycle_secs: Histogram,
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        // Counters
        let records_cached = register_int_counter_with_registry!(
            Opts::new(
                "ember_records_cached_total",
                "Block records fetched from the ledger and cached"
            ),
            registry
        )
        .expect("failed to register records_cached counter");

        let records_reused = register_int_counter_with_registry!(
            Opts::new(
                "ember_records_reused_total",
                "Block records served from the cache"
            ),
            registry
        )
        .expect("failed to register records_reused counter");

        let uncles_cached = register_int_counter_with_registry!(
            Opts::new("ember_uncles_cached_total", "Uncle records fetched and cached"),
            registry
        )
        .expect("failed to register uncles_cached counter");

        let ingestion_failures = register_int_counter_with_registry!(
            Opts::new(
                "ember_ingestion_failures_total",
                "Ingestion cycles abandoned because of an error"
            ),
            registry
        )
        .expect("failed to register ingestion_failures counter");

        let records_processed = register_int_counter_with_registry!(
            Opts::new(
                "ember_records_processed_total",
                "Records consumed by the processor"
            ),
            registry
        )
        .expect("failed to register records_processed counter");

        let reports_written = register_int_counter_with_registry!(
            Opts::new("ember_reports_written_total", "Reports written to pending"),
            registry
        )
        .expect("failed to register reports_written counter");

        let reports_published = register_int_counter_with_registry!(
            Opts::new("ember_reports_published_total", "Reports moved to published"),
            registry
        )
        .expect("failed to register reports_published counter");

        let publish_failures = register_int_counter_with_registry!(
            Opts::new(
                "ember_publish_failures_total",
                "Failures while handing reports to the sink"
            ),
            registry
        )
        .expect("failed to register publish_failures counter");

        let price_failures = register_int_counter_with_registry!(
            Opts::new("ember_price_failures_total", "Failed spot price lookups"),
            registry
        )
        .expect("failed to register price_failures counter");

        // Gauges
        let head_block = register_int_gauge_with_registry!(
            Opts::new("ember_head_block", "Latest head block reported by the ledger"),
            registry
        )
        .expect("failed to register head_block gauge");

        let last_cached_block = register_int_gauge_with_registry!(
            Opts::new("ember_last_cached_block", "Highest block present in the cache"),
            registry
        )
        .expect("failed to register last_cached_block gauge");

        let last_processed_block = register_int_gauge_with_registry!(
            Opts::new(
                "ember_last_processed_block",
                "Highest block consumed by the processor"
            ),
            registry
        )
        .expect("failed to register last_processed_block gauge");

        let cumulative_burned_eth = register_int_gauge_with_registry!(
            Opts::new(
                "ember_cumulative_burned_eth",
                "Cumulative burned ETH (whole units)"
            ),
            registry
        )
        .expect("failed to register cumulative_burned_eth gauge");

        // Histograms – exponential buckets covering 10 ms → ~160 s.
        let ingestion_cycle_secs = register_histogram_with_registry!(
            HistogramOpts::new(
                "ember_ingestion_cycle_seconds",
                "Wall time of one ingestion cycle"
            )
            .buckets(
                prometheus::exponential_buckets(0.01, 2.0, 15)
                    .expect("valid histogram buckets")
            ),
            registry
        )
        .expect("failed to register ingestion_cycle_secs histogram");

        Self {
            registry,
            records_cached,
            records_reused,
            uncles_cached,
            ingestion_failures,
            records_processed,
            reports_written,
            reports_published,
            publish_failures,
            price_failures,
            head_block,
            last_cached_block,
            last_processed_block,
            cumulative_burned_eth,
            ingestion_cycle_secs,
        }
    }

    /// Encode every metric in the Prometheus text exposition format.
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_encodes_counters() {
        let metrics = NodeMetrics::new();
        metrics.records_cached.inc_by(3);
        metrics.head_block.set(13_648_100);
        let text = metrics.encode_text().unwrap();
        assert!(text.contains("ember_records_cached_total 3"));
        assert!(text.contains("ember_head_block 13648100"));
    }

    #[test]
    fn independent_instances_do_not_collide() {
        let a = NodeMetrics::new();
        let b = NodeMetrics::new();
        a.reports_written.inc();
        assert_eq!(a.reports_written.get(), 1);
        assert_eq!(b.reports_written.get(), 0);
    }
}
