use once_cell::sync::Lazy;
use opentelemetry::{
    global,
    metrics::{Counter, Histogram},
};
use opentelemetry_prometheus::PrometheusExporter;

use crate::reconcile::MergeStats;

pub static METRICS: Lazy<TaxonomyMetrics> = Lazy::new(TaxonomyMetrics::init);

pub struct TaxonomyMetrics {
    pub exporter: PrometheusExporter,
    pub nodes_merged: Counter<u64>,
    pub nodes_created: Counter<u64>,
    pub orphans_deactivated: Counter<u64>,
    pub batch_failures: Counter<u64>,
    pub grid_query_duration: Histogram<f64>,
}

impl TaxonomyMetrics {
    pub fn init() -> Self {
        let exporter = opentelemetry_prometheus::exporter().build().expect("failed to build prometheus exporter");
        let meter = global::meter("repertoire");

        let nodes_merged = meter.u64_counter("repertoire_nodes_merged_total")
            .with_description("Existing nodes reconciled against incoming descriptors").build();

        let nodes_created = meter.u64_counter("repertoire_nodes_created_total")
            .with_description("Nodes materialized from descriptors").build();

        let orphans_deactivated = meter.u64_counter("repertoire_orphans_deactivated_total")
            .with_description("Existing children deactivated for lack of an incoming counterpart").build();

        let batch_failures = meter.u64_counter("repertoire_batch_failures_total")
            .with_description("Batch items that failed and were skipped").build();

        let grid_query_duration = meter.f64_histogram("repertoire_grid_query_duration_seconds")
            .with_description("Duration of grid filter/sort/paginate passes").build();

        Self {
            exporter,
            nodes_merged,
            nodes_created,
            orphans_deactivated,
            batch_failures,
            grid_query_duration,
        }
    }

    pub fn record_merge(&self, stats: &MergeStats) {
        self.nodes_merged.add(stats.merged as u64, &[]);
        self.nodes_created.add(stats.created as u64, &[]);
        self.orphans_deactivated.add(stats.deactivated as u64, &[]);
    }

    pub fn record_batch_failure(&self) {
        self.batch_failures.add(1, &[]);
    }

    pub fn observe_grid_query(&self, elapsed: std::time::Duration) {
        self.grid_query_duration.record(elapsed.as_secs_f64(), &[]);
    }
}
