//! Metric declarations for the query engine.
//!
//! Metrics are declared once in [`metric_defs`] and recorded through the
//! `metrics` facade. Nothing is recorded unless the host installs a recorder.
//!
//! ```rust
//! use cvm_model::telemetry::metric_defs;
//!
//! metrics::counter!(metric_defs::QUERY_POINTS.name, metric_defs::OUTCOME => "found").increment(1);
//! ```

use metrics::{describe_counter, describe_histogram, Unit};

/// How a metric is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Monotonic count of events.
    Counter,
    /// Distribution of observed values.
    Histogram,
}

/// A named engine metric. Every engine metric counts items.
#[derive(Debug, Clone, Copy)]
pub struct Metric {
    /// Name passed to the `metrics` macros.
    pub name: &'static str,
    /// Counter or histogram.
    pub kind: MetricKind,
    /// Text registered with the recorder.
    pub description: &'static str,
}

impl Metric {
    const fn counter(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Counter,
            description,
        }
    }

    const fn histogram(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Histogram,
            description,
        }
    }

    /// Register the description and unit with the installed recorder.
    pub fn describe(&self) {
        match self.kind {
            MetricKind::Counter => describe_counter!(self.name, Unit::Count, self.description),
            MetricKind::Histogram => {
                describe_histogram!(self.name, Unit::Count, self.description)
            }
        }
    }
}

/// All metrics recorded by the engine.
pub mod metric_defs {
    use super::Metric;

    /// Label key on [`QUERY_POINTS`]: `found`, `data_gap`, `out_of_bounds`
    /// or `no_correction`.
    pub const OUTCOME: &str = "outcome";

    /// Query points processed, labelled by [`OUTCOME`].
    pub const QUERY_POINTS: Metric = Metric::counter("cvm.query.points", "Query points processed");

    pub const QUERY_BATCHES: Metric =
        Metric::counter("cvm.query.batches", "Query batches processed");

    pub const QUERY_BATCH_SIZE: Metric =
        Metric::histogram("cvm.query.batch_size", "Points per query batch");

    /// Values read from grid files that are not held in memory.
    pub const GRID_DISK_READS: Metric =
        Metric::counter("cvm.grid.disk_reads", "Grid values read from disk");

    /// Every metric in this module.
    pub const ALL: &[&Metric] = &[
        &QUERY_POINTS,
        &QUERY_BATCHES,
        &QUERY_BATCH_SIZE,
        &GRID_DISK_READS,
    ];
}

/// Describe every engine metric. Call once after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}
