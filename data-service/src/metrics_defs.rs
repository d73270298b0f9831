//! Metrics definitions for the data service.

use shared::metrics_defs::{MetricDef, MetricType};

pub const MEASUREMENTS_STORED: MetricDef = MetricDef {
    name: "measurements.stored",
    metric_type: MetricType::Counter,
    description: "Coverage measurements committed to the store",
};

pub const MEASUREMENTS_FAILED: MetricDef = MetricDef {
    name: "measurements.failed",
    metric_type: MetricType::Counter,
    description: "Coverage measurements that could not be persisted",
};

pub const ALL_METRICS: &[MetricDef] = &[MEASUREMENTS_STORED, MEASUREMENTS_FAILED];
