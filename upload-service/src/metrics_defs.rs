//! Metrics definitions for the upload service.

use shared::metrics_defs::{MetricDef, MetricType};

pub const UPLOAD_BYTES: MetricDef = MetricDef {
    name: "upload.bytes",
    metric_type: MetricType::Histogram,
    description: "Size in bytes of each completed upload probe",
};

pub const UPLOADS_COMPLETED: MetricDef = MetricDef {
    name: "upload.completed",
    metric_type: MetricType::Counter,
    description: "Upload probes drained and acknowledged",
};

pub const ALL_METRICS: &[MetricDef] = &[UPLOAD_BYTES, UPLOADS_COMPLETED];
