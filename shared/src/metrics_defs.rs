//! Common types for metrics definitions, plus the metrics emitted by shared code.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Histogram,
}

#[derive(Debug, Clone, Copy)]
pub struct MetricDef {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub description: &'static str,
}

/// Register descriptions with the installed recorder.
pub fn describe(defs: &[MetricDef]) {
    for def in defs {
        match def.metric_type {
            MetricType::Counter => metrics::describe_counter!(def.name, def.description),
            MetricType::Histogram => metrics::describe_histogram!(def.name, def.description),
        }
    }
}

#[macro_export]
macro_rules! counter {
    ($def:expr) => {
        metrics::counter!($def.name)
    };
    ($def:expr, $($label:expr => $value:expr),+ $(,)?) => {
        metrics::counter!($def.name, $($label => $value),+)
    };
}

#[macro_export]
macro_rules! histogram {
    ($def:expr) => {
        metrics::histogram!($def.name)
    };
    ($def:expr, $($label:expr => $value:expr),+ $(,)?) => {
        metrics::histogram!($def.name, $($label => $value),+)
    };
}

pub const AUTH_REJECTED: MetricDef = MetricDef {
    name: "auth.rejected",
    metric_type: MetricType::Counter,
    description: "Requests rejected by API key validation. Tagged with reason.",
};

pub const STORE_HEALTH_FAILURES: MetricDef = MetricDef {
    name: "store.health_check.failed",
    metric_type: MetricType::Counter,
    description: "Health checks that could not reach the database",
};

pub const ALL_METRICS: &[MetricDef] = &[AUTH_REJECTED, STORE_HEALTH_FAILURES];
