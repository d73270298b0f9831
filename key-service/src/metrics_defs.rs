//! Metrics definitions for the key service.

use shared::metrics_defs::{MetricDef, MetricType};

pub const KEYS_ISSUED: MetricDef = MetricDef {
    name: "keys.issued",
    metric_type: MetricType::Counter,
    description: "Key generation requests answered. Tagged with outcome (created, existing).",
};

pub const KEY_ISSUANCE_CONFLICTS: MetricDef = MetricDef {
    name: "keys.issuance_conflicts",
    metric_type: MetricType::Counter,
    description: "First-time registrations that lost the race to a concurrent request",
};

pub const ALL_METRICS: &[MetricDef] = &[KEYS_ISSUED, KEY_ISSUANCE_CONFLICTS];
