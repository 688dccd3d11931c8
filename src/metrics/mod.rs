pub mod registry;
pub mod resolver;

pub use registry::{connector_for_metric, freshness_hours, CONNECTOR_METRICS, FIELD_MAPPINGS, METRIC_FRESHNESS};
pub use resolver::resolve;
