pub mod aggregate;
pub mod metrics;
pub mod paired;
pub mod schema;

pub use metrics::{build_metrics, TeamMetricsRow};
pub use schema::{normalize, RawTable};
