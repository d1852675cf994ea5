// Observability: metrics and logging

pub mod logging;
pub mod metrics;

pub use self::logging::init_logging;
pub use self::metrics::{fetch_duration, products, rate_limited, request, snapshot_products, Stage};
