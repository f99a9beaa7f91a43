pub mod logging;
pub mod metrics;

pub use logging::{set_log_format, setup_logging, LogFormat};
pub use metrics::DeployMetrics;
