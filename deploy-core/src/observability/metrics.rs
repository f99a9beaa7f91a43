use crate::error::Result;
use prometheus::{Counter, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use std::sync::Arc;
use std::time::Duration;

/// Prometheus counters for deployment runs.
#[derive(Clone)]
pub struct DeployMetrics {
    registry: Arc<Registry>,
    deployed: Counter,
    skipped: Counter,
    failures: Counter,
    capability_duration: Histogram,
}

impl DeployMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let deployed = Counter::with_opts(
            Opts::new("deploy_artifacts_deployed_total", "Artifacts deployed")
                .const_label("component", "executor"),
        )?;

        let skipped = Counter::with_opts(
            Opts::new("deploy_artifacts_skipped_total", "Artifacts already deployed with identical arguments")
                .const_label("component", "executor"),
        )?;

        let failures = Counter::with_opts(
            Opts::new("deploy_capability_failures_total", "Failed deployment calls")
                .const_label("component", "executor"),
        )?;

        let capability_duration = Histogram::with_opts(
            HistogramOpts::new("deploy_capability_duration_seconds", "Deployment call latency in seconds")
                .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        )?;

        registry.register(Box::new(deployed.clone()))?;
        registry.register(Box::new(skipped.clone()))?;
        registry.register(Box::new(failures.clone()))?;
        registry.register(Box::new(capability_duration.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            deployed,
            skipped,
            failures,
            capability_duration,
        })
    }

    pub fn record_deployed(&self, elapsed: Duration) {
        self.deployed.inc();
        self.capability_duration.observe(elapsed.as_secs_f64());
    }

    pub fn record_skipped(&self) {
        self.skipped.inc();
    }

    pub fn record_failure(&self, elapsed: Duration) {
        self.failures.inc();
        self.capability_duration.observe(elapsed.as_secs_f64());
    }

    pub fn deployed_total(&self) -> u64 {
        self.deployed.get() as u64
    }

    pub fn skipped_total(&self) -> u64 {
        self.skipped.get() as u64
    }

    pub fn failures_total(&self) -> u64 {
        self.failures.get() as u64
    }

    /// Prometheus text exposition of every metric.
    pub fn export(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| crate::error::DeployError::Unknown(e.to_string()))
    }
}
