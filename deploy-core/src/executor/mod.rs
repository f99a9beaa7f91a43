//! Deployment executor: walks a plan, deploying or reusing each artifact in order.

pub mod capability;
pub mod preview;

pub use capability::{CapabilityError, DeployCapability, HttpCapability, SimulatedCapability};
pub use preview::{preview, PlannedAction, PlannedStep};

use crate::error::{DeployError, Result};
use crate::observability::DeployMetrics;
use crate::registry::{ArtifactSpec, ConstructorArg, Registry};
use crate::resilience::{retry_with_policy, ExponentialBackoffRetry, RetryPolicy};
use crate::resolver::DeploymentPlan;
use crate::security::validate_address;
use crate::state::{DeploymentRecord, StateStore};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepOutcome {
    Deployed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub outcome: StepOutcome,
    pub record: DeploymentRecord,
}

/// The step that stopped a run.
#[derive(Debug)]
pub struct RunFailure {
    pub index: usize,
    pub artifact: String,
    pub error: DeployError,
}

#[derive(Debug)]
pub struct RunReport {
    pub run_id: String,
    /// Completed steps, in plan order.
    pub steps: Vec<StepResult>,
    pub failure: Option<RunFailure>,
    /// Plan entries after the failed one.
    pub not_attempted: Vec<String>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn deployed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.outcome == StepOutcome::Deployed).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.steps.iter().filter(|s| s.outcome == StepOutcome::Skipped).count()
    }

    pub fn records(&self) -> impl Iterator<Item = &DeploymentRecord> {
        self.steps.iter().map(|s| &s.record)
    }

    /// Turn a partial run into its underlying error.
    pub fn into_result(self) -> Result<Vec<StepResult>> {
        match self.failure {
            Some(failure) => Err(failure.error),
            None => Ok(self.steps),
        }
    }
}

/// Look up the current address of each dependency of `spec` and compute its constructor arguments.
pub(crate) async fn current_args(
    spec: &ArtifactSpec,
    store: &dyn StateStore,
) -> Result<Vec<ConstructorArg>> {
    let mut addresses = HashMap::with_capacity(spec.dependencies.len());
    for dependency in &spec.dependencies {
        if let Some(record) = store.get(dependency).await? {
            addresses.insert(dependency.as_str(), record.address);
        }
    }
    spec.resolve_args(|name| addresses.get(name).cloned())
}

pub struct Executor<'a> {
    registry: &'a Registry,
    store: &'a dyn StateStore,
    capability: &'a dyn DeployCapability,
    retry: Box<dyn RetryPolicy>,
    metrics: Option<&'a DeployMetrics>,
    force: HashSet<String>,
    run_id: String,
}

impl<'a> Executor<'a> {
    pub fn new(
        registry: &'a Registry,
        store: &'a dyn StateStore,
        capability: &'a dyn DeployCapability,
    ) -> Self {
        Self {
            registry,
            store,
            capability,
            retry: Box::new(ExponentialBackoffRetry::default()),
            metrics: None,
            force: HashSet::new(),
            run_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_retry(mut self, retry: impl RetryPolicy + 'static) -> Self {
        self.retry = Box::new(retry);
        self
    }

    pub fn with_metrics(mut self, metrics: &'a DeployMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Deploy these artifacts again even if their recorded arguments still match.
    pub fn force_redeploy<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.force.extend(names.into_iter().map(Into::into));
        self
    }

    /// Execute `plan` under the store's run lock.
    ///
    /// Errors returned directly mean nothing was attempted. A step failure is
    /// reported in the `RunReport`; every earlier step is already persisted.
    pub async fn execute(&self, plan: &DeploymentPlan) -> Result<RunReport> {
        for name in plan.iter() {
            self.registry.get_artifact(name)?;
        }
        if let Some(stray) = self.force.iter().find(|n| !plan.contains(n)) {
            return Err(DeployError::InvalidInput(format!(
                "{} is marked for redeploy but is not in the plan",
                stray
            )));
        }

        self.store.acquire_lock(&self.run_id).await?;

        let span = tracing::info_span!("deploy_run", run_id = %self.run_id, steps = plan.len());
        let report = self.run_steps(plan).instrument(span).await;

        if let Err(e) = self.store.release_lock(&self.run_id).await {
            tracing::warn!(run_id = %self.run_id, error = %e, "failed to release run lock");
        }

        Ok(report)
    }

    async fn run_steps(&self, plan: &DeploymentPlan) -> RunReport {
        let mut steps = Vec::with_capacity(plan.len());
        let mut failure = None;
        let mut not_attempted = Vec::new();

        for (index, name) in plan.order.iter().enumerate() {
            match self.step(name).await {
                Ok(step) => steps.push(step),
                Err(error) => {
                    tracing::error!(artifact = %name, index, error = %error, "deployment run stopped");
                    failure = Some(RunFailure {
                        index,
                        artifact: name.clone(),
                        error,
                    });
                    not_attempted = plan.order[index + 1..].to_vec();
                    break;
                }
            }
        }

        RunReport {
            run_id: self.run_id.clone(),
            steps,
            failure,
            not_attempted,
        }
    }

    async fn step(&self, name: &str) -> Result<StepResult> {
        let spec = self.registry.get_artifact(name)?;
        let args = current_args(spec, self.store).await?;

        if let Some(existing) = self.store.get(name).await? {
            if existing.constructor_args == args && !self.force.contains(name) {
                tracing::info!(artifact = %name, address = %existing.address, "already deployed, skipping");
                if let Some(metrics) = self.metrics {
                    metrics.record_skipped();
                }
                return Ok(StepResult {
                    outcome: StepOutcome::Skipped,
                    record: existing,
                });
            }
            tracing::info!(artifact = %name, previous = %existing.address, "redeploying");
        }

        let started = Instant::now();
        let deployed = retry_with_policy(self.retry.as_ref(), || self.capability.deploy(name, &args))
            .await
            .and_then(|address| match validate_address(&address) {
                Ok(()) => Ok(address),
                Err(e) => Err(CapabilityError::InvalidAddress(format!("{}: {}", address, e))),
            });

        let address = match deployed {
            Ok(address) => address,
            Err(source) => {
                if let Some(metrics) = self.metrics {
                    metrics.record_failure(started.elapsed());
                }
                return Err(DeployError::DeploymentCapabilityFailure {
                    artifact: name.to_string(),
                    args,
                    source,
                });
            }
        };

        if let Some(metrics) = self.metrics {
            metrics.record_deployed(started.elapsed());
        }

        let record = DeploymentRecord::new(name, address, args, Some(self.run_id.clone()));
        if let Err(e) = self.store.put(&record).await {
            tracing::error!(
                artifact = %name,
                address = %record.address,
                error = %e,
                "deployed but not recorded"
            );
            return Err(DeployError::PersistFailed {
                artifact: name.to_string(),
                address: record.address,
                source: Box::new(e),
            });
        }
        tracing::info!(artifact = %name, address = %record.address, "deployed");

        Ok(StepResult {
            outcome: StepOutcome::Deployed,
            record,
        })
    }
}

/// Record an artifact deployed outside this tool, wiring it to its dependencies' current records.
pub async fn adopt(
    registry: &Registry,
    store: &dyn StateStore,
    name: &str,
    address: &str,
) -> Result<DeploymentRecord> {
    let spec = registry.get_artifact(name)?;
    validate_address(address)
        .map_err(|e| DeployError::InvalidInput(format!("{}: {}", address, e)))?;

    let run_id = Uuid::new_v4().to_string();
    store.acquire_lock(&run_id).await?;
    let adopted = async {
        let args = current_args(spec, store).await?;
        let record = DeploymentRecord::new(name, address, args, Some(run_id.clone()));
        store.put(&record).await?;
        Ok::<_, DeployError>(record)
    }
    .await;

    if let Err(e) = store.release_lock(&run_id).await {
        tracing::warn!(run_id = %run_id, error = %e, "failed to release run lock");
    }

    if let Ok(record) = &adopted {
        tracing::info!(artifact = %name, address = %record.address, "adopted existing deployment");
    }
    adopted
}
