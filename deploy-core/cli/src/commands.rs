use crate::output;
use crate::Cli;
use anyhow::{Context as _, Result};
use deploy_core::config::CapabilityKind;
use deploy_core::executor::{adopt, preview, Executor};
use deploy_core::observability::DeployMetrics;
use deploy_core::state::{MemoryStateStore, SqliteStateStore, StateStore};
use deploy_core::{resolve, resolve_all, DeployConfig, DeploymentPlan, Registry, Verifier};
use std::collections::HashSet;

pub struct Context {
    pub config: DeployConfig,
    pub registry: Registry,
}

impl Context {
    /// Resolve configuration and load the registry. Fails before anything touches the store.
    pub async fn load(cli: &Cli) -> Result<Self> {
        let mut config = DeployConfig::load(cli.config.as_deref()).await?;
        config.apply_env();
        if let Some(store) = &cli.store {
            config.store = store.clone();
        }
        if let Some(registry) = &cli.registry {
            config.registry = Some(registry.clone());
        }
        if let Some(format) = cli.log_format {
            config.log_format = format;
        }

        let registry = config.load_registry().await?;
        // Surface registry cycles up front, whatever the targets
        resolve_all(&registry)?;

        Ok(Self { config, registry })
    }

    fn plan(&self, targets: Vec<String>) -> Result<DeploymentPlan> {
        let targets = if targets.is_empty() {
            self.config.effective_targets(&self.registry)
        } else {
            targets
        };
        Ok(resolve(&self.registry, &targets)?)
    }

    async fn open_store(&self) -> Result<SqliteStateStore> {
        SqliteStateStore::open(&self.config.store)
            .await
            .with_context(|| format!("opening state store {}", self.config.store.display()))
    }

    /// Read-only view: an absent store file is treated as empty rather than created.
    async fn read_store(&self) -> Result<Box<dyn StateStore>> {
        if self.config.store.exists() {
            Ok(Box::new(self.open_store().await?))
        } else {
            Ok(Box::new(MemoryStateStore::new()))
        }
    }
}

pub struct DeployOptions {
    pub dry_run: bool,
    pub redeploy: Vec<String>,
    pub endpoint: Option<String>,
    pub metrics: bool,
    pub break_lock: bool,
}

pub async fn plan(context: &Context, targets: Vec<String>, json: bool) -> Result<()> {
    let plan = context.plan(targets)?;
    let store = context.read_store().await?;
    let steps = preview(&context.registry, store.as_ref(), &plan, &HashSet::new()).await?;
    output::print_plan(&steps, json)
}

pub async fn deploy(mut context: Context, targets: Vec<String>, options: DeployOptions) -> Result<()> {
    if let Some(endpoint) = options.endpoint {
        context.config.capability.kind = CapabilityKind::Http;
        context.config.capability.endpoint = Some(endpoint);
    }
    context.config.dry_run |= options.dry_run;
    context.config.validate()?;

    let plan = context.plan(targets)?;
    let force: HashSet<String> = options.redeploy.into_iter().collect();

    if context.config.dry_run {
        let store = context.read_store().await?;
        let steps = preview(&context.registry, store.as_ref(), &plan, &force).await?;
        return output::print_plan(&steps, false);
    }

    let store = context.open_store().await?;
    if options.break_lock {
        if let Some(holder) = store.break_lock().await? {
            tracing::warn!(holder = %holder, "cleared stale run lock");
        }
    }

    let capability = context.config.build_capability()?;
    let metrics = DeployMetrics::new()?;
    let executor = Executor::new(&context.registry, &store, capability.as_ref())
        .with_retry(context.config.retry_policy())
        .with_metrics(&metrics)
        .force_redeploy(force);

    let report = executor.execute(&plan).await?;
    output::print_run(&report);

    if options.metrics {
        print!("{}", metrics.export()?);
    }

    report.into_result()?;
    Ok(())
}

/// Returns whether the report was clean.
pub async fn verify(context: &Context, targets: Vec<String>, json: bool) -> Result<bool> {
    let scope = if targets.is_empty() {
        None
    } else {
        Some(resolve(&context.registry, &targets)?.order)
    };

    let store = context.read_store().await?;
    let report = Verifier::new(&context.registry, store.as_ref())
        .verify_only(scope.as_deref())
        .await?;
    output::print_verification(&report, json)?;
    Ok(report.is_clean())
}

pub async fn import(context: &Context, name: &str, address: &str) -> Result<()> {
    let store = context.open_store().await?;
    let record = adopt(&context.registry, &store, name, address).await?;
    output::print_records(std::slice::from_ref(&record), false)
}

pub async fn history(context: &Context, name: &str, json: bool) -> Result<()> {
    context.registry.get_artifact(name)?;
    let store = context.read_store().await?;
    let records = store.history(name).await?;
    output::print_records(&records, json)
}
