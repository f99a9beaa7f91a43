//! Wiring verification against the state store. Findings are reported, never raised.

use crate::error::Result;
use crate::registry::{ConstructorArg, Registry};
use crate::state::{DeploymentRecord, StateStore};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// Recorded arguments differ from what the dependencies' current addresses imply.
    WiringDrift {
        artifact: String,
        expected: Vec<ConstructorArg>,
        actual: Vec<ConstructorArg>,
    },
    /// A declared dependency has never been deployed.
    IncompleteDeployment { artifact: String, missing: Vec<String> },
    /// A record exists for a name the registry no longer declares.
    UnregisteredArtifact { artifact: String },
}

impl Finding {
    pub fn artifact(&self) -> &str {
        match self {
            Finding::WiringDrift { artifact, .. }
            | Finding::IncompleteDeployment { artifact, .. }
            | Finding::UnregisteredArtifact { artifact } => artifact,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VerificationReport {
    pub checked: usize,
    pub findings: Vec<Finding>,
}

impl VerificationReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn drift_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| matches!(f, Finding::WiringDrift { .. }))
            .count()
    }

    pub fn incomplete_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| matches!(f, Finding::IncompleteDeployment { .. }))
            .count()
    }
}

pub struct Verifier<'a> {
    registry: &'a Registry,
    store: &'a dyn StateStore,
}

impl<'a> Verifier<'a> {
    pub fn new(registry: &'a Registry, store: &'a dyn StateStore) -> Self {
        Self { registry, store }
    }

    /// Check every recorded artifact, and every registered one left undeployed.
    pub async fn verify(&self) -> Result<VerificationReport> {
        self.verify_only(None).await
    }

    /// Restrict the report to the artifacts named in `scope`, when given.
    pub async fn verify_only(&self, scope: Option<&[String]>) -> Result<VerificationReport> {
        let records = self.store.all().await?;
        let addresses: HashMap<&str, &str> = records
            .iter()
            .map(|r| (r.name.as_str(), r.address.as_str()))
            .collect();
        let in_scope = |name: &str| scope.map_or(true, |s| s.iter().any(|n| n == name));

        let mut report = VerificationReport::default();
        for record in records.iter().filter(|r| in_scope(&r.name)) {
            report.checked += 1;
            if let Some(finding) = self.check(record, &addresses) {
                tracing::warn!(artifact = %finding.artifact(), finding = ?finding, "wiring check failed");
                report.findings.push(finding);
            }
        }

        // Undeployed artifacts whose dependencies are missing too: a run stopped short
        for spec in self.registry.list_artifacts() {
            if addresses.contains_key(spec.name.as_str()) || !in_scope(&spec.name) {
                continue;
            }
            let missing = missing_dependencies(&spec.dependencies, &addresses);
            if !missing.is_empty() {
                let finding = Finding::IncompleteDeployment {
                    artifact: spec.name.clone(),
                    missing,
                };
                tracing::warn!(artifact = %spec.name, finding = ?finding, "deployment incomplete");
                report.findings.push(finding);
            }
        }

        tracing::info!(
            checked = report.checked,
            findings = report.findings.len(),
            "verification finished"
        );
        Ok(report)
    }

    fn check(&self, record: &DeploymentRecord, addresses: &HashMap<&str, &str>) -> Option<Finding> {
        let spec = match self.registry.get_artifact(&record.name) {
            Ok(spec) => spec,
            Err(_) => {
                return Some(Finding::UnregisteredArtifact {
                    artifact: record.name.clone(),
                })
            }
        };

        let missing = missing_dependencies(&spec.dependencies, addresses);
        if !missing.is_empty() {
            return Some(Finding::IncompleteDeployment {
                artifact: record.name.clone(),
                missing,
            });
        }

        // Layout defects are caught when the registry is built, so resolution only
        // fails on a missing address, which was ruled out above.
        let expected = spec
            .resolve_args(|name| addresses.get(name).map(|a| a.to_string()))
            .ok()?;

        (expected != record.constructor_args).then(|| Finding::WiringDrift {
            artifact: record.name.clone(),
            expected,
            actual: record.constructor_args.clone(),
        })
    }
}

fn missing_dependencies(dependencies: &[String], addresses: &HashMap<&str, &str>) -> Vec<String> {
    dependencies
        .iter()
        .filter(|d| !addresses.contains_key(d.as_str()))
        .cloned()
        .collect()
}
