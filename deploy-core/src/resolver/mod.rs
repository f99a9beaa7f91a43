//! Dependency resolution: turns a target set into a dependency-first deployment order.

use crate::error::{DeployError, Result};
use crate::registry::Registry;
use serde::Serialize;
use std::collections::HashMap;

/// Ordered, dependency-consistent list of artifacts to deploy. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentPlan {
    pub order: Vec<String>,
}

impl DeploymentPlan {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.order.iter().any(|n| n == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.order.iter().position(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Visited,
}

/// Plan every target plus its transitive dependencies.
///
/// Targets are walked in registry declaration order and dependencies in their
/// declared order, so the same registry and target set always give the same plan.
pub fn resolve<S: AsRef<str>>(registry: &Registry, targets: &[S]) -> Result<DeploymentPlan> {
    if targets.is_empty() {
        return Err(DeployError::InvalidInput("target set is empty".into()));
    }

    let mut roots = Vec::with_capacity(targets.len());
    for target in targets {
        let target = target.as_ref();
        let position = registry
            .position(target)
            .ok_or_else(|| DeployError::UnknownArtifact(target.to_string()))?;
        roots.push(position);
    }
    roots.sort_unstable();
    roots.dedup();

    let artifacts = registry.list_artifacts();
    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut path: Vec<&str> = Vec::new();
    let mut order = Vec::new();

    for root in roots {
        visit(registry, &artifacts[root].name, &mut marks, &mut path, &mut order)?;
    }

    tracing::debug!(order = ?order, "resolved deployment plan");
    Ok(DeploymentPlan { order })
}

/// Plan the whole registry. Also serves as the up-front acyclicity check.
pub fn resolve_all(registry: &Registry) -> Result<DeploymentPlan> {
    let names: Vec<&str> = registry.names().collect();
    resolve(registry, &names)
}

fn visit<'a>(
    registry: &'a Registry,
    name: &'a str,
    marks: &mut HashMap<&'a str, Mark>,
    path: &mut Vec<&'a str>,
    order: &mut Vec<String>,
) -> Result<()> {
    match marks.get(name) {
        Some(Mark::Visited) => return Ok(()),
        Some(Mark::Visiting) => {
            let start = path.iter().position(|n| *n == name).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
            cycle.push(name.to_string());
            return Err(DeployError::CyclicDependency(cycle));
        }
        None => {}
    }

    let spec = registry.get_artifact(name)?;
    marks.insert(name, Mark::Visiting);
    path.push(name);

    for dependency in &spec.dependencies {
        visit(registry, dependency, marks, path, order)?;
    }

    path.pop();
    marks.insert(name, Mark::Visited);
    order.push(name.to_string());
    Ok(())
}
