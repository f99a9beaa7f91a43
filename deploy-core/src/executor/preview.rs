use super::current_args;
use crate::error::{DeployError, Result};
use crate::registry::{ConstructorArg, Registry};
use crate::resolver::DeploymentPlan;
use crate::state::StateStore;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlannedAction {
    /// Never deployed.
    Deploy,
    /// Recorded with identical arguments; the recorded address is reused.
    Skip { address: String },
    /// Recorded, but its arguments changed or a redeploy was forced.
    Redeploy { previous: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedStep {
    pub name: String,
    #[serde(flatten)]
    pub action: PlannedAction,
    /// `None` while a dependency is still to be (re)deployed in this run.
    pub args: Option<Vec<ConstructorArg>>,
}

/// Predict what executing `plan` would do, without side effects.
pub async fn preview(
    registry: &Registry,
    store: &dyn StateStore,
    plan: &DeploymentPlan,
    force: &HashSet<String>,
) -> Result<Vec<PlannedStep>> {
    if let Some(stray) = force.iter().find(|n| !plan.contains(n)) {
        return Err(DeployError::InvalidInput(format!(
            "{} is marked for redeploy but is not in the plan",
            stray
        )));
    }

    let mut changing: HashSet<&str> = HashSet::new();
    let mut steps = Vec::with_capacity(plan.len());

    for name in plan.iter() {
        let spec = registry.get_artifact(name)?;
        let waits_on_change = spec.dependencies.iter().any(|d| changing.contains(d.as_str()));

        let args = if waits_on_change {
            None
        } else {
            Some(current_args(spec, store).await?)
        };

        let action = match (store.get(name).await?, &args) {
            (None, _) => PlannedAction::Deploy,
            (Some(existing), Some(args))
                if existing.constructor_args == *args && !force.contains(name) =>
            {
                PlannedAction::Skip {
                    address: existing.address,
                }
            }
            (Some(existing), _) => PlannedAction::Redeploy {
                previous: existing.address,
            },
        };

        if !matches!(action, PlannedAction::Skip { .. }) {
            changing.insert(name);
        }

        steps.push(PlannedStep {
            name: name.to_string(),
            action,
            args,
        });
    }

    Ok(steps)
}
