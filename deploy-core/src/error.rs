use thiserror::Error;
use sqlx::Error as SqlxError;
use reqwest::Error as ReqwestError;
use serde_json::Error as JsonError;
use std::io::Error as IoError;

use crate::executor::capability::CapabilityError;
use crate::migrations::MigrationError;
use crate::registry::ConstructorArg;

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Storage error: {0}")]
    Storage(#[from] SqlxError),

    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] JsonError),

    #[error("IO error: {0}")]
    Io(#[from] IoError),

    #[error("Manifest parse error: {0}")]
    Manifest(#[from] toml::de::Error),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),

    #[error("Unknown artifact: {0}")]
    UnknownArtifact(String),

    #[error("Cyclic dependency: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),

    #[error("Missing address for dependency {dependency} of {artifact}")]
    MissingDependencyAddress { artifact: String, dependency: String },

    #[error("Deployment of {artifact} failed with args {}: {source}", render_args(.args))]
    DeploymentCapabilityFailure {
        artifact: String,
        args: Vec<ConstructorArg>,
        #[source]
        source: CapabilityError,
    },

    #[error("{artifact} was deployed at {address} but could not be recorded ({source}); record it with `import {artifact} {address}`")]
    PersistFailed {
        artifact: String,
        address: String,
        #[source]
        source: Box<DeployError>,
    },

    #[error("State store is locked by run {holder}")]
    StoreLocked { holder: String },

    #[error("Invalid registry: {0}")]
    InvalidRegistry(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

fn render_args(args: &[ConstructorArg]) -> String {
    let parts: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

impl DeployError {
    /// Errors raised while validating input or the registry, before any side effect.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DeployError::UnknownArtifact(_)
                | DeployError::CyclicDependency(_)
                | DeployError::InvalidRegistry(_)
                | DeployError::InvalidConfig(_)
                | DeployError::InvalidInput(_)
                | DeployError::Manifest(_)
        )
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            e if e.is_configuration() => 2,
            DeployError::DeploymentCapabilityFailure { .. } => 3,
            DeployError::StoreLocked { .. } => 4,
            _ => 1,
        }
    }
}

impl From<anyhow::Error> for DeployError {
    fn from(err: anyhow::Error) -> Self {
        DeployError::Unknown(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(DeployError::UnknownArtifact("Ghost".into()).exit_code(), 2);
        assert_eq!(
            DeployError::CyclicDependency(vec!["A".into(), "B".into(), "A".into()]).exit_code(),
            2
        );
        assert_eq!(DeployError::StoreLocked { holder: "run".into() }.exit_code(), 4);
        assert_eq!(
            DeployError::MissingDependencyAddress {
                artifact: "FoodTruck".into(),
                dependency: "HotDog".into(),
            }
            .exit_code(),
            1
        );
        let failure = DeployError::DeploymentCapabilityFailure {
            artifact: "HotDog".into(),
            args: vec![],
            source: CapabilityError::Rejected("out of gas".into()),
        };
        assert_eq!(failure.exit_code(), 3);
    }

    #[test]
    fn test_cycle_message_names_path() {
        let err = DeployError::CyclicDependency(vec!["A".into(), "B".into(), "A".into()]);
        assert_eq!(err.to_string(), "Cyclic dependency: A -> B -> A");
    }
}
