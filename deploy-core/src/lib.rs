pub mod registry;
pub mod resolver;
pub mod executor;
pub mod state;
pub mod verifier;
pub mod config;
pub mod error;
pub mod resilience;
pub mod observability;
pub mod security;
pub mod migrations;

pub use registry::{ArtifactSpec, ConstructorArg, ParamSlot, Registry};
pub use resolver::{resolve, resolve_all, DeploymentPlan};
pub use executor::{DeployCapability, Executor, RunReport};
pub use state::{DeploymentRecord, StateStore};
pub use verifier::{Finding, VerificationReport, Verifier};
pub use config::DeployConfig;
pub use error::{DeployError, Result};
