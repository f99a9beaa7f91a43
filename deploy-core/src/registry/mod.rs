pub mod builtin;
pub mod manifest;

pub use builtin::hotdog_suite;
pub use manifest::load_manifest;

use crate::error::{DeployError, Result};
use crate::security::validate_artifact_name;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// A literal constructor value, after any dependency address has been substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructorArg {
    Address(String),
    String(String),
    Uint(u64),
    Bool(bool),
}

impl ConstructorArg {
    /// Plain JSON form handed to the deployment capability.
    pub fn to_wire(&self) -> serde_json::Value {
        match self {
            ConstructorArg::Address(a) => serde_json::Value::String(a.clone()),
            ConstructorArg::String(s) => serde_json::Value::String(s.clone()),
            ConstructorArg::Uint(n) => serde_json::Value::from(*n),
            ConstructorArg::Bool(b) => serde_json::Value::Bool(*b),
        }
    }
}

impl fmt::Display for ConstructorArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructorArg::Address(a) => write!(f, "{}", a),
            ConstructorArg::String(s) => write!(f, "{:?}", s),
            ConstructorArg::Uint(n) => write!(f, "{}", n),
            ConstructorArg::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Position of one constructor parameter: the Nth dependency address or the Nth static value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ParamSlot {
    Dependency(usize),
    Static(usize),
}

impl FromStr for ParamSlot {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, index) = s
            .split_once(':')
            .ok_or_else(|| DeployError::InvalidRegistry(format!("bad layout slot '{}'", s)))?;
        let index: usize = index
            .trim()
            .parse()
            .map_err(|_| DeployError::InvalidRegistry(format!("bad layout index in '{}'", s)))?;
        match kind.trim() {
            "dep" => Ok(ParamSlot::Dependency(index)),
            "static" => Ok(ParamSlot::Static(index)),
            other => Err(DeployError::InvalidRegistry(format!(
                "unknown layout slot kind '{}'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for ParamSlot {
    type Error = DeployError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ParamSlot> for String {
    fn from(slot: ParamSlot) -> Self {
        match slot {
            ParamSlot::Dependency(i) => format!("dep:{}", i),
            ParamSlot::Static(i) => format!("static:{}", i),
        }
    }
}

/// Static description of one deployable artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSpec {
    pub name: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub static_params: Vec<ConstructorArg>,
    #[serde(default)]
    pub layout: Vec<ParamSlot>,
}

impl ArtifactSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            static_params: Vec::new(),
            layout: Vec::new(),
        }
    }

    /// Append a dependency address as the next constructor parameter.
    pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
        self.layout.push(ParamSlot::Dependency(self.dependencies.len()));
        self.dependencies.push(dependency.into());
        self
    }

    /// Append a literal as the next constructor parameter.
    pub fn literal(mut self, value: ConstructorArg) -> Self {
        self.layout.push(ParamSlot::Static(self.static_params.len()));
        self.static_params.push(value);
        self
    }

    /// Compute constructor arguments, looking each dependency address up through `address_of`.
    pub fn resolve_args<F>(&self, mut address_of: F) -> Result<Vec<ConstructorArg>>
    where
        F: FnMut(&str) -> Option<String>,
    {
        self.layout
            .iter()
            .map(|slot| match *slot {
                ParamSlot::Dependency(i) => {
                    let dependency = self.dependency_at(i)?;
                    address_of(dependency)
                        .map(ConstructorArg::Address)
                        .ok_or_else(|| DeployError::MissingDependencyAddress {
                            artifact: self.name.clone(),
                            dependency: dependency.to_string(),
                        })
                }
                ParamSlot::Static(i) => self.static_params.get(i).cloned().ok_or_else(|| {
                    DeployError::InvalidRegistry(format!(
                        "{}: layout references static param {} of {}",
                        self.name,
                        i,
                        self.static_params.len()
                    ))
                }),
            })
            .collect()
    }

    fn dependency_at(&self, index: usize) -> Result<&str> {
        self.dependencies.get(index).map(String::as_str).ok_or_else(|| {
            DeployError::InvalidRegistry(format!(
                "{}: layout references dependency {} of {}",
                self.name,
                index,
                self.dependencies.len()
            ))
        })
    }

    fn validate_layout(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for slot in &self.layout {
            match *slot {
                ParamSlot::Dependency(i) => {
                    self.dependency_at(i)?;
                }
                ParamSlot::Static(i) if i >= self.static_params.len() => {
                    return Err(DeployError::InvalidRegistry(format!(
                        "{}: layout references static param {} of {}",
                        self.name,
                        i,
                        self.static_params.len()
                    )));
                }
                ParamSlot::Static(_) => {}
            }
            if !seen.insert(*slot) {
                return Err(DeployError::InvalidRegistry(format!(
                    "{}: layout slot {} used twice",
                    self.name,
                    String::from(*slot)
                )));
            }
        }

        let expected = self.dependencies.len() + self.static_params.len();
        if seen.len() != expected {
            return Err(DeployError::InvalidRegistry(format!(
                "{}: layout covers {} of {} parameters",
                self.name,
                seen.len(),
                expected
            )));
        }

        let mut deps = HashSet::new();
        for dependency in &self.dependencies {
            if !deps.insert(dependency.as_str()) {
                return Err(DeployError::InvalidRegistry(format!(
                    "{}: dependency {} listed twice",
                    self.name, dependency
                )));
            }
        }

        Ok(())
    }
}

/// Read-only set of artifacts, in declaration order.
#[derive(Debug, Clone)]
pub struct Registry {
    artifacts: Vec<ArtifactSpec>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Build a registry, rejecting duplicate names, bad layouts and unregistered dependencies.
    /// Cycles are left to the resolver, which can name the offending path.
    pub fn new(artifacts: Vec<ArtifactSpec>) -> Result<Self> {
        let mut index = HashMap::with_capacity(artifacts.len());
        for (position, spec) in artifacts.iter().enumerate() {
            validate_artifact_name(&spec.name)
                .map_err(|e| DeployError::InvalidRegistry(format!("{}: {}", spec.name, e)))?;
            if index.insert(spec.name.clone(), position).is_some() {
                return Err(DeployError::InvalidRegistry(format!(
                    "artifact {} declared twice",
                    spec.name
                )));
            }
        }

        for spec in &artifacts {
            spec.validate_layout()?;
            if let Some(missing) = spec.dependencies.iter().find(|d| !index.contains_key(*d)) {
                return Err(DeployError::UnknownArtifact(missing.clone()));
            }
        }

        Ok(Self { artifacts, index })
    }

    pub fn list_artifacts(&self) -> &[ArtifactSpec] {
        &self.artifacts
    }

    pub fn get_artifact(&self, name: &str) -> Result<&ArtifactSpec> {
        self.index
            .get(name)
            .map(|&i| &self.artifacts[i])
            .ok_or_else(|| DeployError::UnknownArtifact(name.to_string()))
    }

    /// Declaration position, used as the resolver's tie-break.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.artifacts.iter().map(|a| a.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}
