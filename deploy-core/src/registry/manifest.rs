use super::{ArtifactSpec, ParamSlot, Registry};
use crate::error::{DeployError, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

pub const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
struct Manifest {
    version: u32,
    #[serde(default, rename = "artifact")]
    artifacts: Vec<ArtifactSpec>,
}

/// Parse a TOML registry manifest. An artifact without a `layout` takes its
/// dependency addresses first, then its static params, each in declared order:
///
/// ```toml
/// version = 1
///
/// [[artifact]]
/// name = "FoodTruck"
/// dependencies = ["HotDog"]
/// static_params = [{ string = "https://example.org/metadata" }]
/// layout = ["dep:0", "static:0"]
/// ```
pub fn parse_manifest(content: &str) -> Result<Registry> {
    let manifest: Manifest = toml::from_str(content)?;
    if manifest.version != MANIFEST_VERSION {
        return Err(DeployError::InvalidRegistry(format!(
            "unsupported manifest version {} (expected {})",
            manifest.version, MANIFEST_VERSION
        )));
    }
    if manifest.artifacts.is_empty() {
        return Err(DeployError::InvalidRegistry("manifest declares no artifacts".into()));
    }
    let artifacts = manifest
        .artifacts
        .into_iter()
        .map(|mut spec| {
            if spec.layout.is_empty() {
                spec.layout = (0..spec.dependencies.len())
                    .map(ParamSlot::Dependency)
                    .chain((0..spec.static_params.len()).map(ParamSlot::Static))
                    .collect();
            }
            spec
        })
        .collect();
    Registry::new(artifacts)
}

pub async fn load_manifest(path: &Path) -> Result<Registry> {
    let content = fs::read_to_string(path).await.map_err(|e| {
        DeployError::InvalidRegistry(format!("cannot read {}: {}", path.display(), e))
    })?;
    tracing::debug!(path = %path.display(), "loading registry manifest");
    parse_manifest(&content)
}
