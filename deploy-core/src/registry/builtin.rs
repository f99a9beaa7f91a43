use super::{ArtifactSpec, ConstructorArg, Registry};
use crate::error::Result;

pub const METADATA_URL: &str = "https://my-nft-minter.vercel.app/api/metadata";
pub const UPGRADE_METADATA_URL: &str = "https://my-nft-minter.vercel.app/api/metadata/upgrade";

/// The HotDog game suite, wired as in the most complete full-suite rollout.
pub fn hotdog_suite() -> Result<Registry> {
    Registry::new(vec![
        ArtifactSpec::new("HotDog"),
        ArtifactSpec::new("FoodTruck")
            .depends_on("HotDog")
            .literal(ConstructorArg::String(METADATA_URL.to_string())),
        ArtifactSpec::new("Freezer").depends_on("HotDog"),
        ArtifactSpec::new("Employee").depends_on("HotDog"),
        ArtifactSpec::new("Juice"),
        ArtifactSpec::new("JuiceFountain"),
        ArtifactSpec::new("HotDoggeriaProgression").depends_on("Juice"),
        ArtifactSpec::new("Upgrade")
            .depends_on("HotDog")
            .depends_on("Juice")
            .literal(ConstructorArg::String(UPGRADE_METADATA_URL.to_string())),
        ArtifactSpec::new("HotDoggeria")
            .depends_on("FoodTruck")
            .depends_on("Upgrade")
            .depends_on("HotDog")
            .depends_on("Juice")
            .depends_on("Employee"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suite_is_valid() {
        let registry = hotdog_suite().unwrap();
        assert_eq!(registry.len(), 9);
        assert_eq!(registry.names().next(), Some("HotDog"));
    }

    #[test]
    fn test_hot_doggeria_wiring_order() {
        let registry = hotdog_suite().unwrap();
        let spec = registry.get_artifact("HotDoggeria").unwrap();
        assert_eq!(
            spec.dependencies,
            vec!["FoodTruck", "Upgrade", "HotDog", "Juice", "Employee"]
        );
    }
}
