use serde::{Deserialize, Serialize};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::manifest::{LoaderType, Manifest};

use super::PackageRegistry;

/// Immutable remote descriptor of one resolvable package version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub project: String,
    pub version: String,
    pub download_url: String,
    #[serde(default)]
    pub dependencies: Vec<DependencyDescriptor>,
    /// The package's own `minepack.toml`, when the registry publishes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<Manifest>,
}

impl Release {
    /// Release for a dependency that points straight at an artifact URL.
    pub fn direct(name: &str, url: &str) -> Self {
        Self {
            project: name.to_string(),
            version: "direct".to_string(),
            download_url: url.to_string(),
            dependencies: Vec::new(),
            manifest: None,
        }
    }

    /// `project@version`
    pub fn identifier(&self) -> String {
        format!("{}@{}", self.project, self.version)
    }

    /// File name the artifact gets inside `mods/`.
    pub fn file_name(&self) -> String {
        mod_file_name(&self.project, &self.version)
    }
}

/// `<project>-<version>.jar`: a new version never collides with the jar it
/// replaces.
pub fn mod_file_name(project: &str, version: &str) -> String {
    format!("{project}-{version}.jar")
}

/// A dependency declared by a release, resolved on demand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DependencyDescriptor {
    pub name: String,
    #[serde(alias = "version", default = "any_requirement")]
    pub requirement: String,
}

fn any_requirement() -> String {
    "*".to_string()
}

impl DependencyDescriptor {
    pub fn new(name: &str, requirement: &str) -> Self {
        Self {
            name: name.to_string(),
            requirement: requirement.to_string(),
        }
    }

    /// Look this dependency up; a missing release is an unsupported version.
    pub async fn resolve(
        &self,
        registry: &dyn PackageRegistry,
        query: &RequirementQuery,
    ) -> LauncherResult<Release> {
        registry
            .find_release(&self.name, &self.requirement, query)
            .await?
            .ok_or_else(|| LauncherError::UnsupportedVersion {
                name: self.name.clone(),
                requirement: format!("{} (minecraft {})", self.requirement, query.minecraft),
            })
    }
}

/// Platform constraints sent along with every lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementQuery {
    pub minecraft: String,
    pub loader: LoaderType,
}

impl RequirementQuery {
    pub fn new(minecraft: &str, loader: LoaderType) -> Self {
        Self {
            minecraft: minecraft.to_string(),
            loader,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_json_accepts_version_alias_for_requirement() {
        let release: Release = serde_json::from_value(serde_json::json!({
            "project": "alpha",
            "version": "1.0.0",
            "downloadUrl": "https://cdn.example.com/alpha.jar",
            "dependencies": [
                {"name": "beta", "version": "*"},
                {"name": "gamma"}
            ]
        }))
        .unwrap();

        assert_eq!(release.identifier(), "alpha@1.0.0");
        assert_eq!(release.dependencies[0], DependencyDescriptor::new("beta", "*"));
        assert_eq!(release.dependencies[1].requirement, "*");
        assert_eq!(release.file_name(), "alpha-1.0.0.jar");
    }

    #[test]
    fn published_manifest_rides_along() {
        let release: Release = serde_json::from_value(serde_json::json!({
            "project": "skyblock",
            "version": "1.2.0",
            "downloadUrl": "https://cdn.example.com/skyblock.zip",
            "manifest": {
                "package": {"name": "skyblock", "version": "1.2.0", "type": "modpack"},
                "requirements": {"minecraft": "1.14.4", "loader": "fabric"},
                "dependencies": {"sodium": "^0.2"}
            }
        }))
        .unwrap();

        let manifest = release.manifest.unwrap();
        assert!(manifest.is_modpack());
        assert_eq!(manifest.requirements.loader, LoaderType::Fabric);
        assert_eq!(manifest.dependencies["sodium"], "^0.2");
    }
}
