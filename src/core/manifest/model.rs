use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{LauncherError, LauncherResult};

use super::interpreted::InterpretedDependency;

pub const MANIFEST_FILE: &str = "minepack.toml";

/// Whether a package is a single mod or a launchable modpack.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    #[default]
    Mod,
    Modpack,
}

/// Mod loader a modpack runs on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoaderType {
    #[default]
    Vanilla,
    Fabric,
    Forge,
}

impl std::fmt::Display for LoaderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoaderType::Vanilla => write!(f, "vanilla"),
            LoaderType::Fabric => write!(f, "fabric"),
            LoaderType::Forge => write!(f, "forge"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PackageSection {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(rename = "type", default)]
    pub kind: PackageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Requirements {
    /// Target game version (e.g. `1.14.4`).
    pub minecraft: String,
    #[serde(default)]
    pub loader: LoaderType,
    /// Loader version constraint, `*` picks the newest.
    #[serde(default = "any_version")]
    pub loader_version: String,
}

impl Default for Requirements {
    fn default() -> Self {
        Self {
            minecraft: String::new(),
            loader: LoaderType::Vanilla,
            loader_version: any_version(),
        }
    }
}

fn any_version() -> String {
    "*".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DevSection {
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Hooks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
}

/// Project-level declaration persisted as `minepack.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Manifest {
    pub package: PackageSection,
    #[serde(default)]
    pub requirements: Requirements,
    /// name → version constraint or source (`https://…`, `none`, `provider:source`)
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "is_empty_dev")]
    pub dev: DevSection,
    #[serde(default, skip_serializing_if = "is_empty_hooks")]
    pub hooks: Hooks,
}

fn is_empty_dev(dev: &DevSection) -> bool {
    dev.dependencies.is_empty()
}

fn is_empty_hooks(hooks: &Hooks) -> bool {
    hooks.build.is_none()
}

impl Manifest {
    pub fn parse(raw: &str, origin: &Path) -> LauncherResult<Self> {
        toml::from_str(raw).map_err(|source| LauncherError::TomlParse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub async fn load(path: &Path) -> LauncherResult<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| LauncherError::io(path, e))?;
        Self::parse(&raw, path)
    }

    pub async fn save(&self, path: &Path) -> LauncherResult<()> {
        let raw = toml::to_string_pretty(self)?;
        tokio::fs::write(path, raw)
            .await
            .map_err(|e| LauncherError::io(path, e))
    }

    /// Add or replace a dependency entry.
    pub fn add_dependency(&mut self, name: &str, source: &str) {
        self.dependencies
            .insert(name.to_string(), source.to_string());
    }

    pub fn is_modpack(&self) -> bool {
        self.package.kind == PackageKind::Modpack
    }

    /// Regular dependencies classified by provider.
    pub fn interpreted_dependencies(&self) -> Vec<InterpretedDependency> {
        self.dependencies
            .iter()
            .map(|(name, source)| InterpretedDependency::interpret(name, source))
            .collect()
    }

    /// `[dev.dependencies]` classified by provider, flagged as dev.
    pub fn interpreted_dev_dependencies(&self) -> Vec<InterpretedDependency> {
        self.dev
            .dependencies
            .iter()
            .map(|(name, source)| InterpretedDependency::interpret(name, source).into_dev())
            .collect()
    }

    /// `name@version` used in log lines.
    pub fn describe(&self) -> String {
        if self.package.version.is_empty() {
            self.package.name.clone()
        } else {
            format!("{}@{}", self.package.name, self.package.version)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[package]
name = "skyblock-plus"
version = "1.2.0"
type = "modpack"

[requirements]
minecraft = "1.14.4"
loader = "fabric"

[dependencies]
fabric = "*"
sodium = "^0.2"
custom = "https://example.com/custom.jar"

[dev.dependencies]
modmenu = "latest"

[hooks]
build = "gradle build"
"#;

    #[test]
    fn parse_full_manifest() {
        let manifest = Manifest::parse(SAMPLE, Path::new("minepack.toml")).unwrap();
        assert!(manifest.is_modpack());
        assert_eq!(manifest.requirements.loader, LoaderType::Fabric);
        assert_eq!(manifest.requirements.loader_version, "*");
        assert_eq!(manifest.dependencies.len(), 3);
        assert_eq!(manifest.hooks.build.as_deref(), Some("gradle build"));
        assert_eq!(manifest.describe(), "skyblock-plus@1.2.0");

        let dev = manifest.interpreted_dev_dependencies();
        assert_eq!(dev.len(), 1);
        assert!(dev[0].is_dev);
    }

    #[test]
    fn broken_manifest_reports_path() {
        let err = Manifest::parse("[package", Path::new("/x/minepack.toml")).unwrap_err();
        assert!(matches!(err, LauncherError::TomlParse { path, .. } if path == Path::new("/x/minepack.toml")));
    }

    #[tokio::test]
    async fn save_then_load_keeps_added_dependency() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        let mut manifest = Manifest::parse(SAMPLE, &path).unwrap();
        manifest.add_dependency("lithium", "0.4.1");
        manifest.save(&path).await.unwrap();

        let loaded = Manifest::load(&path).await.unwrap();
        assert_eq!(loaded.dependencies.get("lithium").map(String::as_str), Some("0.4.1"));
        assert_eq!(loaded, manifest);
    }
}
