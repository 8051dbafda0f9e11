use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::registry::{mod_file_name, requirement_allows, Release};
use crate::core::resolver::ResolvedSet;

use super::{Manifest, Provider};

pub const LOCKFILE_FILE: &str = "minepack-lock.toml";

/// Exact pin of one resolved package.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockedPackage {
    pub name: String,
    pub version: String,
    pub url: String,
}

impl LockedPackage {
    pub fn release(&self) -> Release {
        Release {
            project: self.name.clone(),
            version: self.version.clone(),
            download_url: self.url.clone(),
            dependencies: Vec::new(),
            manifest: None,
        }
    }

    pub fn file_name(&self) -> String {
        mod_file_name(&self.name, &self.version)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VanillaLock {
    pub minecraft: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FabricLock {
    pub minecraft: String,
    pub loader: String,
    pub mapping: String,
}

/// Snapshot of the last successful resolution plus loader pins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Lockfile {
    #[serde(default)]
    pub dependencies: BTreeMap<String, LockedPackage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vanilla: Option<VanillaLock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fabric: Option<FabricLock>,
}

impl Lockfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Ok(None)` when no lockfile has been written yet.
    pub async fn load(path: &Path) -> LauncherResult<Option<Self>> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LauncherError::io(path, e)),
        };
        let lockfile = toml::from_str(&raw).map_err(|source| LauncherError::TomlParse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(lockfile))
    }

    pub async fn save(&self, path: &Path) -> LauncherResult<()> {
        let raw = toml::to_string_pretty(self)?;
        tokio::fs::write(path, raw)
            .await
            .map_err(|e| LauncherError::io(path, e))
    }

    /// Replace every dependency pin with the given resolution.
    pub fn set_dependencies(&mut self, resolved: &ResolvedSet) {
        self.dependencies.clear();
        self.add_dependencies(resolved);
    }

    /// Add or overwrite the pins of a partial resolution.
    pub fn add_dependencies(&mut self, resolved: &ResolvedSet) {
        for (id, release) in resolved.iter() {
            self.dependencies.insert(
                id.clone(),
                LockedPackage {
                    name: release.project.clone(),
                    version: release.version.clone(),
                    url: release.download_url.clone(),
                },
            );
        }
    }

    /// The pinned packages as a resolution, as long as they still cover
    /// every entry of `manifest`. `None` means the manifest changed since
    /// the last resolution and the registry has to be asked again.
    pub fn locked_resolution(&self, manifest: &Manifest, include_dev: bool) -> Option<ResolvedSet> {
        let mut entries = manifest.interpreted_dependencies();
        if include_dev {
            entries.extend(manifest.interpreted_dev_dependencies());
        }

        for entry in &entries {
            let fresh = match &entry.provider {
                Provider::None => true,
                Provider::Registry => self
                    .dependencies
                    .get(&entry.name)
                    .is_some_and(|pin| requirement_allows(&entry.source, &pin.version)),
                Provider::DirectUrl => self
                    .dependencies
                    .get(&entry.name)
                    .is_some_and(|pin| pin.url == entry.source),
                Provider::Other(_) => false,
            };
            if !fresh {
                return None;
            }
        }

        Some(
            self.dependencies
                .iter()
                .map(|(id, pin)| (id.clone(), pin.release()))
                .collect(),
        )
    }

    /// Jar names of every pinned package inside `mods/`.
    pub fn mod_file_names(&self) -> BTreeSet<String> {
        self.dependencies.values().map(LockedPackage::file_name).collect()
    }

    /// Pinned game version, whichever loader pinned it.
    pub fn minecraft_version(&self) -> Option<&str> {
        if let Some(fabric) = &self.fabric {
            return Some(&fabric.minecraft);
        }
        self.vanilla.as_ref().map(|v| v.minecraft.as_str())
    }

    /// Id of the launch descriptor this lockfile points at
    /// (`1.14.4` or `1.14.4-fabric-0.6.1`).
    pub fn launch_manifest_id(&self) -> Option<String> {
        if let Some(fabric) = &self.fabric {
            return Some(format!("{}-fabric-{}", fabric.minecraft, fabric.loader));
        }
        self.vanilla.as_ref().map(|v| v.minecraft.clone())
    }
}
