use std::path::{Path, PathBuf};

use crate::core::error::{LauncherError, LauncherResult};

const APP_DIR_NAME: &str = "minepack";
const DATA_DIR_ENV: &str = "MINEPACK_DATA_DIR";

/// Layout of the global data directory shared by every instance.
///
/// ```text
/// <data>/libraries/
/// <data>/assets/{indexes,objects}/
/// <data>/versions/<id>/<id>.json|.jar
/// <data>/java/<version>/bin/java
/// <data>/instances/<package>@<loader>/
/// ```
#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `MINEPACK_DATA_DIR`, falling back to the OS data dir.
    pub fn from_env() -> Self {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                return Self::new(dir);
            }
        }
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join(APP_DIR_NAME))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn asset_indexes_dir(&self) -> PathBuf {
        self.assets_dir().join("indexes")
    }

    pub fn asset_objects_dir(&self) -> PathBuf {
        self.assets_dir().join("objects")
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    /// `versions/<id>/<id>.json`
    pub fn version_json(&self, id: &str) -> PathBuf {
        self.versions_dir().join(id).join(format!("{id}.json"))
    }

    /// `versions/<id>/<id>.jar`
    pub fn version_jar(&self, id: &str) -> PathBuf {
        self.versions_dir().join(id).join(format!("{id}.jar"))
    }

    pub fn java_dir(&self) -> PathBuf {
        self.root.join("java")
    }

    /// Home of modpacks launched by name instead of from a project dir.
    pub fn instances_dir(&self) -> PathBuf {
        self.root.join("instances")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    pub fn credentials_file(&self) -> PathBuf {
        self.root.join("credentials.json")
    }

    pub fn ensure_root(&self) -> LauncherResult<()> {
        std::fs::create_dir_all(&self.root).map_err(|source| LauncherError::Io {
            path: self.root.clone(),
            source,
        })
    }
}
