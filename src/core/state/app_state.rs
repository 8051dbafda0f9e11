use std::path::PathBuf;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::build_http_client;

use super::paths::DataPaths;

pub const DEFAULT_REGISTRY_URL: &str = "https://api.minepkg.io";
pub const DEFAULT_MS_CLIENT_ID: &str = "00000000402B5328";

/// User-tunable settings persisted as `<data>/settings.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherSettings {
    pub registry_url: String,
    pub microsoft_client_id: String,
    pub java_path: Option<PathBuf>,
    pub max_memory_mb: Option<u32>,
    pub server_port: u16,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            microsoft_client_id: DEFAULT_MS_CLIENT_ID.to_string(),
            java_path: None,
            max_memory_mb: None,
            server_port: 25565,
        }
    }
}

/// Explicit context handed to every component: data layout, shared HTTP
/// client and settings.
#[derive(Debug, Clone)]
pub struct LauncherContext {
    pub paths: DataPaths,
    pub http_client: Client,
    pub settings: LauncherSettings,
}

impl LauncherContext {
    pub fn new(paths: DataPaths) -> LauncherResult<Self> {
        paths.ensure_root()?;
        let settings = load_settings_from_disk(&paths).unwrap_or_default();
        let http_client = build_http_client()?;
        debug!("Data directory: {:?}", paths.root());

        let ctx = Self {
            paths,
            http_client,
            settings,
        };
        // First run: leave an editable settings file behind.
        if !ctx.paths.settings_file().exists() {
            ctx.save_settings()?;
        }
        Ok(ctx)
    }

    pub fn save_settings(&self) -> LauncherResult<()> {
        let path = self.paths.settings_file();
        let json = serde_json::to_string_pretty(&self.settings)?;
        std::fs::write(&path, json).map_err(|source| LauncherError::Io { path, source })
    }
}

fn load_settings_from_disk(paths: &DataPaths) -> Option<LauncherSettings> {
    let path = paths.settings_file();
    let raw = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(settings) => Some(settings),
        Err(err) => {
            warn!("Ignoring unreadable settings at {:?}: {}", path, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path());
        std::fs::write(paths.settings_file(), r#"{"server_port": 25570}"#).unwrap();

        let ctx = LauncherContext::new(paths).unwrap();
        assert_eq!(ctx.settings.server_port, 25570);
        assert_eq!(ctx.settings.registry_url, DEFAULT_REGISTRY_URL);
    }

    #[test]
    fn first_run_writes_default_settings() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path().join("fresh"));
        LauncherContext::new(paths.clone()).unwrap();

        let raw = std::fs::read_to_string(paths.settings_file()).unwrap();
        let saved: LauncherSettings = serde_json::from_str(&raw).unwrap();
        assert_eq!(saved.server_port, 25565);
    }

    #[test]
    fn settings_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = LauncherContext::new(DataPaths::new(dir.path())).unwrap();
        ctx.settings.max_memory_mb = Some(4096);
        ctx.save_settings().unwrap();

        let reloaded = LauncherContext::new(DataPaths::new(dir.path())).unwrap();
        assert_eq!(reloaded.settings.max_memory_mb, Some(4096));
    }
}
