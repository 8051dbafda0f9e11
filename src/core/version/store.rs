// ─── Version Store ───
// Obtains launch descriptors: from `versions/<id>/<id>.json` when cached,
// otherwise from a `DescriptorSource`, then merges the inheritance chain.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::get_checked;
use crate::core::loaders::fabric::{self, FabricMeta};
use crate::core::state::DataPaths;

use super::launch_manifest::LaunchManifest;
use super::list::VersionList;

/// Where uncached launch descriptors come from.
#[async_trait]
pub trait DescriptorSource: Send + Sync {
    /// Raw descriptor JSON for `id`.
    async fn fetch_descriptor(&self, id: &str) -> LauncherResult<String>;
}

/// Mojang version list for game versions, fabric meta for
/// `<mc>-fabric-<loader>` ids.
pub struct HttpDescriptorSource {
    client: Client,
    fabric: FabricMeta,
}

impl HttpDescriptorSource {
    pub fn new(client: Client) -> Self {
        Self {
            fabric: FabricMeta::new(client.clone()),
            client,
        }
    }
}

#[async_trait]
impl DescriptorSource for HttpDescriptorSource {
    async fn fetch_descriptor(&self, id: &str) -> LauncherResult<String> {
        if let Some((minecraft, loader)) = fabric::split_launch_id(id) {
            return self.fabric.fetch_profile(minecraft, loader).await;
        }

        let list = VersionList::fetch(&self.client).await?;
        let entry = list
            .find_version(id)
            .ok_or_else(|| LauncherError::NoVersion(id.to_string()))?;
        debug!("Fetching descriptor {} from {}", id, entry.url);
        Ok(get_checked(&self.client, &entry.url).await?.text().await?)
    }
}

pub struct VersionStore {
    paths: DataPaths,
    source: Arc<dyn DescriptorSource>,
}

impl VersionStore {
    pub fn new(paths: DataPaths, source: Arc<dyn DescriptorSource>) -> Self {
        Self { paths, source }
    }

    /// The descriptor for `id` with its whole parent chain merged in.
    pub async fn obtain(&self, id: &str) -> LauncherResult<LaunchManifest> {
        if id.trim().is_empty() {
            return Err(LauncherError::NoVersion(id.to_string()));
        }

        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(id.to_string());

        while let Some(current) = next {
            if !visited.insert(current.clone()) {
                return Err(LauncherError::InheritanceCycle(current));
            }
            let manifest = self.load_single(&current).await?;
            next = manifest.inherits_from.clone();
            chain.push(manifest);
        }

        // chain is child → root; fold from the root down.
        let mut merged = chain
            .pop()
            .ok_or_else(|| LauncherError::NoVersion(id.to_string()))?;
        while let Some(child) = chain.pop() {
            merged = child.merge_with(merged);
        }

        info!(
            "Launch descriptor {} ready ({} libraries)",
            merged.id,
            merged.libraries.len()
        );
        Ok(merged)
    }

    /// One descriptor, unmerged: cache first, then the source.
    async fn load_single(&self, id: &str) -> LauncherResult<LaunchManifest> {
        let cached = self.paths.version_json(id);
        match tokio::fs::read_to_string(&cached).await {
            Ok(raw) => {
                debug!("Using cached descriptor {:?}", cached);
                return LaunchManifest::from_json(&raw);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(LauncherError::io(&cached, e)),
        }

        let raw = self.source.fetch_descriptor(id).await?;
        let manifest = LaunchManifest::from_json(&raw)?;
        write_cache(&cached, &raw).await?;
        Ok(manifest)
    }
}

async fn write_cache(path: &Path, raw: &str) -> LauncherResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| LauncherError::io(parent, e))?;
    }
    tokio::fs::write(path, raw)
        .await
        .map_err(|e| LauncherError::io(path, e))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Serves descriptors from memory and counts requests.
    #[derive(Default)]
    pub(crate) struct StaticSource {
        pub(crate) descriptors: HashMap<String, serde_json::Value>,
        pub(crate) requests: AtomicUsize,
    }

    impl StaticSource {
        pub(crate) fn with(mut self, id: &str, json: serde_json::Value) -> Self {
            self.descriptors.insert(id.to_string(), json);
            self
        }
    }

    #[async_trait]
    impl DescriptorSource for StaticSource {
        async fn fetch_descriptor(&self, id: &str) -> LauncherResult<String> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            self.descriptors
                .get(id)
                .map(|v| v.to_string())
                .ok_or_else(|| LauncherError::NoVersion(id.to_string()))
        }
    }

    #[tokio::test]
    async fn chain_is_merged_and_cached() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path());
        let source = Arc::new(
            StaticSource::default()
                .with(
                    "1.14.4-fabric-0.6.1",
                    serde_json::json!({
                        "id": "fabric-loader-0.6.1-1.14.4",
                        "inheritsFrom": "1.14.4",
                        "mainClass": "net.fabricmc.loader.launch.knot.KnotClient",
                        "libraries": [{"name": "net.fabricmc:fabric-loader:0.6.1"}]
                    }),
                )
                .with(
                    "1.14.4",
                    serde_json::json!({
                        "id": "1.14.4",
                        "mainClass": "net.minecraft.client.main.Main",
                        "assets": "1.14",
                        "libraries": [{"name": "com.mojang:brigadier:1.0.17"}]
                    }),
                ),
        );
        let store = VersionStore::new(paths.clone(), source.clone());

        let merged = store.obtain("1.14.4-fabric-0.6.1").await.unwrap();
        assert_eq!(merged.main_class().unwrap(), "net.fabricmc.loader.launch.knot.KnotClient");
        assert_eq!(merged.libraries.len(), 2);
        assert_eq!(merged.asset_index_id(), "1.14");
        assert!(paths.version_json("1.14.4").exists());
        assert!(paths.version_json("1.14.4-fabric-0.6.1").exists());
        assert_eq!(source.requests.load(Ordering::SeqCst), 2);

        store.obtain("1.14.4-fabric-0.6.1").await.unwrap();
        assert_eq!(source.requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn descriptor_without_parent_is_returned_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let json = serde_json::json!({
            "id": "1.14.4",
            "type": "release",
            "mainClass": "net.minecraft.client.main.Main",
            "assets": "1.14",
            "minecraftArguments": "--username ${auth_player_name}",
            "libraries": [
                {"name": "com.mojang:brigadier:1.0.17"},
                {"name": "com.google.guava:guava:21.0"}
            ]
        });
        let expected = LaunchManifest::from_json(&json.to_string()).unwrap();
        let source = Arc::new(StaticSource::default().with("1.14.4", json));
        let store = VersionStore::new(DataPaths::new(dir.path()), source.clone());

        let obtained = store.obtain("1.14.4").await.unwrap();
        assert_eq!(obtained, expected);
        assert_eq!(source.requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn inheritance_cycle_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(
            StaticSource::default()
                .with("a", serde_json::json!({"id": "a", "inheritsFrom": "b"}))
                .with("b", serde_json::json!({"id": "b", "inheritsFrom": "a"})),
        );
        let store = VersionStore::new(DataPaths::new(dir.path()), source);
        let err = store.obtain("a").await.unwrap_err();
        assert!(matches!(err, LauncherError::InheritanceCycle(id) if id == "a"));
    }

    #[tokio::test]
    async fn empty_id_is_no_version() {
        let dir = tempfile::tempdir().unwrap();
        let store = VersionStore::new(DataPaths::new(dir.path()), Arc::new(StaticSource::default()));
        assert!(matches!(store.obtain(" ").await, Err(LauncherError::NoVersion(_))));
    }
}
