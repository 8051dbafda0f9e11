use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::core::downloader::DownloadEntry;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::get_checked;
use crate::core::version::AssetIndexInfo;

const RESOURCES_URL: &str = "https://resources.download.minecraft.net";

/// Top-level asset index JSON structure.
#[derive(Debug, Deserialize)]
pub struct AssetIndex {
    pub objects: BTreeMap<String, AssetObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

impl AssetObject {
    /// `<xx>/<hash>`, the layout shared by the CDN and `assets/objects/`.
    fn relative(&self) -> Option<String> {
        let prefix = self.hash.get(..2)?;
        Some(format!("{}/{}", prefix, self.hash))
    }
}

impl AssetIndex {
    pub fn parse(raw: &str) -> LauncherResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Read `assets/indexes/<id>.json`, fetching it first when absent.
    pub async fn load_or_fetch(
        client: &reqwest::Client,
        info: &AssetIndexInfo,
        indexes_dir: &Path,
    ) -> LauncherResult<Self> {
        let index_path = indexes_dir.join(format!("{}.json", info.id));
        match tokio::fs::read_to_string(&index_path).await {
            Ok(raw) => return Self::parse(&raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(LauncherError::io(&index_path, e)),
        }

        info!("Fetching asset index {}", info.id);
        let raw = get_checked(client, &info.url).await?.text().await?;
        let index = Self::parse(&raw)?;

        tokio::fs::create_dir_all(indexes_dir)
            .await
            .map_err(|e| LauncherError::io(indexes_dir, e))?;
        tokio::fs::write(&index_path, &raw)
            .await
            .map_err(|e| LauncherError::io(&index_path, e))?;
        Ok(index)
    }

    /// Objects not yet present under `objects_dir`, as download jobs.
    pub async fn missing_objects(&self, objects_dir: &Path) -> LauncherResult<Vec<DownloadEntry>> {
        let mut entries = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for (name, object) in &self.objects {
            let Some(relative) = object.relative() else {
                warn!("Skipping asset {} with malformed hash {:?}", name, object.hash);
                continue;
            };
            // Several names can share one object.
            if !seen.insert(object.hash.clone()) {
                continue;
            }
            let dest: PathBuf = objects_dir.join(&relative);
            let present = tokio::fs::try_exists(&dest)
                .await
                .map_err(|e| LauncherError::io(&dest, e))?;
            if present {
                continue;
            }
            entries.push(
                DownloadEntry::new(format!("{}/{}", RESOURCES_URL, relative), dest)
                    .with_sha1(Some(object.hash.clone()))
                    .with_size(Some(object.size)),
            );
        }

        debug!(
            "{} asset objects missing ({} in index)",
            entries.len(),
            self.objects.len()
        );
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"{
        "objects": {
            "minecraft/sounds/a.ogg": {"hash": "aabbccddeeff00112233445566778899aabbccdd", "size": 3},
            "minecraft/sounds/b.ogg": {"hash": "0011223344556677889900112233445566778899", "size": 4},
            "minecraft/sounds/dup.ogg": {"hash": "0011223344556677889900112233445566778899", "size": 4}
        }
    }"#;

    #[tokio::test]
    async fn only_absent_objects_are_queued() {
        let dir = tempfile::tempdir().unwrap();
        let objects = dir.path().join("objects");
        let present = objects.join("aa/aabbccddeeff00112233445566778899aabbccdd");
        std::fs::create_dir_all(present.parent().unwrap()).unwrap();
        std::fs::write(&present, b"abc").unwrap();

        let index = AssetIndex::parse(INDEX).unwrap();
        let missing = index.missing_objects(&objects).await.unwrap();

        assert_eq!(missing.len(), 1);
        assert_eq!(
            missing[0].url,
            "https://resources.download.minecraft.net/00/0011223344556677889900112233445566778899"
        );
        assert_eq!(missing[0].dest, objects.join("00/0011223344556677889900112233445566778899"));
        assert_eq!(missing[0].size, Some(4));
    }

    #[tokio::test]
    async fn cached_index_is_read_without_network() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("1.14.json"), INDEX).unwrap();
        let info = AssetIndexInfo {
            id: "1.14".into(),
            url: "http://127.0.0.1:9/unreachable.json".into(),
            sha1: None,
            total_size: None,
        };
        let client = reqwest::Client::new();
        let index = AssetIndex::load_or_fetch(&client, &info, dir.path()).await.unwrap();
        assert_eq!(index.objects.len(), 3);
    }
}
