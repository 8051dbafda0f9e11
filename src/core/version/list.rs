// ─── Version List ───
// Mojang's version manifest v2: every published game version and the URL
// of its launch descriptor.

use serde::Deserialize;
use tracing::info;

use crate::core::error::LauncherResult;
use crate::core::http::get_checked;

pub const VERSION_LIST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

#[derive(Debug, Deserialize)]
pub struct VersionList {
    pub latest: Option<LatestVersions>,
    pub versions: Vec<VersionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LatestVersions {
    pub release: String,
    pub snapshot: String,
}

/// A single entry in the list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    pub url: String,
    #[serde(default)]
    pub release_time: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
}

impl VersionList {
    pub async fn fetch(client: &reqwest::Client) -> LauncherResult<Self> {
        info!("Fetching Minecraft version list...");
        let list: VersionList = get_checked(client, VERSION_LIST_URL).await?.json().await?;
        info!("Loaded {} versions", list.versions.len());
        Ok(list)
    }

    /// Find a version by id; `latest` means the newest release.
    pub fn find_version(&self, id: &str) -> Option<&VersionEntry> {
        let id = match (id, &self.latest) {
            ("latest", Some(latest)) => latest.release.as_str(),
            _ => id,
        };
        self.versions.iter().find(|v| v.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_resolves_to_newest_release() {
        let list: VersionList = serde_json::from_value(serde_json::json!({
            "latest": {"release": "1.14.4", "snapshot": "19w34a"},
            "versions": [
                {"id": "19w34a", "type": "snapshot", "url": "https://example.com/19w34a.json"},
                {
                    "id": "1.14.4",
                    "type": "release",
                    "url": "https://example.com/1.14.4.json",
                    "releaseTime": "2019-07-19T09:25:47+00:00",
                    "sha1": "abc"
                }
            ]
        }))
        .unwrap();

        let entry = list.find_version("latest").unwrap();
        assert_eq!(entry.id, "1.14.4");
        assert_eq!(entry.release_time.as_deref(), Some("2019-07-19T09:25:47+00:00"));
        assert!(list.find_version("1.0-nope").is_none());
    }
}
