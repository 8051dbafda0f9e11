use reqwest::Client;
use semver::{Version, VersionReq};
use serde::Deserialize;
use tracing::info;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::get_checked;
use crate::core::manifest::FabricLock;

pub const FABRIC_META_BASE: &str = "https://meta.fabricmc.net/v2";

/// Separator between game and loader version in fabric launch ids.
const LAUNCH_ID_SEPARATOR: &str = "-fabric-";

#[derive(Debug, Clone, Deserialize)]
pub struct LoaderListing {
    pub loader: MetaVersion,
    pub intermediary: MetaVersion,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetaVersion {
    pub version: String,
    #[serde(default)]
    pub stable: Option<bool>,
}

/// Client for fabric meta: loader listings and launch profiles.
pub struct FabricMeta {
    client: Client,
}

impl FabricMeta {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Raw launch profile JSON for a game/loader pair.
    pub async fn fetch_profile(&self, minecraft: &str, loader: &str) -> LauncherResult<String> {
        let url = format!(
            "{}/versions/loader/{}/{}/profile/json",
            FABRIC_META_BASE, minecraft, loader
        );
        info!("Fetching Fabric profile {} for Minecraft {}", loader, minecraft);
        Ok(get_checked(&self.client, &url).await?.text().await?)
    }

    /// Pick the loader matching `constraint` and pin it with its mappings.
    pub async fn resolve_lock(&self, minecraft: &str, constraint: &str) -> LauncherResult<FabricLock> {
        let url = format!("{}/versions/loader/{}", FABRIC_META_BASE, minecraft);
        let listings: Vec<LoaderListing> = get_checked(&self.client, &url).await?.json().await?;
        let picked = pick_loader(&listings, constraint).ok_or_else(|| {
            LauncherError::UnsupportedVersion {
                name: "fabric-loader".to_string(),
                requirement: format!("{constraint} (minecraft {minecraft})"),
            }
        })?;

        info!(
            "Pinned Fabric loader {} (mappings {})",
            picked.loader.version, picked.intermediary.version
        );
        Ok(FabricLock {
            minecraft: minecraft.to_string(),
            loader: picked.loader.version.clone(),
            mapping: picked.intermediary.version.clone(),
        })
    }
}

/// Listings come newest first; wildcards take the first stable one.
fn pick_loader<'a>(listings: &'a [LoaderListing], constraint: &str) -> Option<&'a LoaderListing> {
    let constraint = constraint.trim();
    if constraint.is_empty() || constraint == "*" || constraint == "latest" {
        return listings
            .iter()
            .find(|l| l.loader.stable.unwrap_or(true))
            .or_else(|| listings.first());
    }
    if let Some(exact) = listings.iter().find(|l| l.loader.version == constraint) {
        return Some(exact);
    }
    let req = VersionReq::parse(constraint).ok()?;
    listings.iter().find(|l| {
        Version::parse(&l.loader.version)
            .map(|v| req.matches(&v))
            .unwrap_or(false)
    })
}

/// `1.14.4-fabric-0.6.1` → (`1.14.4`, `0.6.1`)
pub fn split_launch_id(id: &str) -> Option<(&str, &str)> {
    id.split_once(LAUNCH_ID_SEPARATOR)
}

pub fn launch_id(minecraft: &str, loader: &str) -> String {
    format!("{minecraft}{LAUNCH_ID_SEPARATOR}{loader}")
}
