use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use semver::{Version, VersionReq};
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

use super::{PackageRegistry, Release, RequirementQuery};

/// HTTP client for the package registry API.
pub struct RegistryClient {
    client: Client,
    base_url: String,
}

impl RegistryClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn releases_url(&self, name: &str, query: &RequirementQuery) -> String {
        format!("{}/v1/releases/{}/{}", self.base_url, query.loader, name)
    }
}

#[async_trait]
impl PackageRegistry for RegistryClient {
    async fn find_release(
        &self,
        name: &str,
        requirement: &str,
        query: &RequirementQuery,
    ) -> LauncherResult<Option<Release>> {
        let url = self.releases_url(name, query);
        debug!("Registry lookup {}@{} -> {}", name, requirement, url);

        let response = self
            .client
            .get(&url)
            .query(&[("version", requirement), ("minecraft", query.minecraft.as_str())])
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LauncherError::PackageNotFound {
                name: name.to_string(),
                requirement: requirement.to_string(),
            });
        }
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url,
                status: status.as_u16(),
            });
        }

        let releases: Vec<Release> = response.json().await?;
        select_release(name, releases, requirement)
    }
}

/// Pick the newest release satisfying `requirement`.
///
/// `*`, `latest` and the empty string accept anything. A bare version
/// (`1.0.0`) is an exact pin; everything else is a semver requirement.
pub fn select_release(
    name: &str,
    releases: Vec<Release>,
    requirement: &str,
) -> LauncherResult<Option<Release>> {
    let requirement = requirement.trim();
    let matcher = Matcher::parse(name, requirement)?;

    let best = releases
        .into_iter()
        .filter_map(|release| {
            let parsed = Version::parse(&release.version).ok();
            matcher
                .accepts(&release.version, parsed.as_ref())
                .then_some((parsed, release))
        })
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, release)| release);

    Ok(best)
}

/// Whether an already pinned `version` still satisfies `requirement`.
/// Unparseable requirements never do, so they go back to the registry.
pub fn requirement_allows(requirement: &str, version: &str) -> bool {
    match Matcher::parse("", requirement.trim()) {
        Ok(matcher) => matcher.accepts(version, Version::parse(version).ok().as_ref()),
        Err(_) => false,
    }
}

enum Matcher {
    Any,
    Exact(String),
    Req(VersionReq),
}

impl Matcher {
    fn parse(name: &str, requirement: &str) -> LauncherResult<Self> {
        if requirement.is_empty() || requirement == "*" || requirement == "latest" {
            return Ok(Matcher::Any);
        }
        if Version::parse(requirement).is_ok() {
            return Ok(Matcher::Exact(requirement.to_string()));
        }
        VersionReq::parse(requirement)
            .map(Matcher::Req)
            .map_err(|source| LauncherError::InvalidRequirement {
                name: name.to_string(),
                requirement: requirement.to_string(),
                source,
            })
    }

    fn accepts(&self, raw: &str, parsed: Option<&Version>) -> bool {
        match self {
            Matcher::Any => true,
            Matcher::Exact(wanted) => raw == wanted,
            Matcher::Req(req) => parsed.is_some_and(|v| req.matches(v)),
        }
    }
}
