// ─── Dependency Resolver ───
// Walks a manifest's dependency tree through the package registry into a
// deduplicated `ResolvedSet`. Each identifier is claimed under one lock
// before anything is fetched for it, so cycles and diamonds terminate and
// every package is looked up at most once.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures_util::future::{try_join_all, BoxFuture};
use futures_util::FutureExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::manifest::{InterpretedDependency, Manifest, Provider};
use crate::core::registry::{DependencyDescriptor, PackageRegistry, Release, RequirementQuery};

/// Result of a resolution: identifier → release, iterated in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSet {
    packages: BTreeMap<String, Release>,
}

impl ResolvedSet {
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Release)> {
        self.packages.iter()
    }

    pub fn releases(&self) -> impl Iterator<Item = &Release> {
        self.packages.values()
    }

    pub fn get(&self, id: &str) -> Option<&Release> {
        self.packages.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.packages.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl FromIterator<(String, Release)> for ResolvedSet {
    fn from_iter<I: IntoIterator<Item = (String, Release)>>(iter: I) -> Self {
        Self {
            packages: iter.into_iter().collect(),
        }
    }
}

/// `None` marks an identifier that is claimed but still in flight.
type ClaimMap = HashMap<String, Option<Release>>;

pub struct Resolver {
    registry: Arc<dyn PackageRegistry>,
    query: RequirementQuery,
    include_dev: bool,
    claimed: Arc<Mutex<ClaimMap>>,
}

impl Resolver {
    pub fn new(registry: Arc<dyn PackageRegistry>, query: RequirementQuery) -> Self {
        Self {
            registry,
            query,
            include_dev: false,
            claimed: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Also walk `[dev.dependencies]`.
    pub fn with_dev_dependencies(mut self, include_dev: bool) -> Self {
        self.include_dev = include_dev;
        self
    }

    pub async fn resolve_manifest(self, manifest: &Manifest) -> LauncherResult<ResolvedSet> {
        let mut entries = manifest.interpreted_dependencies();
        if self.include_dev {
            entries.extend(manifest.interpreted_dev_dependencies());
        }
        info!(
            "Resolving {} dependencies of {} (minecraft {}, {})",
            entries.len(),
            manifest.describe(),
            self.query.minecraft,
            self.query.loader
        );

        try_join_all(entries.into_iter().map(|entry| self.resolve_entry(entry))).await?;
        self.finish().await
    }

    /// Seed resolution from releases that were already fetched.
    pub async fn resolve_releases(self, releases: Vec<Release>) -> LauncherResult<ResolvedSet> {
        // Seeds are claimed up front so a transitive requirement on the same
        // package cannot win over the release that was asked for.
        let mut seeds = Vec::with_capacity(releases.len());
        for release in releases {
            if self.claim(&release.project).await {
                seeds.push(release);
            }
        }
        let this = &self;
        try_join_all(
            seeds
                .into_iter()
                .map(|release| this.resolve_release(release.project.clone(), release)),
        )
        .await?;
        self.finish().await
    }

    async fn resolve_entry(&self, entry: InterpretedDependency) -> LauncherResult<()> {
        match entry.provider {
            Provider::Registry => {
                self.resolve_dependency(DependencyDescriptor::new(&entry.name, &entry.source))
                    .await
            }
            Provider::DirectUrl => {
                if self.claim(&entry.name).await {
                    let release = Release::direct(&entry.name, &entry.source);
                    self.record(entry.name, release).await;
                }
                Ok(())
            }
            Provider::None => {
                debug!("Skipping placeholder dependency {}", entry.name);
                Ok(())
            }
            Provider::Other(provider) => Err(LauncherError::UnsupportedProvider {
                name: entry.name,
                provider,
            }),
        }
    }

    fn resolve_dependency(&self, dependency: DependencyDescriptor) -> BoxFuture<'_, LauncherResult<()>> {
        async move {
            if !self.claim(&dependency.name).await {
                return Ok(());
            }
            let release = dependency
                .resolve(self.registry.as_ref(), &self.query)
                .await?;
            debug!("{} -> {}", dependency.name, release.identifier());
            self.resolve_release(dependency.name, release).await
        }
        .boxed()
    }

    /// Record an already claimed release and resolve its children.
    async fn resolve_release(&self, id: String, release: Release) -> LauncherResult<()> {
        let children = release.dependencies.clone();
        self.record(id, release).await;
        try_join_all(
            children
                .into_iter()
                .map(|child| self.resolve_dependency(child)),
        )
        .await?;
        Ok(())
    }

    /// Returns false when someone else already owns `id`.
    async fn claim(&self, id: &str) -> bool {
        let mut claimed = self.claimed.lock().await;
        if claimed.contains_key(id) {
            return false;
        }
        claimed.insert(id.to_string(), None);
        true
    }

    async fn record(&self, id: String, release: Release) {
        self.claimed.lock().await.insert(id, Some(release));
    }

    async fn finish(self) -> LauncherResult<ResolvedSet> {
        let claimed = self.claimed.lock().await;
        let mut packages = BTreeMap::new();
        for (id, release) in claimed.iter() {
            let release = release
                .clone()
                .ok_or_else(|| LauncherError::Other(format!("resolution of {id} never finished")))?;
            packages.insert(id.clone(), release);
        }
        info!("Resolved {} packages", packages.len());
        Ok(ResolvedSet { packages })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;

    use super::*;
    use crate::core::manifest::LoaderType;
    use crate::core::registry::select_release;

    /// In-memory registry that counts lookups per package.
    #[derive(Default)]
    pub(crate) struct MockRegistry {
        releases: HashMap<String, Vec<Release>>,
        lookups: StdMutex<HashMap<String, usize>>,
        total: AtomicUsize,
    }

    impl MockRegistry {
        pub(crate) fn with(mut self, name: &str, version: &str, deps: &[&str]) -> Self {
            self.releases.entry(name.to_string()).or_default().push(Release {
                project: name.to_string(),
                version: version.to_string(),
                download_url: format!("https://cdn.example.com/{name}-{version}.jar"),
                dependencies: deps
                    .iter()
                    .map(|d| DependencyDescriptor::new(d, "*"))
                    .collect(),
                manifest: None,
            });
            self
        }

        pub(crate) fn with_release(mut self, release: Release) -> Self {
            self.releases
                .entry(release.project.clone())
                .or_default()
                .push(release);
            self
        }

        fn lookups_of(&self, name: &str) -> usize {
            self.lookups.lock().unwrap().get(name).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl PackageRegistry for MockRegistry {
        async fn find_release(
            &self,
            name: &str,
            requirement: &str,
            _query: &RequirementQuery,
        ) -> LauncherResult<Option<Release>> {
            *self.lookups.lock().unwrap().entry(name.to_string()).or_default() += 1;
            self.total.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            let releases = self
                .releases
                .get(name)
                .cloned()
                .ok_or_else(|| LauncherError::PackageNotFound {
                    name: name.to_string(),
                    requirement: requirement.to_string(),
                })?;
            select_release(name, releases, requirement)
        }
    }

    fn manifest(deps: &str) -> Manifest {
        let raw = format!(
            "[package]\nname = \"pack\"\ntype = \"modpack\"\n\n[requirements]\nminecraft = \"1.14.4\"\nloader = \"fabric\"\n\n[dependencies]\n{deps}"
        );
        Manifest::parse(&raw, Path::new("minepack.toml")).unwrap()
    }

    fn query() -> RequirementQuery {
        RequirementQuery::new("1.14.4", LoaderType::Fabric)
    }

    #[tokio::test]
    async fn cycle_terminates_and_resolves_each_once() {
        let registry = Arc::new(
            MockRegistry::default()
                .with("a", "1.0.0", &["b"])
                .with("b", "1.0.0", &["a"]),
        );
        let set = Resolver::new(registry.clone(), query())
            .resolve_manifest(&manifest("a = \"*\"\n"))
            .await
            .unwrap();

        assert_eq!(set.len(), 2);
        assert!(set.contains("a") && set.contains("b"));
        assert_eq!(registry.lookups_of("a"), 1);
        assert_eq!(registry.lookups_of("b"), 1);
    }

    #[tokio::test]
    async fn shared_child_is_looked_up_once() {
        let registry = Arc::new(
            MockRegistry::default()
                .with("a", "1.0.0", &["c"])
                .with("b", "1.0.0", &["c"])
                .with("c", "2.1.0", &[]),
        );
        let set = Resolver::new(registry.clone(), query())
            .resolve_manifest(&manifest("a = \"*\"\nb = \"*\"\n"))
            .await
            .unwrap();

        assert_eq!(set.len(), 3);
        assert_eq!(set.get("c").unwrap().version, "2.1.0");
        assert_eq!(registry.lookups_of("c"), 1);
        assert_eq!(registry.total.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn resolution_is_deterministic() {
        let build = || {
            Arc::new(
                MockRegistry::default()
                    .with("zeta", "1.0.0", &["alpha", "mid"])
                    .with("alpha", "1.0.0", &[])
                    .with("alpha", "1.2.0", &[])
                    .with("mid", "0.3.0", &["alpha"]),
            )
        };
        let deps = "zeta = \"*\"\nmid = \"^0.3\"\n";

        let first = Resolver::new(build(), query())
            .resolve_manifest(&manifest(deps))
            .await
            .unwrap();
        let second = Resolver::new(build(), query())
            .resolve_manifest(&manifest(deps))
            .await
            .unwrap();

        assert_eq!(first, second);
        let ids: Vec<&str> = first.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["alpha", "mid", "zeta"]);
        assert_eq!(first.get("alpha").unwrap().version, "1.2.0");
    }

    #[tokio::test]
    async fn direct_and_placeholder_entries() {
        let registry = Arc::new(MockRegistry::default());
        let set = Resolver::new(registry.clone(), query())
            .resolve_manifest(&manifest(
                "custom = \"https://example.com/custom.jar\"\nlater = \"none\"\n",
            ))
            .await
            .unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(set.get("custom").unwrap().download_url, "https://example.com/custom.jar");
        assert_eq!(registry.total.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_version_aborts_everything() {
        let registry = Arc::new(
            MockRegistry::default()
                .with("a", "1.0.0", &[])
                .with("b", "1.0.0", &[]),
        );
        let err = Resolver::new(registry, query())
            .resolve_manifest(&manifest("a = \"*\"\nb = \"^3\"\n"))
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::UnsupportedVersion { name, .. } if name == "b"));
    }

    #[tokio::test]
    async fn unknown_package_and_unknown_provider_fail() {
        let registry = Arc::new(MockRegistry::default().with("a", "1.0.0", &["ghost"]));
        let err = Resolver::new(registry.clone(), query())
            .resolve_manifest(&manifest("a = \"*\"\n"))
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::PackageNotFound { name, .. } if name == "ghost"));

        let err = Resolver::new(registry, query())
            .resolve_manifest(&manifest("thing = \"curse:1234\"\n"))
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::UnsupportedProvider { provider, .. } if provider == "curse"));
    }

    #[tokio::test]
    async fn seeded_releases_pull_in_children() {
        let registry = Arc::new(MockRegistry::default().with("beta", "1.0.0", &[]));
        let alpha = Release {
            project: "alpha".into(),
            version: "1.0.0".into(),
            download_url: "https://cdn.example.com/alpha.jar".into(),
            dependencies: vec![DependencyDescriptor::new("beta", "*")],
            manifest: None,
        };
        let set = Resolver::new(registry, query())
            .resolve_releases(vec![alpha])
            .await
            .unwrap();
        let ids: Vec<&str> = set.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["alpha", "beta"]);
    }
}
