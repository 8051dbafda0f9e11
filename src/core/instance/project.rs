use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::core::downloader::DownloadEntry;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::loaders::FabricMeta;
use crate::core::manifest::{
    FabricLock, LoaderType, Lockfile, Manifest, VanillaLock, LOCKFILE_FILE, MANIFEST_FILE,
};
use crate::core::registry::{PackageRegistry, RequirementQuery};
use crate::core::resolver::{ResolvedSet, Resolver};
use crate::core::version::VersionList;

/// A directory holding `minepack.toml`, its lockfile and the mods it pulls in.
#[derive(Debug, Clone)]
pub struct ProjectInstance {
    pub dir: PathBuf,
    pub manifest: Manifest,
    pub lockfile: Option<Lockfile>,
}

impl ProjectInstance {
    /// Load the project in `dir`. No manifest there means no instance.
    pub async fn detect(dir: &Path) -> LauncherResult<Self> {
        let manifest_path = dir.join(MANIFEST_FILE);
        if !tokio::fs::try_exists(&manifest_path)
            .await
            .map_err(|e| LauncherError::io(&manifest_path, e))?
        {
            return Err(LauncherError::InstanceNotFound(dir.to_path_buf()));
        }

        let manifest = Manifest::load(&manifest_path).await?;
        let lockfile = Lockfile::load(&dir.join(LOCKFILE_FILE)).await?;
        debug!(
            "Detected {} in {:?} (lockfile: {})",
            manifest.describe(),
            dir,
            lockfile.is_some()
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            manifest,
            lockfile,
        })
    }

    /// Write `manifest` into `dir` and open it as a project. A lockfile left
    /// there by an earlier run is kept.
    pub async fn create(dir: &Path, manifest: Manifest) -> LauncherResult<Self> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| LauncherError::io(dir, e))?;
        let lockfile = Lockfile::load(&dir.join(LOCKFILE_FILE)).await?;
        let project = Self {
            dir: dir.to_path_buf(),
            manifest,
            lockfile,
        };
        project.save_manifest().await?;
        Ok(project)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    pub fn lockfile_path(&self) -> PathBuf {
        self.dir.join(LOCKFILE_FILE)
    }

    pub fn mods_dir(&self) -> PathBuf {
        self.dir.join("mods")
    }

    pub async fn save_manifest(&self) -> LauncherResult<()> {
        self.manifest.save(&self.manifest_path()).await
    }

    pub async fn save_lockfile(&self) -> LauncherResult<()> {
        match &self.lockfile {
            Some(lock) => lock.save(&self.lockfile_path()).await,
            None => Ok(()),
        }
    }

    /// Only modpacks are launchable, and forge ones are not.
    pub fn ensure_launchable(&self) -> LauncherResult<()> {
        if !self.manifest.is_modpack() {
            return Err(LauncherError::NotAModpack(self.manifest.describe()));
        }
        if self.manifest.requirements.loader == LoaderType::Forge {
            return Err(LauncherError::UnsupportedLoader(LoaderType::Forge.to_string()));
        }
        Ok(())
    }

    /// Game version and loader releases are looked up for.
    pub fn requirement_query(&self) -> RequirementQuery {
        let minecraft = self
            .lockfile
            .as_ref()
            .and_then(|l| l.minecraft_version())
            .unwrap_or(&self.manifest.requirements.minecraft);
        RequirementQuery::new(minecraft, self.manifest.requirements.loader)
    }

    /// Launch descriptor id pinned by the lockfile.
    pub fn launch_manifest_id(&self) -> LauncherResult<String> {
        self.lockfile
            .as_ref()
            .and_then(|l| l.launch_manifest_id())
            .ok_or_else(|| LauncherError::NoVersion(self.manifest.requirements.minecraft.clone()))
    }

    /// Pin the game version and loader. Existing pins that still satisfy the
    /// requirements are kept without asking the network.
    pub async fn update_lockfile_requirements(&mut self, client: &reqwest::Client) -> LauncherResult<()> {
        let requirements = self.manifest.requirements.clone();
        let lock = self.lockfile.get_or_insert_with(Lockfile::new);

        match requirements.loader {
            LoaderType::Forge => {
                return Err(LauncherError::UnsupportedLoader(LoaderType::Forge.to_string()))
            }
            LoaderType::Vanilla => {
                let minecraft = pin_minecraft(client, &requirements.minecraft, lock).await?;
                lock.vanilla = Some(VanillaLock { minecraft });
                lock.fabric = None;
            }
            LoaderType::Fabric => {
                let minecraft = pin_minecraft(client, &requirements.minecraft, lock).await?;
                let keep = lock
                    .fabric
                    .as_ref()
                    .is_some_and(|pin| fabric_pin_satisfies(pin, &minecraft, &requirements.loader_version));
                if !keep {
                    let pin = FabricMeta::new(client.clone())
                        .resolve_lock(&minecraft, &requirements.loader_version)
                        .await?;
                    lock.fabric = Some(pin);
                }
                lock.vanilla = None;
            }
        }

        info!(
            "Requirements pinned: {}",
            lock.launch_manifest_id().unwrap_or_default()
        );
        Ok(())
    }

    /// Resolve every dependency and replace the lockfile pins with the result.
    pub async fn update_lockfile_dependencies(
        &mut self,
        registry: Arc<dyn PackageRegistry>,
        include_dev: bool,
    ) -> LauncherResult<ResolvedSet> {
        let resolved = Resolver::new(registry, self.requirement_query())
            .with_dev_dependencies(include_dev)
            .resolve_manifest(&self.manifest)
            .await?;
        self.lockfile
            .get_or_insert_with(Lockfile::new)
            .set_dependencies(&resolved);
        Ok(resolved)
    }

    /// The lockfile pins while they still cover the manifest; a fresh
    /// resolution otherwise.
    pub async fn locked_dependencies(
        &mut self,
        registry: Arc<dyn PackageRegistry>,
        include_dev: bool,
    ) -> LauncherResult<ResolvedSet> {
        let locked = self
            .lockfile
            .as_ref()
            .and_then(|lock| lock.locked_resolution(&self.manifest, include_dev));
        match locked {
            Some(resolved) => {
                debug!("Using {} locked packages", resolved.len());
                Ok(resolved)
            }
            None => {
                info!("Lockfile does not cover {}, resolving", self.manifest.describe());
                self.update_lockfile_dependencies(registry, include_dev).await
            }
        }
    }

    /// Jars of the current lockfile pins.
    pub fn locked_mod_files(&self) -> BTreeSet<String> {
        self.lockfile
            .as_ref()
            .map(Lockfile::mod_file_names)
            .unwrap_or_default()
    }

    /// Delete jars that were pinned in `previous` but no longer are.
    /// Jars minepack never installed are left alone.
    pub async fn remove_superseded_mods(&self, previous: &BTreeSet<String>) -> LauncherResult<usize> {
        let current = self.locked_mod_files();
        let mut removed = 0;
        for name in previous.difference(&current) {
            let path = self.mods_dir().join(name);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    debug!("Removed superseded {:?}", path);
                    removed += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(LauncherError::io(&path, e)),
            }
        }
        Ok(removed)
    }

    /// Downloads that place every resolved release into `mods/`, skipping
    /// jars that are already there.
    pub async fn mod_downloads(&self, resolved: &ResolvedSet) -> LauncherResult<Vec<DownloadEntry>> {
        let mods = self.mods_dir();
        let mut entries = Vec::new();
        for release in resolved.releases() {
            let dest = mods.join(release.file_name());
            if tokio::fs::try_exists(&dest)
                .await
                .map_err(|e| LauncherError::io(&dest, e))?
            {
                continue;
            }
            entries.push(DownloadEntry::new(release.download_url.clone(), dest));
        }
        Ok(entries)
    }
}

/// Exact versions are taken as they are; wildcards resolve to the latest
/// release unless the lockfile already pins one.
async fn pin_minecraft(
    client: &reqwest::Client,
    requirement: &str,
    lock: &Lockfile,
) -> LauncherResult<String> {
    let requirement = requirement.trim();
    if !matches!(requirement, "" | "*" | "latest") {
        return Ok(requirement.to_string());
    }
    if let Some(pinned) = lock.minecraft_version() {
        return Ok(pinned.to_string());
    }
    let list = VersionList::fetch(client).await?;
    list.find_version("latest")
        .map(|v| v.id.clone())
        .ok_or_else(|| LauncherError::NoVersion(requirement.to_string()))
}

fn fabric_pin_satisfies(pin: &FabricLock, minecraft: &str, constraint: &str) -> bool {
    if pin.minecraft != minecraft {
        return false;
    }
    let constraint = constraint.trim();
    if matches!(constraint, "" | "*" | "latest") || pin.loader == constraint {
        return true;
    }
    match (
        semver::VersionReq::parse(constraint),
        semver::Version::parse(&pin.loader),
    ) {
        (Ok(req), Ok(version)) => req.matches(&version),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::manifest::PackageKind;
    use crate::core::resolver::tests::MockRegistry;

    const MODPACK: &str = r#"
[package]
name = "alpha-pack"
version = "0.1.0"
type = "modpack"

[requirements]
minecraft = "1.14.4"
loader = "vanilla"

[dependencies]
alpha = "*"
"#;

    async fn project(raw: &str) -> (tempfile::TempDir, ProjectInstance) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), raw).unwrap();
        let project = ProjectInstance::detect(dir.path()).await.unwrap();
        (dir, project)
    }

    #[tokio::test]
    async fn directory_without_manifest_is_not_an_instance() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ProjectInstance::detect(dir.path()).await,
            Err(LauncherError::InstanceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn created_project_keeps_an_existing_lockfile() {
        let (dir, mut first) = project(MODPACK).await;
        first.update_lockfile_requirements(&reqwest::Client::new()).await.unwrap();
        first.save_lockfile().await.unwrap();

        let target = dir.path().join("nested");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::copy(first.lockfile_path(), target.join(LOCKFILE_FILE)).unwrap();

        let created = ProjectInstance::create(&target, first.manifest.clone()).await.unwrap();
        assert_eq!(created.lockfile, first.lockfile);
        let detected = ProjectInstance::detect(&target).await.unwrap();
        assert_eq!(detected.manifest, first.manifest);
    }

    #[tokio::test]
    async fn exact_vanilla_version_is_pinned_offline() {
        let (_dir, mut project) = project(MODPACK).await;
        // Unroutable client: an exact version must not touch the network.
        let client = reqwest::Client::new();
        project.update_lockfile_requirements(&client).await.unwrap();

        assert_eq!(project.launch_manifest_id().unwrap(), "1.14.4");
        project.save_lockfile().await.unwrap();
        let reloaded = ProjectInstance::detect(&project.dir).await.unwrap();
        assert_eq!(reloaded.lockfile, project.lockfile);
    }

    #[tokio::test]
    async fn satisfied_fabric_pin_is_kept() {
        let raw = MODPACK.replace("loader = \"vanilla\"", "loader = \"fabric\"");
        let (_dir, mut project) = project(&raw).await;
        let pin = FabricLock {
            minecraft: "1.14.4".into(),
            loader: "0.6.1+build.164".into(),
            mapping: "1.14.4".into(),
        };
        project.lockfile = Some(Lockfile {
            fabric: Some(pin.clone()),
            ..Lockfile::new()
        });

        project
            .update_lockfile_requirements(&reqwest::Client::new())
            .await
            .unwrap();
        assert_eq!(project.lockfile.as_ref().unwrap().fabric, Some(pin));
        assert_eq!(project.launch_manifest_id().unwrap(), "1.14.4-fabric-0.6.1+build.164");
    }

    #[test]
    fn fabric_pin_constraints() {
        let pin = FabricLock {
            minecraft: "1.14.4".into(),
            loader: "0.6.1".into(),
            mapping: "1.14.4".into(),
        };
        assert!(fabric_pin_satisfies(&pin, "1.14.4", "*"));
        assert!(fabric_pin_satisfies(&pin, "1.14.4", "0.6.1"));
        assert!(fabric_pin_satisfies(&pin, "1.14.4", "^0.6"));
        assert!(!fabric_pin_satisfies(&pin, "1.14.4", "^0.7"));
        assert!(!fabric_pin_satisfies(&pin, "1.15", "*"));
    }

    #[tokio::test]
    async fn forge_and_plain_mods_cannot_launch() {
        let (_dir, mut project) = project(MODPACK).await;
        assert!(project.ensure_launchable().is_ok());

        project.manifest.requirements.loader = LoaderType::Forge;
        assert!(matches!(
            project.ensure_launchable(),
            Err(LauncherError::UnsupportedLoader(_))
        ));
        assert!(matches!(
            project.update_lockfile_requirements(&reqwest::Client::new()).await,
            Err(LauncherError::UnsupportedLoader(_))
        ));

        project.manifest.requirements.loader = LoaderType::Vanilla;
        project.manifest.package.kind = PackageKind::Mod;
        assert!(matches!(
            project.ensure_launchable(),
            Err(LauncherError::NotAModpack(_))
        ));
    }

    #[tokio::test]
    async fn dependencies_are_locked_and_queued_once() {
        let (_dir, mut project) = project(MODPACK).await;
        let registry = Arc::new(
            MockRegistry::default()
                .with("alpha", "1.0.0", &["beta"])
                .with("beta", "2.0.0", &[]),
        );

        let resolved = project.update_lockfile_dependencies(registry, false).await.unwrap();
        let lock = project.lockfile.as_ref().unwrap();
        assert_eq!(lock.dependencies.len(), 2);
        assert_eq!(lock.dependencies["beta"].version, "2.0.0");

        std::fs::create_dir_all(project.mods_dir()).unwrap();
        std::fs::write(project.mods_dir().join("beta-2.0.0.jar"), b"jar").unwrap();
        let queued = project.mod_downloads(&resolved).await.unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].url, "https://cdn.example.com/alpha-1.0.0.jar");
        assert_eq!(queued[0].dest, project.mods_dir().join("alpha-1.0.0.jar"));
    }
}
