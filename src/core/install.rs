// ─── Install workflow ───
// Resolve → download into mods/ → lockfile → manifest.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::info;

use crate::core::downloader::{DownloadManager, Fetch, ProgressFn};
use crate::core::error::LauncherResult;
use crate::core::instance::ProjectInstance;
use crate::core::registry::{DependencyDescriptor, PackageRegistry};
use crate::core::resolver::{ResolvedSet, Resolver};

pub struct Installer {
    registry: Arc<dyn PackageRegistry>,
    fetcher: Arc<dyn Fetch>,
    on_progress: Option<ProgressFn>,
    include_dev: bool,
}

impl Installer {
    pub fn new(registry: Arc<dyn PackageRegistry>, fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            registry,
            fetcher,
            on_progress: None,
            include_dev: false,
        }
    }

    /// Also install `[dev.dependencies]`.
    pub fn with_dev_dependencies(mut self, include_dev: bool) -> Self {
        self.include_dev = include_dev;
        self
    }

    pub fn with_progress(mut self, on_progress: ProgressFn) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    /// Install everything the manifest declares and rewrite the lockfile.
    pub async fn install_manifest(&self, project: &mut ProjectInstance) -> LauncherResult<ResolvedSet> {
        let previous = project.locked_mod_files();
        let resolved = project
            .update_lockfile_dependencies(self.registry.clone(), self.include_dev)
            .await?;
        self.commit(project, &resolved, &previous).await?;
        info!("Installed {} packages for {}", resolved.len(), project.manifest.describe());
        Ok(resolved)
    }

    /// Bring `mods/` in line with the lockfile before a launch. The registry
    /// is only asked when the manifest no longer matches the pins.
    pub async fn sync_manifest(&self, project: &mut ProjectInstance) -> LauncherResult<ResolvedSet> {
        let previous = project.locked_mod_files();
        let resolved = project
            .locked_dependencies(self.registry.clone(), self.include_dev)
            .await?;
        self.commit(project, &resolved, &previous).await?;
        Ok(resolved)
    }

    /// Install `name[@requirement]` packages and add them to the manifest.
    pub async fn install_packages(
        &self,
        project: &mut ProjectInstance,
        specs: &[String],
    ) -> LauncherResult<ResolvedSet> {
        let previous = project.locked_mod_files();
        let query = project.requirement_query();
        let mut releases = Vec::with_capacity(specs.len());
        for spec in specs {
            let descriptor = parse_package_spec(spec);
            let release = descriptor.resolve(self.registry.as_ref(), &query).await?;
            info!("Installing {}", release.identifier());
            releases.push(release);
        }

        let resolved = Resolver::new(self.registry.clone(), query)
            .resolve_releases(releases.clone())
            .await?;
        self.download(project, &resolved).await?;

        project
            .lockfile
            .get_or_insert_with(Default::default)
            .add_dependencies(&resolved);
        for (spec, release) in specs.iter().zip(&releases) {
            let requirement = manifest_requirement(&parse_package_spec(spec), &release.version);
            project.manifest.add_dependency(&release.project, &requirement);
        }
        project.save_lockfile().await?;
        project.save_manifest().await?;
        project.remove_superseded_mods(&previous).await?;
        Ok(resolved)
    }

    /// Download, persist the pins, then drop jars the pins no longer name.
    async fn commit(
        &self,
        project: &mut ProjectInstance,
        resolved: &ResolvedSet,
        previous: &BTreeSet<String>,
    ) -> LauncherResult<()> {
        self.download(project, resolved).await?;
        project.save_lockfile().await?;
        let removed = project.remove_superseded_mods(previous).await?;
        if removed > 0 {
            info!("Removed {} superseded mods", removed);
        }
        Ok(())
    }

    async fn download(&self, project: &ProjectInstance, resolved: &ResolvedSet) -> LauncherResult<()> {
        let mut queue = DownloadManager::new(self.fetcher.clone());
        if let Some(progress) = &self.on_progress {
            queue = queue.with_progress(progress.clone());
        }
        queue.extend(project.mod_downloads(resolved).await?);
        info!("Downloading {} mods", queue.len());
        queue.start().await
    }
}

/// `name`, `name@1.2.0` or `name@^1.2`.
pub fn parse_package_spec(spec: &str) -> DependencyDescriptor {
    match spec.split_once('@') {
        Some((name, requirement)) if !requirement.trim().is_empty() => {
            DependencyDescriptor::new(name.trim(), requirement.trim())
        }
        Some((name, _)) => DependencyDescriptor::new(name.trim(), "*"),
        None => DependencyDescriptor::new(spec.trim(), "*"),
    }
}

/// What goes into `[dependencies]`: the user's requirement, or a caret on
/// the installed version when none was given.
fn manifest_requirement(descriptor: &DependencyDescriptor, installed: &str) -> String {
    if descriptor.requirement != "*" {
        return descriptor.requirement.clone();
    }
    match semver::Version::parse(installed) {
        Ok(_) => format!("^{installed}"),
        Err(_) => installed.to_string(),
    }
}
