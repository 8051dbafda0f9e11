// ─── Remote instances ───
// Packages launched by name: a published modpack gets a persistent instance
// under `instances/`, a single mod gets a throwaway modpack wrapped around it.

use std::path::PathBuf;

use tracing::info;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::install::parse_package_spec;
use crate::core::manifest::{LoaderType, Manifest, PackageKind, PackageSection, Requirements};
use crate::core::registry::{PackageRegistry, Release, RequirementQuery};
use crate::core::state::DataPaths;

/// Remote lookups only know fabric packages for now.
const REMOTE_LOADER: LoaderType = LoaderType::Fabric;

/// Find the newest release matching `name[@requirement]` for any game version.
pub async fn find_remote_release(registry: &dyn PackageRegistry, spec: &str) -> LauncherResult<Release> {
    let query = RequirementQuery::new("*", REMOTE_LOADER);
    let release = parse_package_spec(spec).resolve(registry, &query).await?;
    info!("Found {}", release.identifier());
    Ok(release)
}

/// The manifest a published modpack ships with.
pub fn modpack_manifest(release: &Release) -> LauncherResult<Manifest> {
    release
        .manifest
        .clone()
        .filter(Manifest::is_modpack)
        .ok_or_else(|| LauncherError::NotAModpack(release.identifier()))
}

/// `instances/<package>@<loader>`
pub fn remote_instance_dir(paths: &DataPaths, release: &Release, loader: LoaderType) -> PathBuf {
    paths
        .instances_dir()
        .join(format!("{}@{}", release.project, loader))
}

/// A modpack holding nothing but `release`, pinned to its exact version.
/// Game requirements come from the package's own manifest when it has one.
pub fn trial_manifest(release: &Release) -> Manifest {
    let minecraft = release
        .manifest
        .as_ref()
        .map(|m| m.requirements.minecraft.clone())
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "*".to_string());

    let mut manifest = Manifest {
        package: PackageSection {
            name: format!("try-{}", release.project),
            version: release.version.clone(),
            kind: PackageKind::Modpack,
            description: None,
            license: None,
        },
        requirements: Requirements {
            minecraft,
            loader: REMOTE_LOADER,
            loader_version: "*".to_string(),
        },
        ..Default::default()
    };
    manifest.add_dependency(&release.project, &release.version);
    manifest
}
