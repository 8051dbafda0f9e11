mod client;
mod release;

use async_trait::async_trait;

use crate::core::error::LauncherResult;

pub use client::{requirement_allows, select_release, RegistryClient};
pub use release::{mod_file_name, DependencyDescriptor, Release, RequirementQuery};

/// Package metadata provider.
///
/// `Ok(None)` means the package exists but no release satisfies the
/// requirement for the queried game version.
#[async_trait]
pub trait PackageRegistry: Send + Sync {
    async fn find_release(
        &self,
        name: &str,
        requirement: &str,
        query: &RequirementQuery,
    ) -> LauncherResult<Option<Release>>;
}
