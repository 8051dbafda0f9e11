pub mod launch_manifest;
pub mod list;
pub mod store;

pub use launch_manifest::{
    rules_allow, Argument, ArgumentValue, Arguments, AssetIndexInfo, DownloadArtifact,
    JavaVersionInfo, LaunchManifest, Library, LibraryDownloads, LibraryFile, OsRule, Rule,
    RuleAction, VersionDownloads,
};
pub use list::{VersionEntry, VersionList, VERSION_LIST_URL};
pub use store::{DescriptorSource, HttpDescriptorSource, VersionStore};
