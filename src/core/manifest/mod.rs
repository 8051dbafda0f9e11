pub mod interpreted;
pub mod lockfile;
pub mod model;

pub use interpreted::{InterpretedDependency, Provider};
pub use lockfile::{FabricLock, LockedPackage, Lockfile, VanillaLock, LOCKFILE_FILE};
pub use model::{LoaderType, Manifest, PackageKind, PackageSection, Requirements, MANIFEST_FILE};
