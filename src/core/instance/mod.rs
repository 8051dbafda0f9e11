pub mod project;
pub mod remote;
pub mod server;

pub use project::ProjectInstance;
pub use remote::{find_remote_release, modpack_manifest, remote_instance_dir, trial_manifest};
pub use server::{accept_eula, OfflineModeGuard, ServerProperties};
