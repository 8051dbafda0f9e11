pub mod app_state;
pub mod paths;

pub use app_state::{LauncherContext, LauncherSettings};
pub use paths::DataPaths;
