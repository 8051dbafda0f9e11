pub mod arguments;
pub mod assembler;
pub mod classpath;
mod natives;

pub use assembler::{
    LaunchAssembler, LaunchOptions, PreparedLaunch, LAUNCHER_NAME, LAUNCHER_VERSION,
};
pub use classpath::{safe_path_str, ClasspathPlan};
pub use natives::extract_natives;
