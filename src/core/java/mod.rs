pub mod runtime;

pub use runtime::{locate_java_binary, JavaRuntimeManager, RuntimeSpec};
