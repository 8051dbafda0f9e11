pub mod fabric;

pub use fabric::{FabricMeta, FABRIC_META_BASE};
