mod artifact;

pub use artifact::MavenArtifact;

/// Default repository for libraries that name no `url`.
pub const MOJANG_LIBRARIES: &str = "https://libraries.minecraft.net";
