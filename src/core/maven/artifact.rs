use std::fmt;
use std::path::PathBuf;

use crate::core::error::{LauncherError, LauncherResult};

/// A library coordinate as launch descriptors write it:
/// `group:artifact:version[:classifier][@extension]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MavenArtifact {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    pub packaging: String,
}

impl MavenArtifact {
    /// ```
    /// use minepack_lib::core::maven::MavenArtifact;
    ///
    /// let a = MavenArtifact::parse("net.fabricmc:fabric-loader:0.6.1+build.164").unwrap();
    /// assert_eq!(a.group_id, "net.fabricmc");
    /// assert_eq!(a.version, "0.6.1+build.164");
    /// ```
    pub fn parse(coord: &str) -> LauncherResult<Self> {
        let invalid = || LauncherError::InvalidMavenCoordinate(coord.to_string());

        let (body, packaging) = match coord.rsplit_once('@') {
            Some((body, ext)) if !ext.is_empty() => (body, ext),
            Some(_) => return Err(invalid()),
            None => (coord, "jar"),
        };

        let mut parts = body.split(':');
        let mut next = || parts.next().filter(|p| !p.is_empty()).map(str::to_string);
        let (Some(group_id), Some(artifact_id), Some(version)) = (next(), next(), next()) else {
            return Err(invalid());
        };
        let classifier = next();
        if next().is_some() {
            return Err(invalid());
        }

        Ok(Self {
            group_id,
            artifact_id,
            version,
            classifier,
            packaging: packaging.to_string(),
        })
    }

    pub fn with_classifier(mut self, classifier: &str) -> Self {
        self.classifier = Some(classifier.to_string());
        self
    }

    /// `natives-<os>` archives are unpacked next to the game, never loaded.
    pub fn is_native(&self) -> bool {
        self.classifier
            .as_deref()
            .is_some_and(|c| c.starts_with("natives-"))
    }

    pub fn filename(&self) -> String {
        let classifier = self
            .classifier
            .as_deref()
            .map(|c| format!("-{c}"))
            .unwrap_or_default();
        format!(
            "{}-{}{}.{}",
            self.artifact_id, self.version, classifier, self.packaging
        )
    }

    /// Repository layout segments, shared by URLs and the libraries dir.
    fn segments(&self) -> Vec<String> {
        let mut segments: Vec<String> = self.group_id.split('.').map(str::to_string).collect();
        segments.push(self.artifact_id.clone());
        segments.push(self.version.clone());
        segments.push(self.filename());
        segments
    }

    pub fn url(&self, repo_base: &str) -> String {
        format!(
            "{}/{}",
            repo_base.trim_end_matches('/'),
            self.segments().join("/")
        )
    }

    /// Path under `libraries/`.
    pub fn local_path(&self) -> PathBuf {
        self.segments().into_iter().collect()
    }
}

impl fmt::Display for MavenArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        if self.packaging != "jar" {
            write!(f, "@{}", self.packaging)?;
        }
        Ok(())
    }
}
