// ─── Launch Manifest ───
// A version JSON as published by Mojang or a loader profile, OS rule
// evaluation for libraries and arguments, and parent merging.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::{MavenArtifact, MOJANG_LIBRARIES};
use crate::core::platform::{classifier_arch, Os};

/// Java release old descriptors (no `javaVersion`) run on.
const DEFAULT_JAVA_MAJOR: u32 = 8;

/// A parsed launch descriptor, possibly inheriting from a parent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LaunchManifest {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherits_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_class: Option<String>,
    /// Legacy `minecraftArguments` field (pre-1.13).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minecraft_arguments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Arguments>,
    #[serde(default)]
    pub libraries: Vec<Library>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_index: Option<AssetIndexInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jar: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub version_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<VersionDownloads>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_version: Option<JavaVersionInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersionInfo {
    pub major_version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionDownloads {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<DownloadArtifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<DownloadArtifact>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DownloadArtifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexInfo {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_size: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<Argument>,
    #[serde(default)]
    pub jvm: Vec<Argument>,
}

/// Either a bare string or a rule-gated value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Argument {
    Plain(String),
    Conditional {
        #[serde(default)]
        rules: Vec<Rule>,
        value: ArgumentValue,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ArgumentValue {
    Single(String),
    Many(Vec<String>),
}

// ─── Rules ───

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<OsRule>,
    /// Launcher features (`is_demo_user`, `has_custom_resolution`, …).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OsRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
}

impl Rule {
    /// No launcher feature is ever enabled, so feature-gated rules never match.
    fn matches(&self, os: Os) -> bool {
        if self.features.as_ref().is_some_and(|f| !f.is_empty()) {
            return false;
        }
        match &self.os {
            None => true,
            Some(rule) => {
                let name_ok = rule.name.as_deref().map_or(true, |n| n == os.descriptor_name());
                let arch_ok = rule
                    .arch
                    .as_deref()
                    .map_or(true, |a| a == "x86" && cfg!(target_arch = "x86"));
                name_ok && arch_ok
            }
        }
    }
}

/// Rules logic:
/// - no rules → allowed;
/// - otherwise start disallowed and let every matching rule set the state.
pub fn rules_allow(rules: &[Rule], os: Os) -> bool {
    if rules.is_empty() {
        return true;
    }
    let mut allowed = false;
    for rule in rules {
        if rule.matches(os) {
            allowed = rule.action == RuleAction::Allow;
        }
    }
    allowed
}

// ─── Libraries ───

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Library {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<LibraryDownloads>,
    /// OS name → classifier, e.g. `linux` → `natives-linux`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub natives: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<Rule>>,
    /// Maven repository base for libraries without explicit downloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LibraryDownloads {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<DownloadArtifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifiers: Option<BTreeMap<String, DownloadArtifact>>,
}

/// One concrete file a library contributes for a given OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryFile {
    /// Relative to the libraries directory.
    pub path: PathBuf,
    pub url: String,
    pub sha1: Option<String>,
    pub size: Option<u64>,
    /// Native archives are extracted, never put on the classpath.
    pub native: bool,
}

impl Library {
    pub fn applies_to(&self, os: Os) -> bool {
        self.rules.as_deref().map_or(true, |rules| rules_allow(rules, os))
    }

    /// Classifier of the native archive for `os`, `${arch}` substituted.
    pub fn native_classifier(&self, os: Os) -> Option<String> {
        self.natives
            .as_ref()?
            .get(os.descriptor_name())
            .map(|c| c.replace("${arch}", classifier_arch()))
    }

    /// Files this library needs on `os`: the main artifact and/or the native
    /// classifier archive.
    pub fn files(&self, os: Os) -> LauncherResult<Vec<LibraryFile>> {
        let mut files = Vec::new();
        let native_classifier = self.native_classifier(os);
        let explicit = self.downloads.as_ref();

        match explicit.and_then(|d| d.artifact.as_ref()) {
            Some(artifact) => files.push(self.explicit_file(artifact, None)?),
            // Old native-only entries list classifiers but no main artifact.
            None if explicit.and_then(|d| d.classifiers.as_ref()).is_some() => {}
            None => files.push(self.maven_file(None)?),
        }

        if let Some(classifier) = native_classifier {
            let listed = explicit
                .and_then(|d| d.classifiers.as_ref())
                .and_then(|c| c.get(&classifier));
            let file = match listed {
                Some(artifact) => self.explicit_file(artifact, Some(&classifier))?,
                None => self.maven_file(Some(&classifier))?,
            };
            files.push(LibraryFile {
                native: true,
                ..file
            });
        }

        Ok(files)
    }

    fn explicit_file(
        &self,
        artifact: &DownloadArtifact,
        classifier: Option<&str>,
    ) -> LauncherResult<LibraryFile> {
        let path = match &artifact.path {
            Some(path) => PathBuf::from(path),
            None => self.coordinate(classifier)?.local_path(),
        };
        Ok(LibraryFile {
            native: is_native_path(&path),
            path,
            url: artifact.url.clone(),
            sha1: artifact.sha1.clone(),
            size: artifact.size,
        })
    }

    fn maven_file(&self, classifier: Option<&str>) -> LauncherResult<LibraryFile> {
        let coordinate = self.coordinate(classifier)?;
        let repo = self.url.as_deref().unwrap_or(MOJANG_LIBRARIES);
        Ok(LibraryFile {
            native: coordinate.is_native(),
            path: coordinate.local_path(),
            url: coordinate.url(repo),
            sha1: None,
            size: None,
        })
    }

    fn coordinate(&self, classifier: Option<&str>) -> LauncherResult<MavenArtifact> {
        let coordinate = MavenArtifact::parse(&self.name)?;
        Ok(match classifier {
            Some(classifier) => coordinate.with_classifier(classifier),
            None => coordinate,
        })
    }
}

/// `…/lwjgl-3.3.1-natives-linux.jar` style paths are native archives.
fn is_native_path(path: &std::path::Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s.contains("-natives-"))
}

// ─── Manifest operations ───

impl LaunchManifest {
    pub fn from_json(raw: &str) -> LauncherResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Overlay `self` on `parent`: fields set here win, missing ones fall
    /// back to the parent. Libraries are concatenated child-first; structured
    /// arguments are appended to the parent's.
    pub fn merge_with(self, parent: LaunchManifest) -> LaunchManifest {
        let arguments = match (self.arguments, parent.arguments) {
            (Some(child), Some(mut base)) => {
                base.game.extend(child.game);
                base.jvm.extend(child.jvm);
                Some(base)
            }
            (child, base) => child.or(base),
        };

        let mut libraries = self.libraries;
        libraries.extend(parent.libraries);

        LaunchManifest {
            id: self.id,
            inherits_from: self.inherits_from,
            main_class: self.main_class.or(parent.main_class),
            minecraft_arguments: self.minecraft_arguments.or(parent.minecraft_arguments),
            arguments,
            libraries,
            asset_index: self.asset_index.or(parent.asset_index),
            assets: self.assets.or(parent.assets),
            jar: self.jar.or(parent.jar),
            version_type: self.version_type.or(parent.version_type),
            downloads: self.downloads.or(parent.downloads),
            java_version: self.java_version.or(parent.java_version),
        }
    }

    pub fn main_class(&self) -> LauncherResult<&str> {
        self.main_class
            .as_deref()
            .ok_or_else(|| LauncherError::Other(format!("{} declares no main class", self.id)))
    }

    /// Version whose jar is launched: `jar`, else the parent, else self.
    pub fn jar_target(&self) -> &str {
        self.jar
            .as_deref()
            .or(self.inherits_from.as_deref())
            .unwrap_or(&self.id)
    }

    /// Libraries that survive the OS rules.
    pub fn required_libraries(&self, os: Os) -> impl Iterator<Item = &Library> {
        self.libraries.iter().filter(move |lib| lib.applies_to(os))
    }

    /// Every library file needed on `os`, duplicates (same path) removed
    /// keeping the first, i.e. the child's, occurrence.
    pub fn library_files(&self, os: Os) -> LauncherResult<Vec<LibraryFile>> {
        let mut seen = std::collections::HashSet::new();
        let mut files = Vec::new();
        for lib in self.required_libraries(os) {
            for file in lib.files(os)? {
                if seen.insert(file.path.clone()) {
                    files.push(file);
                }
            }
        }
        Ok(files)
    }

    /// Asset index id: the referenced index, then `assets`, then `legacy`.
    pub fn asset_index_id(&self) -> &str {
        self.asset_index
            .as_ref()
            .map(|a| a.id.as_str())
            .or(self.assets.as_deref())
            .unwrap_or("legacy")
    }

    pub fn required_java_major(&self) -> u32 {
        self.java_version
            .as_ref()
            .map(|j| j.major_version)
            .unwrap_or(DEFAULT_JAVA_MAJOR)
    }

    pub fn version_type(&self) -> &str {
        self.version_type.as_deref().unwrap_or("release")
    }

    /// Game argument template for `os`, placeholders not yet substituted.
    pub fn game_args(&self, os: Os) -> Vec<String> {
        match &self.arguments {
            Some(args) if !args.game.is_empty() => expand_arguments(&args.game, os),
            _ => self
                .minecraft_arguments
                .as_deref()
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
        }
    }

    /// Descriptor-provided JVM argument template (empty for legacy versions).
    pub fn jvm_args(&self, os: Os) -> Vec<String> {
        self.arguments
            .as_ref()
            .map(|args| expand_arguments(&args.jvm, os))
            .unwrap_or_default()
    }
}

fn expand_arguments(arguments: &[Argument], os: Os) -> Vec<String> {
    let mut out = Vec::new();
    for argument in arguments {
        match argument {
            Argument::Plain(s) => out.push(s.clone()),
            Argument::Conditional { rules, value } => {
                if !rules_allow(rules, os) {
                    continue;
                }
                match value {
                    ArgumentValue::Single(s) => out.push(s.clone()),
                    ArgumentValue::Many(values) => out.extend(values.iter().cloned()),
                }
            }
        }
    }
    out
}
