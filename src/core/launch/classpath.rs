// ─── Classpath Builder ───
// Turns the resolved library files of a launch descriptor into the `-cp`
// value and the list of native archives to extract.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::platform::Os;
use crate::core::version::LibraryFile;

/// Library files split by how the JVM consumes them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClasspathPlan {
    /// Jars in classpath order, the game jar last.
    pub entries: Vec<PathBuf>,
    /// Native archives, extracted instead of put on the classpath.
    pub native_archives: Vec<PathBuf>,
}

impl ClasspathPlan {
    pub fn new(files: &[LibraryFile], libraries_dir: &Path, game_jar: &Path) -> Self {
        let mut plan = ClasspathPlan::default();
        for file in files {
            let path = libraries_dir.join(&file.path);
            if file.native {
                plan.native_archives.push(path);
            } else {
                plan.entries.push(path);
            }
        }
        plan.entries.push(game_jar.to_path_buf());

        debug!(
            "Classpath: {} entries, {} native archives",
            plan.entries.len(),
            plan.native_archives.len()
        );
        plan
    }

    /// Entries joined with the OS separator.
    pub fn join(&self, os: Os) -> String {
        self.entries
            .iter()
            .map(|p| safe_path_str(p))
            .collect::<Vec<_>>()
            .join(os.classpath_separator())
    }
}

/// Convert path to string, without the `\\?\` prefix on Windows.
pub fn safe_path_str(path: &Path) -> String {
    let resolved = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let text = resolved.to_string_lossy().to_string();

    #[cfg(target_os = "windows")]
    {
        // Java reports ClassNotFoundException for extended-length paths.
        if let Some(stripped) = text.strip_prefix(r"\\?\") {
            return stripped.to_string();
        }
    }

    text
}
