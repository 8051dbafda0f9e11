// ─── Natives ───
// Native shared objects are unpacked into a directory that lives exactly as
// long as the launch session.

use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::platform::Os;

/// Extract every native library for `os` from `archives` into a fresh
/// temporary directory. The directory is removed when the returned handle
/// is dropped.
pub async fn extract_natives(archives: Vec<PathBuf>, os: Os) -> LauncherResult<TempDir> {
    let natives = tempfile::Builder::new()
        .prefix("minepack-natives-")
        .tempdir()
        .map_err(|e| LauncherError::io(std::env::temp_dir(), e))?;
    let dest = natives.path().to_path_buf();

    let extracted = tokio::task::spawn_blocking(move || -> LauncherResult<usize> {
        let mut count = 0;
        for archive in &archives {
            count += extract_archive(archive, &dest, os)?;
        }
        Ok(count)
    })
    .await
    .map_err(|e| LauncherError::Other(format!("Task join error: {}", e)))??;

    debug!("Extracted {} natives into {:?}", extracted, natives.path());
    Ok(natives)
}

fn extract_archive(archive: &Path, dest: &Path, os: Os) -> LauncherResult<usize> {
    let file = std::fs::File::open(archive).map_err(|e| LauncherError::io(archive, e))?;
    let mut zip = zip::ZipArchive::new(file)?;
    extract_from(&mut zip, dest, os)
}

fn extract_from<R: Read + Seek>(
    zip: &mut zip::ZipArchive<R>,
    dest: &Path,
    os: Os,
) -> LauncherResult<usize> {
    let mut count = 0;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        if name.starts_with("META-INF/") {
            continue;
        }
        // Newer archives nest natives under `<os>/<arch>/`; flatten them.
        let Some(file_name) = name.rsplit('/').next().filter(|n| !n.is_empty()) else {
            continue;
        };
        if !os.is_native_library(file_name) {
            continue;
        }

        let out_path = dest.join(file_name);
        let mut out = std::fs::File::create(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| LauncherError::io(&out_path, e))?;
        debug!("Extracted native: {}", name);
        count += 1;
    }
    Ok(count)
}
