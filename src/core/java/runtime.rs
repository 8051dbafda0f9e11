use std::io::{Read, Seek};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use futures_util::StreamExt;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::get_checked;
use crate::core::platform::{runtime_arch, Os};

const ADOPTIUM_API_BASE: &str = "https://api.adoptium.net/v3/assets/latest";

#[derive(Debug, Clone, Deserialize)]
struct AdoptiumRelease {
    binary: AdoptiumBinary,
    version: AdoptiumVersion,
}

#[derive(Debug, Clone, Deserialize)]
struct AdoptiumBinary {
    package: AdoptiumPackage,
}

#[derive(Debug, Clone, Deserialize)]
struct AdoptiumPackage {
    checksum: String,
    link: String,
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct AdoptiumVersion {
    openjdk_version: String,
}

/// Archive to fetch for one Java major version.
#[derive(Debug, Clone)]
pub struct RuntimeSpec {
    pub major: u32,
    pub version: String,
    pub url: String,
    pub sha256: String,
}

/// Managed Java runtimes under `java/<major>/`.
pub struct JavaRuntimeManager {
    client: reqwest::Client,
    java_dir: PathBuf,
    os: Os,
}

impl JavaRuntimeManager {
    pub fn new(client: reqwest::Client, java_dir: PathBuf, os: Os) -> Self {
        Self {
            client,
            java_dir,
            os,
        }
    }

    pub fn runtime_dir(&self, major: u32) -> PathBuf {
        self.java_dir.join(major.to_string())
    }

    /// Path to `java` for `major`, downloading the runtime when missing.
    pub async fn ensure(&self, major: u32) -> LauncherResult<PathBuf> {
        let runtime_root = self.runtime_dir(major);
        if let Some(existing) = locate_java_binary(&runtime_root, self.os) {
            debug!("Using cached Java {} at {:?}", major, existing);
            return Ok(existing);
        }

        let spec = self.fetch_runtime_spec(major).await?;
        self.install(&spec).await
    }

    async fn fetch_runtime_spec(&self, major: u32) -> LauncherResult<RuntimeSpec> {
        let arch = runtime_arch();
        let api_url = format!(
            "{}/{}/hotspot?architecture={}&image_type=jre&os={}",
            ADOPTIUM_API_BASE,
            major,
            arch,
            self.os.runtime_name()
        );
        let releases: Vec<AdoptiumRelease> =
            get_checked(&self.client, &api_url).await?.json().await?;

        let ext = self.os.runtime_archive_ext();
        let found = releases
            .into_iter()
            .find(|r| r.binary.package.name.ends_with(ext))
            .ok_or_else(|| LauncherError::JavaNotFound {
                os: self.os.to_string(),
                arch: arch.clone(),
            })?;

        Ok(RuntimeSpec {
            major,
            version: found.version.openjdk_version,
            url: found.binary.package.link,
            sha256: found.binary.package.checksum,
        })
    }

    async fn install(&self, spec: &RuntimeSpec) -> LauncherResult<PathBuf> {
        let staging_id = Uuid::new_v4().to_string();
        let temp_dir = self.java_dir.join("temp");
        let archive_path = temp_dir.join(format!("{staging_id}.{}", self.os.runtime_archive_ext()));
        let staging_root = temp_dir.join(format!("{staging_id}_dir"));
        tokio::fs::create_dir_all(&temp_dir)
            .await
            .map_err(|e| LauncherError::io(&temp_dir, e))?;

        info!("Downloading Java {} ({}) from {}", spec.major, spec.version, spec.url);
        self.download_with_sha256(&spec.url, &archive_path, &spec.sha256)
            .await?;

        let os = self.os;
        let (archive, staging) = (archive_path.clone(), staging_root.clone());
        tokio::task::spawn_blocking(move || unpack_runtime(&archive, &staging, os))
            .await
            .map_err(|e| LauncherError::Other(format!("Task join error: {e}")))??;

        let runtime_root = self.runtime_dir(spec.major);
        if runtime_root.exists() {
            tokio::fs::remove_dir_all(&runtime_root)
                .await
                .map_err(|e| LauncherError::io(&runtime_root, e))?;
        }
        tokio::fs::rename(&staging_root, &runtime_root)
            .await
            .map_err(|e| LauncherError::io(&runtime_root, e))?;
        let _ = tokio::fs::remove_file(&archive_path).await;

        let java_bin = locate_java_binary(&runtime_root, self.os).ok_or_else(|| {
            LauncherError::JavaExecution(format!(
                "runtime archive for Java {} contained no {}",
                spec.major,
                self.os.java_exe()
            ))
        })?;
        ensure_executable(&java_bin)?;
        info!("Java {} installed at {:?}", spec.major, java_bin);
        Ok(java_bin)
    }

    async fn download_with_sha256(
        &self,
        url: &str,
        output_path: &Path,
        expected_sha256: &str,
    ) -> LauncherResult<()> {
        let response = get_checked(&self.client, url).await?;
        let mut stream = response.bytes_stream();
        let mut hasher = Sha256::new();
        {
            let mut file = tokio::fs::File::create(output_path)
                .await
                .map_err(|e| LauncherError::io(output_path, e))?;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                hasher.update(&chunk);
                file.write_all(&chunk)
                    .await
                    .map_err(|e| LauncherError::io(output_path, e))?;
            }
            file.flush()
                .await
                .map_err(|e| LauncherError::io(output_path, e))?;
        }
        verify_sha256(output_path, &hex::encode(hasher.finalize()), expected_sha256)
    }
}

fn verify_sha256(path: &Path, actual: &str, expected: &str) -> LauncherResult<()> {
    if actual.eq_ignore_ascii_case(expected) {
        return Ok(());
    }
    Err(LauncherError::Sha256Mismatch {
        path: path.to_path_buf(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    })
}

/// `bin/java`, or the macOS bundle layout `Contents/Home/bin/java`.
pub fn locate_java_binary(runtime_root: &Path, os: Os) -> Option<PathBuf> {
    let primary = runtime_root.join("bin").join(os.java_exe());
    if primary.is_file() {
        return Some(primary);
    }
    let mac_layout = runtime_root
        .join("Contents")
        .join("Home")
        .join("bin")
        .join(os.java_exe());
    if mac_layout.is_file() {
        return Some(mac_layout);
    }
    None
}

fn ensure_executable(java_bin: &Path) -> LauncherResult<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(java_bin, std::fs::Permissions::from_mode(0o755))
            .map_err(|e| LauncherError::io(java_bin, e))?;
    }
    #[cfg(not(unix))]
    let _ = java_bin;
    Ok(())
}

// ── Extraction ──────────────────────────────────────

/// Unpack a zip or tar.gz runtime into `dest`, dropping the archive's
/// top-level directory (`jdk8u222-b10-jre/`).
pub fn unpack_runtime(archive: &Path, dest: &Path, os: Os) -> LauncherResult<()> {
    if dest.exists() {
        std::fs::remove_dir_all(dest).map_err(|e| LauncherError::io(dest, e))?;
    }
    std::fs::create_dir_all(dest).map_err(|e| LauncherError::io(dest, e))?;

    let file = std::fs::File::open(archive).map_err(|e| LauncherError::io(archive, e))?;
    match os {
        Os::Windows => extract_zip(file, dest),
        Os::Linux | Os::Osx => extract_tar_gz(file, dest),
    }
}

fn extract_zip(reader: impl Read + Seek, dest: &Path) -> LauncherResult<()> {
    let mut archive = zip::ZipArchive::new(reader)?;
    for index in 0..archive.len() {
        let mut zipped = archive.by_index(index)?;
        let enclosed = zipped
            .enclosed_name()
            .ok_or_else(|| LauncherError::Other("Invalid zip entry path".into()))?;
        let Some(rel_path) = strip_top_level(&enclosed) else {
            continue;
        };

        let out_path = dest.join(rel_path);
        if zipped.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let mut out =
            std::fs::File::create(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
        std::io::copy(&mut zipped, &mut out).map_err(|e| LauncherError::io(&out_path, e))?;
    }
    Ok(())
}

fn extract_tar_gz(reader: impl Read, dest: &Path) -> LauncherResult<()> {
    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    let entries = archive.entries().map_err(|e| LauncherError::io(dest, e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| LauncherError::io(dest, e))?;
        let path = entry.path().map_err(|e| LauncherError::io(dest, e))?.into_owned();

        let unsafe_path = path.is_absolute()
            || path.components().any(|c| matches!(c, Component::ParentDir));
        if unsafe_path {
            return Err(LauncherError::Other(format!(
                "Unsafe path in runtime archive: {}",
                path.display()
            )));
        }
        let Some(rel_path) = strip_top_level(&path) else {
            continue;
        };

        let out_path = dest.join(rel_path);
        let kind = entry.header().entry_type();
        if kind.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
            continue;
        }
        if !kind.is_file() {
            // Symlinks in JRE tarballs point at files we extract anyway.
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let mut out =
            std::fs::File::create(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| LauncherError::io(&out_path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = entry.header().mode().unwrap_or(0o644);
            std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode))
                .map_err(|e| LauncherError::io(&out_path, e))?;
        }
    }
    Ok(())
}

/// Path without its first component; `None` for the top-level dir itself.
fn strip_top_level(path: &Path) -> Option<PathBuf> {
    let mut rel = PathBuf::new();
    for component in path.components().skip(1) {
        if let Component::Normal(part) = component {
            rel.push(part);
        }
    }
    (!rel.as_os_str().is_empty()).then_some(rel)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::write::GzEncoder;
    use flate2::Compression;

    use super::*;

    fn tarball(path: &Path, entries: &[(&str, &[u8], u32)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, data, mode) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(*mode);
            header.set_entry_type(tar::EntryType::Regular);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn tarball_is_unpacked_without_top_level_dir() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("jre.tar.gz");
        tarball(
            &archive,
            &[
                ("jdk8u222-b10-jre/bin/java", b"#!/bin/sh\n", 0o755),
                ("jdk8u222-b10-jre/lib/rt.jar", b"jar", 0o644),
            ],
        );

        let dest = dir.path().join("8");
        unpack_runtime(&archive, &dest, Os::Linux).unwrap();

        let java = locate_java_binary(&dest, Os::Linux).unwrap();
        assert_eq!(java, dest.join("bin/java"));
        assert!(dest.join("lib/rt.jar").is_file());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&java).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[test]
    fn zip_is_unpacked_without_top_level_dir() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("jre.zip");
        {
            let file = std::fs::File::create(&archive).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("jdk8u222-b10-jre/bin/java.exe", options).unwrap();
            writer.write_all(b"MZ").unwrap();
            writer.finish().unwrap();
        }

        let dest = dir.path().join("8");
        unpack_runtime(&archive, &dest, Os::Windows).unwrap();
        assert!(locate_java_binary(&dest, Os::Windows).is_some());
    }

    #[test]
    fn sha256_mismatch_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("jre.tar.gz");
        std::fs::write(&file, b"hello").unwrap();

        let actual = hex::encode(Sha256::digest(std::fs::read(&file).unwrap()));
        assert_eq!(
            actual,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert!(verify_sha256(&file, &actual, &actual.to_uppercase()).is_ok());
        assert!(matches!(
            verify_sha256(&file, &actual, "00"),
            Err(LauncherError::Sha256Mismatch { .. })
        ));
    }

    #[tokio::test]
    async fn cached_runtime_needs_no_network() {
        let dir = tempfile::tempdir().unwrap();
        let manager = JavaRuntimeManager::new(reqwest::Client::new(), dir.path().to_path_buf(), Os::Linux);
        let bin = manager.runtime_dir(8).join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("java"), b"").unwrap();

        let java = manager.ensure(8).await.unwrap();
        assert_eq!(java, bin.join("java"));
    }
}
