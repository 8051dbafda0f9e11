use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use sha1::{Digest, Sha1};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::get_checked;

use super::{DownloadEntry, Fetch};

/// Streams HTTP bodies to disk, SHA-1 validated when a hash is known.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    // ── Single file download ────────────────────────────

    /// Download `url` to `dest`, creating parent directories as needed.
    ///
    /// The body lands in `<dest>.part` and only replaces `dest` once the
    /// checksum matches.
    pub async fn download_file(
        &self,
        url: &str,
        dest: &Path,
        sha1_expected: Option<&str>,
    ) -> LauncherResult<u64> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }

        let response = get_checked(&self.client, url).await?;
        let mut body = response.bytes_stream();
        let mut hasher = Sha1::new();
        let mut written = 0u64;
        let part = part_path(dest);

        // Handle is dropped at the end of the block, before the rename.
        {
            let mut file = tokio::fs::File::create(&part)
                .await
                .map_err(|e| LauncherError::io(&part, e))?;
            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                hasher.update(&chunk);
                written += chunk.len() as u64;
                file.write_all(&chunk)
                    .await
                    .map_err(|e| LauncherError::io(&part, e))?;
            }
            file.flush().await.map_err(|e| LauncherError::io(&part, e))?;
        }

        if let Some(expected) = sha1_expected {
            let actual = hex::encode(hasher.finalize());
            if !actual.eq_ignore_ascii_case(expected) {
                let _ = tokio::fs::remove_file(&part).await;
                return Err(LauncherError::Sha1Mismatch {
                    path: dest.to_path_buf(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        tokio::fs::rename(&part, dest)
            .await
            .map_err(|e| LauncherError::io(dest, e))?;
        debug!("Downloaded: {} -> {:?} ({} bytes)", url, dest, written);
        Ok(written)
    }
}

/// `foo.jar` → `foo.jar.part`, next to the destination.
fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(OsString::from).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, entry: &DownloadEntry) -> LauncherResult<()> {
        let written = self
            .download_file(&entry.url, &entry.dest, entry.sha1.as_deref())
            .await?;
        if let Some(expected) = entry.size {
            if expected != written {
                debug!(
                    "Size differs for {:?}: expected {}, got {}",
                    entry.dest, expected, written
                );
            }
        }
        Ok(())
    }
}
