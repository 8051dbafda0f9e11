pub mod client;
pub mod manager;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::core::error::LauncherResult;

pub use client::HttpFetcher;
pub use manager::{DownloadManager, ProgressFn, MAX_CONCURRENT_DOWNLOADS};

/// A single file to download with optional SHA-1 for validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadEntry {
    pub url: String,
    pub dest: PathBuf,
    pub sha1: Option<String>,
    pub size: Option<u64>,
}

impl DownloadEntry {
    pub fn new(url: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            dest: dest.into(),
            sha1: None,
            size: None,
        }
    }

    pub fn with_sha1(mut self, sha1: Option<String>) -> Self {
        self.sha1 = sha1;
        self
    }

    pub fn with_size(mut self, size: Option<u64>) -> Self {
        self.size = size;
        self
    }
}

/// One download job. Swappable so the queue can be driven without a network.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, entry: &DownloadEntry) -> LauncherResult<()>;
}
