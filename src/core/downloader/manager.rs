use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info};

use crate::core::error::{LauncherError, LauncherResult};

use super::{DownloadEntry, Fetch};

/// Upper bound on jobs in flight at any moment.
pub const MAX_CONCURRENT_DOWNLOADS: usize = 16;

/// Receives integer percent-complete after every finished job.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// Bounded-parallel executor for a queue of downloads.
pub struct DownloadManager {
    queue: Vec<DownloadEntry>,
    fetcher: Arc<dyn Fetch>,
    concurrency: usize,
    on_progress: Option<ProgressFn>,
}

impl DownloadManager {
    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            queue: Vec::new(),
            fetcher,
            concurrency: MAX_CONCURRENT_DOWNLOADS,
            on_progress: None,
        }
    }

    pub fn with_progress(mut self, on_progress: ProgressFn) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn add(&mut self, entry: DownloadEntry) {
        self.queue.push(entry);
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = DownloadEntry>) {
        self.queue.extend(entries);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Run the whole queue.
    ///
    /// Returns on the first failure. Jobs already running at that point keep
    /// going in the background; jobs still waiting for a slot never start.
    pub async fn start(self) -> LauncherResult<()> {
        let total = self.queue.len();
        if total == 0 {
            return Ok(());
        }
        info!(
            "Starting download queue: {} files, concurrency={}",
            total, self.concurrency
        );

        let slots = Arc::new(Semaphore::new(self.concurrency));
        let (tx, mut rx) = mpsc::unbounded_channel();

        for entry in self.queue {
            let slots = slots.clone();
            let fetcher = self.fetcher.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                // Closed semaphore means the queue already failed.
                let Ok(_permit) = slots.acquire_owned().await else {
                    return;
                };
                let result = fetcher.fetch(&entry).await.map(|()| entry);
                let _ = tx.send(result);
            });
        }
        drop(tx);

        let mut completed = 0usize;
        while let Some(result) = rx.recv().await {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    slots.close();
                    return Err(e);
                }
            };
            completed += 1;
            debug!("[{}/{}] {:?}", completed, total, entry.dest);
            if let Some(on_progress) = &self.on_progress {
                on_progress((completed * 100 / total) as u8);
            }
        }

        if completed < total {
            return Err(LauncherError::Other(format!(
                "download queue stopped after {completed} of {total} files"
            )));
        }
        Ok(())
    }
}
