use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

/// Opaque per-provider secret storage.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn set(&self, provider: &str, data: &[u8]) -> LauncherResult<()>;
    async fn get(&self, provider: &str) -> LauncherResult<Option<Vec<u8>>>;
}

/// `credentials.json` in the data directory, readable by the owner only.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    async fn read_all(&self) -> LauncherResult<BTreeMap<String, String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(LauncherError::io(&self.path, e)),
        }
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn set(&self, provider: &str, data: &[u8]) -> LauncherResult<()> {
        let mut entries = self.read_all().await?;
        entries.insert(provider.to_string(), hex::encode(data));

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }
        let raw = serde_json::to_string_pretty(&entries)?;
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|e| LauncherError::io(&self.path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| LauncherError::io(&self.path, e))?;
        }
        debug!("Stored credentials for {}", provider);
        Ok(())
    }

    async fn get(&self, provider: &str) -> LauncherResult<Option<Vec<u8>>> {
        let entries = self.read_all().await?;
        entries
            .get(provider)
            .map(|encoded| {
                hex::decode(encoded).map_err(|e| {
                    LauncherError::Auth(format!("stored {provider} credentials are corrupt: {e}"))
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn values_survive_and_stay_separate() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));

        assert_eq!(store.get("microsoft").await.unwrap(), None);
        store.set("microsoft", b"{\"pn\":\"Steve\"}").await.unwrap();
        store.set("other", b"x").await.unwrap();

        assert_eq!(
            store.get("microsoft").await.unwrap().as_deref(),
            Some(&b"{\"pn\":\"Steve\"}"[..])
        );
        assert_eq!(store.get("other").await.unwrap().as_deref(), Some(&b"x"[..]));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(dir.path().join("credentials.json"))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
