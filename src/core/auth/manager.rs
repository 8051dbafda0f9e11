use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::credentials::{Credentials, LaunchAuthData, StoredCredentials};
use super::microsoft::{AuthProvider, DeviceCodeCallback};
use super::store::CredentialStore;
use crate::core::error::{LauncherError, LauncherResult};

/// Key the Microsoft credentials live under in the store.
pub const MICROSOFT_PROVIDER: &str = "microsoft";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    LoggedOut,
    LoggedIn { player_name: String, expired: bool },
}

/// Owns the current credentials and keeps the store in sync with them.
pub struct AuthManager {
    provider: Arc<dyn AuthProvider>,
    store: Arc<dyn CredentialStore>,
    cached: Mutex<Option<Credentials>>,
}

impl AuthManager {
    pub fn new(provider: Arc<dyn AuthProvider>, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            provider,
            store,
            cached: Mutex::new(None),
        }
    }

    /// Load persisted credentials, if any. A corrupt entry counts as logged out.
    pub async fn restore(&self) -> LauncherResult<bool> {
        let Some(raw) = self.store.get(MICROSOFT_PROVIDER).await? else {
            return Ok(false);
        };
        match serde_json::from_slice::<StoredCredentials>(&raw) {
            Ok(stored) => {
                let creds = stored.restore();
                debug!("Restored credentials for {}", creds.profile.name);
                *self.cached.lock().await = Some(creds);
                Ok(true)
            }
            Err(e) => {
                warn!("Ignoring unreadable stored credentials: {}", e);
                Ok(false)
            }
        }
    }

    /// Interactive device code login followed by the full exchange.
    pub async fn prompt(&self, on_code: DeviceCodeCallback) -> LauncherResult<LaunchAuthData> {
        let token = self.provider.login(on_code).await?;
        let creds = self.provider.exchange(&token).await?;
        self.persist(&creds).await?;
        let data = creds.launch_data();
        *self.cached.lock().await = Some(creds);
        Ok(data)
    }

    /// Credentials for a launch, refreshed first when they have expired.
    pub async fn launch_auth_data(&self) -> LauncherResult<LaunchAuthData> {
        let mut cached = self.cached.lock().await;
        let creds = cached.as_ref().ok_or(LauncherError::MissingCredentials)?;

        let now = Utc::now();
        if !creds.is_expired(now) {
            return Ok(creds.launch_data());
        }

        info!("Minecraft token expired, refreshing");
        let oauth = if creds.oauth.is_expired(now) {
            self.provider.refresh(&creds.oauth).await?
        } else {
            creds.oauth.clone()
        };
        let fresh = self.provider.exchange(&oauth).await?;
        self.persist(&fresh).await?;

        let data = fresh.launch_data();
        *cached = Some(fresh);
        Ok(data)
    }

    pub async fn state(&self) -> AuthState {
        match self.cached.lock().await.as_ref() {
            None => AuthState::LoggedOut,
            Some(creds) => AuthState::LoggedIn {
                player_name: creds.profile.name.clone(),
                expired: creds.is_expired(Utc::now()),
            },
        }
    }

    async fn persist(&self, creds: &Credentials) -> LauncherResult<()> {
        let raw = serde_json::to_vec(&StoredCredentials::from(creds))?;
        self.store.set(MICROSOFT_PROVIDER, &raw).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Duration;

    use super::*;
    use crate::core::auth::credentials::{MinecraftProfile, OAuthToken};
    use crate::core::auth::microsoft::DeviceCodePrompt;

    #[derive(Default)]
    struct MemoryStore {
        entries: std::sync::Mutex<HashMap<String, Vec<u8>>>,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl CredentialStore for MemoryStore {
        async fn set(&self, provider: &str, data: &[u8]) -> LauncherResult<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.entries
                .lock()
                .unwrap()
                .insert(provider.to_string(), data.to_vec());
            Ok(())
        }

        async fn get(&self, provider: &str) -> LauncherResult<Option<Vec<u8>>> {
            Ok(self.entries.lock().unwrap().get(provider).cloned())
        }
    }

    #[derive(Default)]
    struct FakeProvider {
        refreshes: AtomicUsize,
        exchanges: AtomicUsize,
    }

    fn credentials(access: &str, expires_in: Duration, oauth_expiry: Duration) -> Credentials {
        Credentials {
            oauth: OAuthToken {
                access_token: "ms".into(),
                refresh_token: Some("refresh".into()),
                expiry: Some(Utc::now() + oauth_expiry),
            },
            access_token: access.into(),
            expires_at: Utc::now() + expires_in,
            profile: MinecraftProfile {
                id: "uuid".into(),
                name: "Alex".into(),
                paid: true,
            },
        }
    }

    #[async_trait]
    impl AuthProvider for FakeProvider {
        async fn login(&self, on_code: DeviceCodeCallback) -> LauncherResult<OAuthToken> {
            on_code(&DeviceCodePrompt {
                user_code: "ABCD".into(),
                verification_uri: "https://microsoft.com/link".into(),
                message: String::new(),
            });
            Ok(OAuthToken {
                access_token: "ms".into(),
                refresh_token: Some("refresh".into()),
                expiry: Some(Utc::now() + Duration::hours(1)),
            })
        }

        async fn refresh(&self, token: &OAuthToken) -> LauncherResult<OAuthToken> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            Ok(OAuthToken {
                access_token: "ms-fresh".into(),
                refresh_token: token.refresh_token.clone(),
                expiry: Some(Utc::now() + Duration::hours(1)),
            })
        }

        async fn exchange(&self, _token: &OAuthToken) -> LauncherResult<Credentials> {
            self.exchanges.fetch_add(1, Ordering::SeqCst);
            Ok(credentials("mc-fresh", Duration::hours(24), Duration::hours(1)))
        }
    }

    async fn manager_with(
        creds: Option<Credentials>,
    ) -> (AuthManager, Arc<FakeProvider>, Arc<MemoryStore>) {
        let provider = Arc::new(FakeProvider::default());
        let store = Arc::new(MemoryStore::default());
        if let Some(creds) = creds {
            let raw = serde_json::to_vec(&StoredCredentials::from(&creds)).unwrap();
            store.set(MICROSOFT_PROVIDER, &raw).await.unwrap();
            store.writes.store(0, Ordering::SeqCst);
        }
        let manager = AuthManager::new(provider.clone(), store.clone());
        manager.restore().await.unwrap();
        (manager, provider, store)
    }

    #[tokio::test]
    async fn logged_out_launch_is_rejected() {
        let (manager, _, _) = manager_with(None).await;
        assert_eq!(manager.state().await, AuthState::LoggedOut);
        assert!(matches!(
            manager.launch_auth_data().await,
            Err(LauncherError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn valid_credentials_are_used_as_is() {
        let creds = credentials("mc-cached", Duration::hours(2), Duration::hours(1));
        let (manager, provider, store) = manager_with(Some(creds)).await;

        let data = manager.launch_auth_data().await.unwrap();
        assert_eq!(data.access_token, "mc-cached");
        assert_eq!(data.player_name, "Alex");
        assert!(data.paid);
        assert_eq!(provider.exchanges.load(Ordering::SeqCst), 0);
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn expired_credentials_refresh_once_and_persist() {
        let creds = credentials("mc-old", -Duration::minutes(1), -Duration::minutes(5));
        let (manager, provider, store) = manager_with(Some(creds)).await;

        let data = manager.launch_auth_data().await.unwrap();
        assert_eq!(data.access_token, "mc-fresh");
        assert_eq!(provider.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(provider.exchanges.load(Ordering::SeqCst), 1);
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);

        // Second launch reuses the refreshed credentials.
        manager.launch_auth_data().await.unwrap();
        assert_eq!(provider.exchanges.load(Ordering::SeqCst), 1);

        let raw = store.get(MICROSOFT_PROVIDER).await.unwrap().unwrap();
        let stored: StoredCredentials = serde_json::from_slice(&raw).unwrap();
        assert_eq!(stored.access_token, "mc-fresh");
    }

    #[tokio::test]
    async fn still_valid_oauth_token_skips_refresh() {
        let creds = credentials("mc-old", -Duration::minutes(1), Duration::minutes(30));
        let (manager, provider, _) = manager_with(Some(creds)).await;

        manager.launch_auth_data().await.unwrap();
        assert_eq!(provider.refreshes.load(Ordering::SeqCst), 0);
        assert_eq!(provider.exchanges.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn prompt_persists_new_login() {
        let (manager, _, store) = manager_with(None).await;
        let shown = Arc::new(std::sync::Mutex::new(String::new()));
        let sink = shown.clone();

        let data = manager
            .prompt(Box::new(move |prompt: &DeviceCodePrompt| {
                *sink.lock().unwrap() = prompt.user_code.clone();
            }))
            .await
            .unwrap();

        assert_eq!(data.access_token, "mc-fresh");
        assert_eq!(*shown.lock().unwrap(), "ABCD");
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
        assert!(matches!(manager.state().await, AuthState::LoggedIn { expired: false, .. }));
    }
}
