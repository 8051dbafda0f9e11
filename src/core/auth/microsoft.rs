use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::credentials::{Credentials, MinecraftProfile, OAuthToken};
use crate::core::error::{LauncherError, LauncherResult};

const DEVICE_CODE_URL: &str = "https://login.microsoftonline.com/consumers/oauth2/v2.0/devicecode";
const TOKEN_URL: &str = "https://login.microsoftonline.com/consumers/oauth2/v2.0/token";
const XBOX_USER_AUTH_URL: &str = "https://user.auth.xboxlive.com/user/authenticate";
const XSTS_AUTH_URL: &str = "https://xsts.auth.xboxlive.com/xsts/authorize";
const MC_LOGIN_URL: &str = "https://api.minecraftservices.com/authentication/login_with_xbox";
const MC_ENTITLEMENTS_URL: &str = "https://api.minecraftservices.com/entitlements/mcstore";
const MC_PROFILE_URL: &str = "https://api.minecraftservices.com/minecraft/profile";
const SCOPE: &str = "XboxLive.signin offline_access";

/// What the user has to do to finish a device code login.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCodePrompt {
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default)]
    pub message: String,
}

pub type DeviceCodeCallback = Box<dyn Fn(&DeviceCodePrompt) + Send + Sync>;

/// Identity provider seam. The HTTP implementation talks to Microsoft, Xbox
/// Live and Minecraft services; tests swap in a fake.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Interactive login. `on_code` is shown the device code to enter.
    async fn login(&self, on_code: DeviceCodeCallback) -> LauncherResult<OAuthToken>;
    async fn refresh(&self, token: &OAuthToken) -> LauncherResult<OAuthToken>;
    /// Trade an OAuth token for Minecraft credentials.
    async fn exchange(&self, token: &OAuthToken) -> LauncherResult<Credentials>;
}

pub struct MicrosoftAuthClient {
    client: reqwest::Client,
    client_id: String,
}

// ── Wire types ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    verification_uri: String,
    #[serde(default)]
    message: String,
    expires_in: u64,
    #[serde(default = "default_interval")]
    interval: u64,
}

fn default_interval() -> u64 {
    5
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct XboxAuthResponse {
    token: String,
    display_claims: XboxDisplayClaims,
}

#[derive(Debug, Deserialize)]
struct XboxDisplayClaims {
    xui: Vec<XboxUserInfo>,
}

#[derive(Debug, Deserialize)]
struct XboxUserInfo {
    uhs: String,
}

#[derive(Debug, Deserialize)]
struct MinecraftLoginResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct EntitlementsResponse {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    id: String,
    name: String,
}

impl From<TokenResponse> for OAuthToken {
    fn from(resp: TokenResponse) -> Self {
        OAuthToken {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
            expiry: resp
                .expires_in
                .map(|secs| Utc::now() + chrono::Duration::seconds(secs)),
        }
    }
}

impl MicrosoftAuthClient {
    pub fn new(client: reqwest::Client, client_id: impl Into<String>) -> Self {
        Self {
            client,
            client_id: client_id.into(),
        }
    }

    async fn xbox_user_token(&self, oauth: &OAuthToken) -> LauncherResult<XboxAuthResponse> {
        let body = json!({
            "Properties": {
                "AuthMethod": "RPS",
                "SiteName": "user.auth.xboxlive.com",
                "RpsTicket": format!("d={}", oauth.access_token),
            },
            "RelyingParty": "http://auth.xboxlive.com",
            "TokenType": "JWT",
        });
        self.post_json(XBOX_USER_AUTH_URL, &body).await
    }

    async fn xsts_token(&self, user_token: &str) -> LauncherResult<XboxAuthResponse> {
        let body = json!({
            "Properties": {
                "SandboxId": "RETAIL",
                "UserTokens": [user_token],
            },
            "RelyingParty": "rp://api.minecraftservices.com/",
            "TokenType": "JWT",
        });
        self.post_json(XSTS_AUTH_URL, &body).await
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> LauncherResult<T> {
        let resp = self
            .client
            .post(url)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(LauncherError::Auth(format!("{url} returned {status}: {text}")));
        }
        Ok(resp.json().await?)
    }

    async fn get_bearer<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        token: &str,
    ) -> LauncherResult<T> {
        let resp = self.client.get(url).bearer_auth(token).send().await?;
        if !resp.status().is_success() {
            return Err(LauncherError::Auth(format!(
                "{url} returned {}",
                resp.status()
            )));
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl AuthProvider for MicrosoftAuthClient {
    async fn login(&self, on_code: DeviceCodeCallback) -> LauncherResult<OAuthToken> {
        let device: DeviceCodeResponse = self
            .client
            .post(DEVICE_CODE_URL)
            .form(&[("client_id", self.client_id.as_str()), ("scope", SCOPE)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        on_code(&DeviceCodePrompt {
            user_code: device.user_code.clone(),
            verification_uri: device.verification_uri.clone(),
            message: device.message.clone(),
        });

        let deadline = tokio::time::Instant::now() + Duration::from_secs(device.expires_in);
        let mut interval = Duration::from_secs(device.interval.max(1));

        loop {
            tokio::time::sleep(interval).await;
            if tokio::time::Instant::now() >= deadline {
                return Err(LauncherError::Auth("device code expired".into()));
            }

            let resp = self
                .client
                .post(TOKEN_URL)
                .form(&[
                    ("grant_type", "urn:ietf:params:oauth:grant-type:device_code"),
                    ("client_id", self.client_id.as_str()),
                    ("device_code", device.device_code.as_str()),
                ])
                .send()
                .await?;

            if resp.status().is_success() {
                let token: TokenResponse = resp.json().await?;
                info!("Microsoft login completed");
                return Ok(token.into());
            }

            let err: TokenErrorResponse = resp.json().await?;
            match err.error.as_str() {
                "authorization_pending" => continue,
                "slow_down" => interval += Duration::from_secs(5),
                other => {
                    return Err(LauncherError::Auth(
                        err.error_description.unwrap_or_else(|| other.to_string()),
                    ))
                }
            }
        }
    }

    async fn refresh(&self, token: &OAuthToken) -> LauncherResult<OAuthToken> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or_else(|| LauncherError::Auth("no refresh token, log in again".into()))?;

        debug!("Refreshing Microsoft token");
        let resp = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.client_id.as_str()),
                ("refresh_token", refresh_token),
                ("scope", SCOPE),
            ])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(LauncherError::Auth(format!(
                "token refresh returned {}",
                resp.status()
            )));
        }
        let fresh: TokenResponse = resp.json().await?;
        let mut fresh = OAuthToken::from(fresh);
        // Microsoft may omit the refresh token when it is unchanged.
        if fresh.refresh_token.is_none() {
            fresh.refresh_token = token.refresh_token.clone();
        }
        Ok(fresh)
    }

    async fn exchange(&self, token: &OAuthToken) -> LauncherResult<Credentials> {
        let user = self.xbox_user_token(token).await?;
        let xsts = self.xsts_token(&user.token).await?;
        let user_hash = xsts
            .display_claims
            .xui
            .first()
            .map(|x| x.uhs.clone())
            .ok_or_else(|| LauncherError::Auth("XSTS response has no user hash".into()))?;

        let login: MinecraftLoginResponse = self
            .post_json(
                MC_LOGIN_URL,
                &json!({ "identityToken": format!("XBL3.0 x={};{}", user_hash, xsts.token) }),
            )
            .await?;

        let entitlements: EntitlementsResponse = self
            .get_bearer(MC_ENTITLEMENTS_URL, &login.access_token)
            .await?;
        if entitlements.items.is_empty() {
            return Err(LauncherError::AccountCannotLaunch);
        }

        let profile: ProfileResponse = self
            .get_bearer(MC_PROFILE_URL, &login.access_token)
            .await?;
        info!("Authenticated as {}", profile.name);

        Ok(Credentials {
            oauth: token.clone(),
            access_token: login.access_token,
            expires_at: Utc::now() + chrono::Duration::seconds(login.expires_in),
            profile: MinecraftProfile {
                id: profile.id,
                name: profile.name,
                paid: true,
            },
        })
    }
}
