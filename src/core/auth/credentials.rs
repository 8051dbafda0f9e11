use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Microsoft OAuth token as returned by the token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl OAuthToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_some_and(|expiry| expiry <= now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MinecraftProfile {
    pub id: String,
    pub name: String,
    /// Whether the account owns the game. Never launchable when false.
    #[serde(default)]
    pub paid: bool,
}

/// Everything a launch needs, plus the OAuth token to refresh it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub oauth: OAuthToken,
    /// Minecraft services access token.
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub profile: MinecraftProfile,
}

impl Credentials {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn launch_data(&self) -> LaunchAuthData {
        LaunchAuthData {
            player_name: self.profile.name.clone(),
            uuid: self.profile.id.clone(),
            access_token: self.access_token.clone(),
            user_type: "msa".to_string(),
            paid: self.profile.paid,
        }
    }
}

/// Placeholder values handed to the launch assembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchAuthData {
    pub player_name: String,
    pub uuid: String,
    pub access_token: String,
    pub user_type: String,
    pub paid: bool,
}

/// Trimmed persisted form. Xbox tokens and the user hash never get here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredCredentials {
    #[serde(rename = "ms")]
    pub microsoft_auth: OAuthToken,
    #[serde(rename = "pn")]
    pub player_name: String,
    #[serde(rename = "id")]
    pub uuid: String,
    #[serde(rename = "at")]
    pub access_token: String,
    #[serde(rename = "exp")]
    pub expires_at: DateTime<Utc>,
}

impl From<&Credentials> for StoredCredentials {
    fn from(creds: &Credentials) -> Self {
        Self {
            microsoft_auth: creds.oauth.clone(),
            player_name: creds.profile.name.clone(),
            uuid: creds.profile.id.clone(),
            access_token: creds.access_token.clone(),
            expires_at: creds.expires_at,
        }
    }
}

impl StoredCredentials {
    /// Rebuild launch credentials. Only owners have a profile, so a stored
    /// profile id implies a paid account.
    pub fn restore(self) -> Credentials {
        Credentials {
            oauth: self.microsoft_auth,
            access_token: self.access_token,
            expires_at: self.expires_at,
            profile: MinecraftProfile {
                paid: !self.uuid.is_empty(),
                id: self.uuid,
                name: self.player_name,
            },
        }
    }
}
