pub mod credentials;
pub mod manager;
pub mod microsoft;
pub mod store;

pub use credentials::{Credentials, LaunchAuthData, MinecraftProfile, OAuthToken, StoredCredentials};
pub use manager::{AuthManager, AuthState, MICROSOFT_PROVIDER};
pub use microsoft::{AuthProvider, DeviceCodeCallback, DeviceCodePrompt, MicrosoftAuthClient};
pub use store::{CredentialStore, FileCredentialStore};

/// Public client id used when settings do not provide one.
pub const DEFAULT_CLIENT_ID: &str = "00000000402B5328";
