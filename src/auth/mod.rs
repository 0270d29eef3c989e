// Auth module - picks the backend for each request from local credential state

pub mod resolver;

pub use resolver::{CredentialResolver, CredentialState};

use crate::config::{env_path, env_string, install_dir};
use std::path::PathBuf;

/// Name of the credential variable, both in the environment and in the credential file
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Where the resolver looks for credentials, in priority order
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Explicit secret value (direct credential)
    pub api_key: Option<String>,
    /// `KEY=value` file checked when no explicit secret is set
    pub credential_file: Option<PathBuf>,
    /// Browser-login account marker written by the CLI
    pub accounts_file: Option<PathBuf>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("credential_file", &self.credential_file)
            .field("accounts_file", &self.accounts_file)
            .finish()
    }
}

impl AuthConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let credential_file = env_path("GEMINI_CREDENTIAL_FILE")
            .or_else(|| install_dir().map(|dir| dir.join(".env")));
        let accounts_file = env_path("GEMINI_ACCOUNTS_FILE").or_else(|| {
            dirs::home_dir().map(|home| home.join(".gemini").join("google_accounts.json"))
        });

        Self {
            api_key: env_string(API_KEY_VAR),
            credential_file,
            accounts_file,
        }
    }
}
