// Credential resolution - pure local inspection, no network I/O

use super::{AuthConfig, API_KEY_VAR};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Which backend a request may use
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialState {
    /// Explicit API key, used for the direct HTTP backend
    Direct { secret: String },
    /// Browser-delegated login held by the CLI
    Delegated { account: String },
    /// Nothing usable found
    None,
}

impl CredentialState {
    pub fn kind(&self) -> &'static str {
        match self {
            CredentialState::Direct { .. } => "direct",
            CredentialState::Delegated { .. } => "delegated",
            CredentialState::None => "none",
        }
    }
}

impl std::fmt::Debug for CredentialState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialState::Direct { .. } => f
                .debug_struct("Direct")
                .field("secret", &"<redacted>")
                .finish(),
            CredentialState::Delegated { account } => f
                .debug_struct("Delegated")
                .field("account", account)
                .finish(),
            CredentialState::None => f.write_str("None"),
        }
    }
}

/// Shape of the CLI's account marker file
#[derive(Debug, Deserialize)]
struct AccountsFile {
    #[serde(default)]
    active: Option<String>,
}

/// Resolves credentials fresh on every call. Never memoizes: files may change between requests.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    config: AuthConfig,
}

impl CredentialResolver {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// First match wins: explicit secret, credential file, delegated account.
    pub fn resolve(&self) -> CredentialState {
        if let Some(secret) = self
            .config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            debug!(source = "explicit", "resolved direct credential");
            return CredentialState::Direct {
                secret: secret.to_string(),
            };
        }

        if let Some(secret) = self
            .config
            .credential_file
            .as_deref()
            .and_then(read_key_from_file)
        {
            debug!(source = "credential_file", "resolved direct credential");
            return CredentialState::Direct { secret };
        }

        if let Some(account) = self
            .config
            .accounts_file
            .as_deref()
            .and_then(read_active_account)
        {
            debug!(account = %account, "resolved delegated credential");
            return CredentialState::Delegated { account };
        }

        debug!("no credential available");
        CredentialState::None
    }
}

/// Read the API key from a `KEY=value` file. Unreadable or malformed files count as absent.
fn read_key_from_file(path: &Path) -> Option<String> {
    let entries = dotenvy::from_path_iter(path).ok()?;
    entries
        .flatten()
        .find(|(key, _)| key == API_KEY_VAR)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Read the active delegated account. Missing file, bad JSON or empty `active` count as absent.
fn read_active_account(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let accounts: AccountsFile = serde_json::from_str(&content).ok()?;
    accounts
        .active
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
}
