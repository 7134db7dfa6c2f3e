//! API key lookup: managed secrets file, then environment, then session input.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::ChatError;

pub const API_KEY_NAME: &str = "OPENAI_API_KEY";

/// Where the active API key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    SecretStore,
    Environment,
    Session,
}

impl KeySource {
    pub fn label(&self) -> &'static str {
        match self {
            KeySource::SecretStore => "secrets file",
            KeySource::Environment => "env var",
            KeySource::Session => "session only",
        }
    }
}

/// An API key. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Asterisks with the last four characters visible.
    pub fn masked(&self) -> String {
        mask_secret(&self.0)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

pub fn mask_secret(secret: &str) -> String {
    let len = secret.chars().count();
    if len <= 4 {
        return "*".repeat(len);
    }
    let masked_len = len - 4;
    let last_four: String = secret.chars().skip(masked_len).collect();
    format!("{}...{}", "*".repeat(masked_len.min(20)), last_four)
}

/// Resolves the session's API key once, in priority order.
#[derive(Debug, Clone, Default)]
pub struct CredentialResolver {
    secrets_path: Option<PathBuf>,
    environment: Option<String>,
    session: Option<String>,
}

impl CredentialResolver {
    pub fn new(secrets_path: Option<PathBuf>, environment: Option<String>) -> Self {
        Self {
            secrets_path,
            environment,
            session: None,
        }
    }

    /// Capture `OPENAI_API_KEY` from the process environment.
    pub fn from_env(secrets_path: Option<PathBuf>) -> Self {
        Self::new(secrets_path, std::env::var(API_KEY_NAME).ok())
    }

    /// Key typed in by the user. Held in memory only.
    pub fn with_session_key(mut self, key: impl Into<String>) -> Self {
        self.session = Some(key.into());
        self
    }

    pub fn set_session_key(&mut self, key: impl Into<String>) {
        self.session = Some(key.into());
    }

    pub fn resolve(&self) -> Result<(ApiKey, KeySource), ChatError> {
        if let Some(key) = self.secrets_path.as_deref().and_then(read_secrets_file) {
            return Ok((ApiKey::new(key), KeySource::SecretStore));
        }
        if let Some(key) = non_blank(self.environment.as_deref()) {
            return Ok((ApiKey::new(key), KeySource::Environment));
        }
        if let Some(key) = non_blank(self.session.as_deref()) {
            return Ok((ApiKey::new(key), KeySource::Session));
        }
        Err(ChatError::MissingCredential)
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// A missing or unreadable secrets file is treated as "no key here".
fn read_secrets_file(path: &Path) -> Option<String> {
    if !path.exists() {
        return None;
    }
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read secrets file {}: {}", path.display(), e);
            return None;
        }
    };
    let secrets: HashMap<String, String> = match serde_json::from_str(&content) {
        Ok(secrets) => secrets,
        Err(e) => {
            warn!("Ignoring malformed secrets file {}: {}", path.display(), e);
            return None;
        }
    };
    debug!("Loaded secrets file {}", path.display());
    non_blank(secrets.get(API_KEY_NAME).map(String::as_str))
}
