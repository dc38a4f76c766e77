//! API key lookup for the model endpoint

use anyhow::{Context, Result};
use std::env;

const KEYRING_SERVICE: &str = "triage";
const KEYRING_USER: &str = "api_key";
const ENV_KEYS: [&str; 2] = ["TRIAGE_API_KEY", "OPENAI_API_KEY"];

/// Where the resolved key came from, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Environment,
    ConfigFile,
    Keyring,
}

pub struct CredentialStore {
    config_key: Option<String>,
}

impl CredentialStore {
    pub fn new(config_key: Option<String>) -> Self {
        Self { config_key }
    }

    fn env_key() -> Option<String> {
        ENV_KEYS.iter().find_map(|name| env::var(name).ok())
    }

    fn keyring_get() -> Option<String> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER).ok()?;
        entry.get_password().ok()
    }

    /// Resolve the API key: environment, then config file, then keyring
    pub fn api_key(&self) -> Option<(String, KeySource)> {
        resolve_api_key(Self::env_key(), self.config_key.clone(), Self::keyring_get)
    }

    pub fn set_api_key(key: &str) -> Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)
            .context("Failed to open keyring entry")?;
        entry
            .set_password(key.trim())
            .context("Failed to store API key in keyring")?;
        Ok(())
    }
}

fn usable(key: Option<String>) -> Option<String> {
    key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty())
}

/// The keyring is only consulted when neither earlier source has a key.
pub fn resolve_api_key(
    env_key: Option<String>,
    config_key: Option<String>,
    keyring: impl FnOnce() -> Option<String>,
) -> Option<(String, KeySource)> {
    if let Some(key) = usable(env_key) {
        return Some((key, KeySource::Environment));
    }
    if let Some(key) = usable(config_key) {
        return Some((key, KeySource::ConfigFile));
    }
    usable(keyring()).map(|key| (key, KeySource::Keyring))
}
