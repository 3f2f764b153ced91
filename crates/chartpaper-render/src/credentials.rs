use crate::RenderError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Registry login. Files written by older tooling use capitalized keys
/// (`Username`, `Password`, `Registry`); both spellings are accepted.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    #[serde(alias = "Username")]
    pub username: String,
    #[serde(alias = "Password")]
    pub password: String,
    #[serde(alias = "Registry")]
    pub registry: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("registry", &self.registry)
            .finish()
    }
}

impl Credentials {
    pub fn new(registry: &str, username: &str, password: &str) -> Self {
        Self {
            username: username.to_owned(),
            password: password.to_owned(),
            registry: registry.to_owned(),
        }
    }

    /// Load from `~/.config/chartpaper/credentials.json`.
    pub fn load_default() -> Result<Self, RenderError> {
        Self::load(&default_credentials_path()?)
    }

    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RenderError::Credentials(format!("cannot read {}: {e}", path.display()))
        })?;
        let creds: Self = serde_json::from_str(&content)
            .map_err(|e| RenderError::Credentials(format!("invalid credentials file: {e}")))?;
        if creds.registry.is_empty() {
            return Err(RenderError::Credentials(format!(
                "{} does not name a registry",
                path.display()
            )));
        }
        Ok(creds)
    }

    pub fn save(&self, path: &Path) -> Result<(), RenderError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| RenderError::Credentials(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

pub fn default_credentials_path() -> Result<PathBuf, RenderError> {
    let home =
        std::env::var("HOME").map_err(|_| RenderError::Credentials("HOME not set".to_owned()))?;
    Ok(PathBuf::from(home).join(".config/chartpaper/credentials.json"))
}
