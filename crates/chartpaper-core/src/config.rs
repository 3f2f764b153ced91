use crate::resolver::DEFAULT_CANDIDATES;
use crate::CoreError;
use chartpaper_render::{EngineSettings, FetchOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides `store_dir`.
pub const STORE_ENV_VAR: &str = "CHARTPAPER_STORE";

/// Catalog configuration, read from `chartpaper.toml`. Every field has a
/// default, so an empty or missing file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    pub store_dir: PathBuf,
    pub engine: EngineConfig,
    pub fetch: FetchConfig,
    pub resolver: ResolverConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_path: Option<PathBuf>,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// `helm` or `mock`.
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helm_binary: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mock_fixtures: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values_path: Option<PathBuf>,
    pub set_values: Vec<String>,
    pub host_network: bool,
    /// Fetch each declared dependency's repository before storing a chart
    /// to learn its image tags.
    pub enrich_dependencies: bool,
    /// Log in with the credentials file before every fetch.
    pub login_before_fetch: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Location templates tried after a dependency's repository hint.
    /// `{name}` is replaced by the dependency name.
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub port: u16,
    pub workers: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            engine: EngineConfig::default(),
            fetch: FetchConfig::default(),
            resolver: ResolverConfig::default(),
            credentials_path: None,
            server: ServerConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: "helm".to_owned(),
            helm_binary: None,
            mock_fixtures: None,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            values_path: None,
            set_values: Vec::new(),
            host_network: false,
            enrich_dependencies: true,
            login_before_fetch: true,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            candidates: DEFAULT_CANDIDATES.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            workers: 4,
        }
    }
}

fn default_store_dir() -> PathBuf {
    std::env::var("HOME").map_or_else(
        |_| PathBuf::from(".chartpaper"),
        |home| PathBuf::from(home).join(".local/share/chartpaper"),
    )
}

/// `~/.config/chartpaper/chartpaper.toml`, falling back to the working
/// directory when `HOME` is unset.
pub fn default_config_path() -> PathBuf {
    std::env::var("HOME").map_or_else(
        |_| PathBuf::from("chartpaper.toml"),
        |home| PathBuf::from(home).join(".config/chartpaper/chartpaper.toml"),
    )
}

impl CatalogConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, CoreError> {
        toml::from_str(content).map_err(|e| CoreError::Config(format!("invalid config: {e}")))
    }

    /// Read `path`; a missing file yields the defaults. `CHARTPAPER_STORE`
    /// overrides `store_dir` either way.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => return Err(CoreError::Io(e)),
        };
        config.apply_store_override(std::env::var(STORE_ENV_VAR).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn load_default() -> Result<Self, CoreError> {
        Self::load(&default_config_path())
    }

    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| CoreError::Config(format!("cannot serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn apply_store_override(&mut self, value: Option<String>) {
        if let Some(dir) = value.filter(|v| !v.is_empty()) {
            self.store_dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if !matches!(self.engine.kind.as_str(), "helm" | "mock") {
            return Err(CoreError::Config(format!(
                "unknown engine '{}', expected 'helm' or 'mock'",
                self.engine.kind
            )));
        }
        if self.server.workers == 0 {
            return Err(CoreError::Config(
                "server.workers must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            helm_binary: self.engine.helm_binary.clone(),
            mock_fixtures: self.engine.mock_fixtures.clone(),
        }
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            values_path: self.fetch.values_path.clone(),
            set_values: self.fetch.set_values.clone(),
            host_network: self.fetch.host_network,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_all_defaults() {
        let config = CatalogConfig::from_toml_str("").unwrap();
        assert_eq!(config, CatalogConfig::default());
        assert_eq!(config.engine.kind, "helm");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.workers, 4);
        assert!(config.fetch.enrich_dependencies);
        assert_eq!(config.resolver.candidates.len(), DEFAULT_CANDIDATES.len());
    }

    #[test]
    fn parse_full_config() {
        let config = CatalogConfig::from_toml_str(
            r#"
store_dir = "/var/lib/chartpaper"
credentials_path = "/etc/chartpaper/credentials.json"

[engine]
kind = "mock"
mock_fixtures = "fixtures.json"

[fetch]
set_values = ["auth.enabled=false"]
host_network = true
enrich_dependencies = false

[resolver]
candidates = ["oci://charts.internal/{name}"]

[server]
port = 9000
workers = 8
"#,
        )
        .unwrap();

        assert_eq!(config.store_dir, PathBuf::from("/var/lib/chartpaper"));
        assert_eq!(config.engine.kind, "mock");
        assert_eq!(config.fetch.set_values, vec!["auth.enabled=false"]);
        assert!(config.fetch.host_network);
        assert!(!config.fetch.enrich_dependencies);
        assert!(config.fetch.login_before_fetch);
        assert_eq!(config.resolver.candidates, vec!["oci://charts.internal/{name}"]);
        assert_eq!(config.server.port, 9000);
        assert!(config.fetch_options().host_network);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(CatalogConfig::from_toml_str("[engine]\nbackend = \"helm\"\n").is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CatalogConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("chartpaper.toml");
        let mut config = CatalogConfig::default();
        config.engine.kind = "mock".to_owned();
        config.server.port = 8123;
        config.save(&path).unwrap();

        let loaded = CatalogConfig::from_toml_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.engine.kind, "mock");
        assert_eq!(loaded.server.port, 8123);
    }

    #[test]
    fn store_override_replaces_dir() {
        let mut config = CatalogConfig::default();
        config.apply_store_override(Some("/tmp/elsewhere".to_owned()));
        assert_eq!(config.store_dir, PathBuf::from("/tmp/elsewhere"));
        config.apply_store_override(Some(String::new()));
        assert_eq!(config.store_dir, PathBuf::from("/tmp/elsewhere"));
        config.apply_store_override(None);
        assert_eq!(config.store_dir, PathBuf::from("/tmp/elsewhere"));
    }

    #[test]
    fn invalid_engine_and_workers_fail_validation() {
        let mut config = CatalogConfig::default();
        config.engine.kind = "kustomize".to_owned();
        assert!(config.validate().is_err());

        let mut config = CatalogConfig::default();
        config.server.workers = 0;
        assert!(config.validate().is_err());
    }
}
