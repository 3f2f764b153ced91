//! Core orchestration for the Chartpaper catalog.
//!
//! This crate ties the fetch adapter, the fact extractor, and the catalog
//! store together into `Catalog`, the API behind every HTTP route and CLI
//! command: fetch-or-update a chart, browse and switch stored versions, and
//! resolve missing dependencies across a prioritized list of candidate
//! registries. `CatalogConfig` carries the TOML configuration.

pub mod catalog;
pub mod config;
pub mod resolver;

pub use catalog::{Catalog, ChartDetail, FetchOutcome, FetchRequest, Health};
pub use config::{
    CatalogConfig, EngineConfig, FetchConfig, ResolverConfig, ServerConfig, STORE_ENV_VAR,
};
pub use resolver::{candidate_locations, ResolveReport, Resolver, DEFAULT_CANDIDATES};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("store error: {0}")]
    Store(#[from] chartpaper_store::StoreError),
    #[error(transparent)]
    Fetch(#[from] chartpaper_render::FetchError),
    #[error("render error: {0}")]
    Render(#[from] chartpaper_render::RenderError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("chart not found: {0}")]
    ChartNotFound(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl CoreError {
    /// Whether the error means "no such chart, version, or registry config".
    pub fn is_not_found(&self) -> bool {
        use chartpaper_store::StoreError;
        matches!(
            self,
            CoreError::ChartNotFound(_)
                | CoreError::Store(
                    StoreError::ChartNotFound(_)
                        | StoreError::VersionNotFound { .. }
                        | StoreError::RegistryNotFound(_)
                )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartpaper_store::StoreError;

    #[test]
    fn not_found_classification() {
        assert!(CoreError::ChartNotFound("x".to_owned()).is_not_found());
        assert!(CoreError::Store(StoreError::RegistryNotFound(1)).is_not_found());
        assert!(CoreError::Store(StoreError::VersionNotFound {
            name: "a".to_owned(),
            version: "1".to_owned()
        })
        .is_not_found());
        assert!(!CoreError::Config("bad".to_owned()).is_not_found());
        assert!(!CoreError::Store(StoreError::LockPoisoned).is_not_found());
    }
}
