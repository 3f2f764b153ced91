//! Versioned chart catalog storage for Chartpaper.
//!
//! This crate provides the persistence layer: `CatalogStore`, a SQLite
//! database holding one row per chart version with its dependency edges and
//! application records, the "one current version per name" invariant, and
//! the registry endpoint configs. `StoreLayout` manages the on-disk location
//! and `migrate` brings older databases up to [`SCHEMA_VERSION`].

pub mod catalog;
pub mod layout;
pub mod migration;
pub mod records;
pub mod registry;

pub use catalog::{CatalogStore, UpsertOutcome};
pub use layout::StoreLayout;
pub use migration::{migrate, MigrationResult, SCHEMA_VERSION};
pub use records::{
    ApplicationRecord, ChartRecord, DependencyEdge, DependencyTags, RegistryConfig,
    RegistryConfigInput,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("chart not found: {0}")]
    ChartNotFound(String),
    #[error("version {version} of chart '{name}' not found")]
    VersionNotFound { name: String, version: String },
    #[error("registry config not found: {0}")]
    RegistryNotFound(i64),
    #[error("invalid name: {0}")]
    InvalidName(String),
    #[error("registry config '{0}' already exists")]
    RegistryExists(String),
    #[error("catalog schema version mismatch: binary supports {expected}, database is at {found}")]
    SchemaVersionMismatch { expected: u32, found: u32 },
    #[error("catalog connection lock poisoned")]
    LockPoisoned,
}

/// Chart names must be non-empty and usable as a URL path segment.
pub fn validate_chart_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty() || name.len() > 253 {
        return Err(StoreError::InvalidName(
            "chart name must be 1-253 characters".to_owned(),
        ));
    }
    if name.contains('/') || name.chars().any(char::is_whitespace) {
        return Err(StoreError::InvalidName(format!(
            "chart name '{name}' must not contain '/' or whitespace"
        )));
    }
    Ok(())
}
