//! Chart metadata, manifest fact extraction, and application records for Chartpaper.
//!
//! This crate defines the schema layer: `Chart.yaml` metadata parsing
//! (`ChartMetadata`), the heuristic manifest scanner (`extract_manifest_facts`)
//! that recovers image tags, ingress paths, and service ports from rendered
//! multi-document manifests, the `Application` workload records produced by a
//! rendering engine's parse step, and the `ChartSummary` handed between the
//! fetch adapter and the catalog store.

pub mod app;
pub mod chart;
pub mod extract;
pub mod summary;
pub mod types;

pub use app::Application;
pub use chart::{parse_chart_yaml, ChartKind, ChartMetadata, Dependency, SchemaError};
pub use extract::{extract_manifest_facts, ManifestFacts, NOT_AVAILABLE};
pub use summary::{manifest_digest, ChartSummary};
pub use types::{ChartName, Location};
