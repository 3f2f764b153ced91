//! The fetch adapter: location in, canonical [`ChartSummary`] out.

use crate::engine::{RenderEngine, RenderRequest};
use crate::FetchError;
use chartpaper_schema::{
    extract_manifest_facts, ChartKind, ChartMetadata, ChartName, ChartSummary, Location,
};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Version recorded for a chart whose metadata could not be read.
pub const UNKNOWN_VERSION: &str = "unknown";

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub values_path: Option<PathBuf>,
    pub set_values: Vec<String>,
    pub host_network: bool,
}

impl FetchOptions {
    fn request(&self, location: &Location) -> RenderRequest {
        RenderRequest {
            location: location.clone(),
            values_path: self.values_path.clone(),
            set_values: self.set_values.clone(),
        }
    }
}

fn fallback_name(location: &Location, declared_name: Option<&str>) -> ChartName {
    let derived = location.derive_name();
    if derived.is_empty() {
        ChartName::new(declared_name.unwrap_or_default())
    } else {
        ChartName::new(derived)
    }
}

/// Render `location` and build its summary.
///
/// `declared_name` is the name the caller expects (a dependency edge's
/// name) and is only used when neither the chart metadata nor the location
/// yields one. Workload decoding is best-effort: a parse failure leaves the
/// application list empty.
pub fn fetch_chart(
    engine: &dyn RenderEngine,
    location: &Location,
    declared_name: Option<&str>,
    options: &FetchOptions,
) -> Result<ChartSummary, FetchError> {
    let request = options.request(location);
    let rendered = engine
        .render(&request)
        .map_err(|e| FetchError::new(location, e))?
        .ok_or_else(|| {
            FetchError::new(
                location,
                crate::RenderError::MalformedOutput(format!(
                    "{} engine rendered nothing",
                    engine.name()
                )),
            )
        })?;

    let default_description = format!("Chart fetched from {location}");
    let chart = match rendered.metadata {
        Some(mut meta) => {
            if meta.name.is_empty() {
                meta.name = fallback_name(location, declared_name);
            }
            if meta.description.is_empty() {
                meta.description = default_description;
            }
            meta
        }
        None => {
            debug!("no chart metadata for {location}");
            ChartMetadata {
                api_version: String::new(),
                name: fallback_name(location, declared_name),
                version: UNKNOWN_VERSION.to_owned(),
                description: default_description,
                kind: ChartKind::Application,
                dependencies: Vec::new(),
            }
        }
    };

    let mut summary = ChartSummary::new(chart);
    if !rendered.manifest.is_empty() {
        let facts = extract_manifest_facts(&rendered.manifest);
        summary.attach_facts(&rendered.manifest, facts);
    }

    summary.applications = match engine.parse(&request, options.host_network) {
        Ok(apps) => apps,
        Err(e) => {
            warn!("could not decode applications from {location}: {e}");
            Vec::new()
        }
    };

    debug!(
        "fetched {} {} from {location} ({} dependencies, {} applications)",
        summary.chart.name,
        summary.chart.version,
        summary.chart.dependencies.len(),
        summary.applications.len()
    );
    Ok(summary)
}
