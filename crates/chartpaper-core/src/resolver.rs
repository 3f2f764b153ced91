//! Candidate-location fallback for dependencies that are not yet stored.

use chartpaper_render::{fetch_chart, FetchError, FetchOptions, RenderEngine, RenderError};
use chartpaper_schema::{ChartSummary, Location};
use serde::Serialize;
use tracing::{debug, warn};

/// Registries tried, in order, after a dependency's own repository hint.
pub const DEFAULT_CANDIDATES: &[&str] = &[
    "oci://registry-1.docker.io/bitnamicharts/{name}",
    "oci://registry.k8s.io/{name}/{name}",
    "oci://ghcr.io/helm/{name}",
];

/// Outcome of resolving one chart's missing dependencies.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolveReport {
    #[serde(rename = "fetched_charts")]
    pub fetched: Vec<ChartSummary>,
    pub total_dependencies: usize,
    pub errors: Vec<String>,
}

/// Ordered, de-duplicated locations to try for dependency `name`.
pub fn candidate_locations(
    name: &str,
    repository: Option<&str>,
    templates: &[String],
) -> Vec<Location> {
    let hint = repository
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|r| Location::new(r).join_chart(name));

    let mut out: Vec<Location> = Vec::with_capacity(templates.len() + 1);
    for candidate in hint
        .into_iter()
        .chain(templates.iter().map(|t| Location::new(t.replace("{name}", name))))
    {
        if !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    out
}

/// Tries candidate locations for a dependency until one renders.
pub struct Resolver<'a> {
    engine: &'a dyn RenderEngine,
    templates: &'a [String],
    options: &'a FetchOptions,
}

impl<'a> Resolver<'a> {
    pub fn new(
        engine: &'a dyn RenderEngine,
        templates: &'a [String],
        options: &'a FetchOptions,
    ) -> Self {
        Self {
            engine,
            templates,
            options,
        }
    }

    /// Fetch the first candidate that succeeds, returning it with the
    /// location it came from. When every candidate fails only the last
    /// error is returned.
    pub fn fetch_first(
        &self,
        name: &str,
        repository: Option<&str>,
    ) -> Result<(Location, ChartSummary), FetchError> {
        let candidates = candidate_locations(name, repository, self.templates);
        let mut last_error = None;

        for location in candidates {
            debug!("trying {location} for dependency {name}");
            match fetch_chart(self.engine, &location, Some(name), self.options) {
                Ok(summary) => return Ok((location, summary)),
                Err(e) => {
                    warn!("dependency {name}: {e}");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            FetchError::new(
                &Location::new(name),
                RenderError::ChartNotFound(format!("no candidate locations for {name}")),
            )
        }))
    }
}
