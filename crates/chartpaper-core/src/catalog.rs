use crate::config::CatalogConfig;
use crate::resolver::{ResolveReport, Resolver};
use crate::CoreError;
use chartpaper_render::credentials::default_credentials_path;
use chartpaper_render::{
    fetch_chart, select_engine, Credentials, FetchOptions, RenderEngine,
};
use chartpaper_schema::{ChartSummary, Location};
use chartpaper_store::{
    ApplicationRecord, CatalogStore, ChartRecord, DependencyEdge, DependencyTags, RegistryConfig,
    RegistryConfigInput, StoreLayout, UpsertOutcome,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// A fetch-or-update request, as posted to `/chartpaper/api/fetch-chart`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    pub chart_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values_path: Option<PathBuf>,
    #[serde(default)]
    pub set_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_host_network: Option<bool>,
}

impl FetchRequest {
    pub fn new(chart_url: impl Into<String>) -> Self {
        Self {
            chart_url: chart_url.into(),
            ..Self::default()
        }
    }
}

/// Result of [`Catalog::fetch`].
#[derive(Debug, Clone, Serialize)]
pub struct FetchOutcome {
    pub summary: ChartSummary,
    pub stored: ChartRecord,
    pub created: bool,
    pub applications_skipped: usize,
}

/// A stored chart version with its edges and applications.
#[derive(Debug, Clone, Serialize)]
pub struct ChartDetail {
    #[serde(flatten)]
    pub chart: ChartRecord,
    pub dependencies: Vec<DependencyEdge>,
    pub applications: Vec<ApplicationRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charts_count: Option<usize>,
    pub version: &'static str,
    pub engine: String,
    pub engine_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Health {
    pub fn is_healthy(&self) -> bool {
        self.error.is_none()
    }
}

/// The chart catalog: a store plus the engine that fills it.
///
/// Every operation is synchronous. Engine calls never happen while the
/// store lock is held; summaries are fully fetched before they are written.
pub struct Catalog {
    store: CatalogStore,
    engine: Box<dyn RenderEngine>,
    config: CatalogConfig,
}

impl Catalog {
    /// Open the store under `config.store_dir` and build the configured engine.
    pub fn open(config: CatalogConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let engine = select_engine(&config.engine.kind, &config.engine_settings())?;
        let layout = StoreLayout::new(&config.store_dir);
        let store = CatalogStore::open(&layout)?;
        info!(
            "catalog opened at {} with {} engine",
            config.store_dir.display(),
            engine.name()
        );
        Ok(Self::with_engine(store, engine, config))
    }

    pub fn with_engine(
        store: CatalogStore,
        engine: Box<dyn RenderEngine>,
        config: CatalogConfig,
    ) -> Self {
        Self {
            store,
            engine,
            config,
        }
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    pub fn engine(&self) -> &dyn RenderEngine {
        self.engine.as_ref()
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    fn request_options(&self, request: &FetchRequest) -> FetchOptions {
        let mut options = self.config.fetch_options();
        if let Some(values) = request
            .values_path
            .as_ref()
            .filter(|p| !p.as_os_str().is_empty())
        {
            options.values_path = Some(values.clone());
        }
        options.set_values.extend(request.set_values.iter().cloned());
        if let Some(host_network) = request.use_host_network {
            options.host_network = host_network;
        }
        options
    }

    /// Value overrides belong to the requested chart, so dependency
    /// fetches only inherit the network mode.
    fn dependency_options(&self) -> FetchOptions {
        FetchOptions {
            host_network: self.config.fetch.host_network,
            ..FetchOptions::default()
        }
    }

    /// Fetch `request.chart_url` and write it as the current version of its
    /// chart. Fails only when the location itself cannot be rendered or the
    /// write fails.
    pub fn fetch(&self, request: &FetchRequest) -> Result<FetchOutcome, CoreError> {
        let url = request.chart_url.trim();
        if url.is_empty() {
            return Err(CoreError::InvalidRequest("chartUrl is required".to_owned()));
        }
        let location = Location::new(url);
        info!("fetching chart {location}");

        if self.config.fetch.login_before_fetch {
            self.login_from_file();
        }

        let summary = fetch_chart(
            self.engine.as_ref(),
            &location,
            None,
            &self.request_options(request),
        )?;
        let outcome = self.store_summary(&summary, &location)?;
        Ok(FetchOutcome {
            summary,
            stored: outcome.chart,
            created: outcome.created,
            applications_skipped: outcome.applications_skipped,
        })
    }

    /// Log in with the credentials file if there is one. Failures are only
    /// logged; a public chart still fetches without a login.
    fn login_from_file(&self) {
        let Ok(path) = self.credentials_path() else {
            return;
        };
        if !path.exists() {
            debug!("no credentials at {}, skipping login", path.display());
            return;
        }
        match Credentials::load(&path).map_err(CoreError::from) {
            Ok(creds) => {
                if let Err(e) = self.authenticate(&creds) {
                    warn!("login to {} failed: {e}", creds.registry);
                }
            }
            Err(e) => warn!("ignoring credentials file: {e}"),
        }
    }

    /// Learn each declared dependency's image tags, then write the summary.
    pub fn store_summary(
        &self,
        summary: &ChartSummary,
        source: &Location,
    ) -> Result<UpsertOutcome, CoreError> {
        let tags = if self.config.fetch.enrich_dependencies {
            self.dependency_tags(summary)
        } else {
            Vec::new()
        };
        let outcome = self.store.upsert_chart(summary, source, &tags)?;
        info!(
            "stored {} {} (id {}, {})",
            outcome.chart.name,
            outcome.chart.version,
            outcome.chart.id,
            if outcome.created { "new" } else { "refreshed" }
        );
        Ok(outcome)
    }

    fn dependency_tags(&self, summary: &ChartSummary) -> Vec<DependencyTags> {
        let options = self.dependency_options();
        summary
            .chart
            .dependencies
            .iter()
            .map(|dep| {
                let repository = dep.repository.trim();
                if repository.is_empty() {
                    return DependencyTags::default();
                }
                let location = Location::new(repository).join_chart(&dep.name);
                match fetch_chart(self.engine.as_ref(), &location, Some(&dep.name), &options) {
                    Ok(fetched) => fetched
                        .facts
                        .as_ref()
                        .map(DependencyTags::from_facts)
                        .unwrap_or_default(),
                    Err(e) => {
                        warn!("could not enrich dependency {}: {e}", dep.name);
                        DependencyTags::default()
                    }
                }
            })
            .collect()
    }

    pub fn list(&self) -> Result<Vec<ChartRecord>, CoreError> {
        Ok(self.store.list_current()?)
    }

    fn current(&self, name: &str) -> Result<ChartRecord, CoreError> {
        self.store
            .current(name)?
            .ok_or_else(|| CoreError::ChartNotFound(name.to_owned()))
    }

    pub fn get(&self, name: &str) -> Result<ChartDetail, CoreError> {
        let chart = self.current(name)?;
        let dependencies = self.store.dependencies(chart.id)?;
        let applications = self.store.applications(chart.id)?;
        Ok(ChartDetail {
            chart,
            dependencies,
            applications,
        })
    }

    pub fn dependencies(&self, name: &str) -> Result<Vec<DependencyEdge>, CoreError> {
        let chart = self.current(name)?;
        Ok(self.store.dependencies(chart.id)?)
    }

    pub fn versions(&self, name: &str) -> Result<Vec<ChartRecord>, CoreError> {
        let versions = self.store.versions(name)?;
        if versions.is_empty() {
            return Err(CoreError::ChartNotFound(name.to_owned()));
        }
        Ok(versions)
    }

    pub fn switch_version(&self, name: &str, version: &str) -> Result<ChartRecord, CoreError> {
        Ok(self.store.switch_version(name, version)?)
    }

    /// Delete every version of `name`, returning how many were removed.
    pub fn delete(&self, name: &str) -> Result<usize, CoreError> {
        Ok(self.store.delete_chart(name)?)
    }

    pub fn delete_version(&self, name: &str, version: &str) -> Result<(), CoreError> {
        Ok(self.store.delete_version(name, version)?)
    }

    /// Fetch and store every dependency of `name`'s current version that
    /// has no stored chart yet. Per-edge failures land in the report.
    pub fn resolve_dependencies(&self, name: &str) -> Result<ResolveReport, CoreError> {
        let chart = self.current(name)?;
        let edges = self.store.dependencies(chart.id)?;
        let options = self.dependency_options();
        let resolver = Resolver::new(
            self.engine.as_ref(),
            &self.config.resolver.candidates,
            &options,
        );

        let mut report = ResolveReport {
            total_dependencies: edges.len(),
            ..ResolveReport::default()
        };

        for edge in &edges {
            if self.store.chart_exists(&edge.name)? {
                debug!("dependency {} already stored", edge.name);
                continue;
            }
            info!("resolving dependency {} of {name}", edge.name);
            match resolver.fetch_first(&edge.name, edge.repository.as_deref()) {
                Ok((location, summary)) => match self.store_summary(&summary, &location) {
                    Ok(_) => report.fetched.push(summary),
                    Err(e) => {
                        warn!("could not store dependency {}: {e}", edge.name);
                        report.errors.push(format!("{}: {e}", edge.name));
                    }
                },
                Err(e) => report.errors.push(format!("{}: {e}", edge.name)),
            }
        }

        info!(
            "resolved {name}: {} of {} dependencies fetched, {} failed",
            report.fetched.len(),
            report.total_dependencies,
            report.errors.len()
        );
        Ok(report)
    }

    pub fn credentials_path(&self) -> Result<PathBuf, CoreError> {
        match &self.config.credentials_path {
            Some(path) => Ok(path.clone()),
            None => Ok(default_credentials_path()?),
        }
    }

    pub fn load_credentials(&self) -> Result<Credentials, CoreError> {
        Ok(Credentials::load(&self.credentials_path()?)?)
    }

    pub fn authenticate(&self, credentials: &Credentials) -> Result<(), CoreError> {
        self.engine.authenticate(credentials)?;
        info!(
            "logged in to {} as {}",
            credentials.registry, credentials.username
        );
        Ok(())
    }

    pub fn list_registries(&self) -> Result<Vec<RegistryConfig>, CoreError> {
        Ok(self.store.list_registries()?)
    }

    pub fn create_registry(&self, input: &RegistryConfigInput) -> Result<RegistryConfig, CoreError> {
        Ok(self.store.create_registry(input)?)
    }

    pub fn update_registry(
        &self,
        id: i64,
        input: &RegistryConfigInput,
    ) -> Result<RegistryConfig, CoreError> {
        Ok(self.store.update_registry(id, input)?)
    }

    pub fn delete_registry(&self, id: i64) -> Result<(), CoreError> {
        Ok(self.store.delete_registry(id)?)
    }

    pub fn set_default_registry(&self, id: i64) -> Result<RegistryConfig, CoreError> {
        Ok(self.store.set_default_registry(id)?)
    }

    pub fn health(&self) -> Health {
        let engine = self.engine.name().to_owned();
        let engine_available = self.engine.available();
        match self.store.count_charts() {
            Ok(count) => Health {
                status: "healthy",
                database: "connected",
                charts_count: Some(count),
                version: env!("CARGO_PKG_VERSION"),
                engine,
                engine_available,
                error: None,
            },
            Err(e) => Health {
                status: "unhealthy",
                database: "disconnected",
                charts_count: None,
                version: env!("CARGO_PKG_VERSION"),
                engine,
                engine_available,
                error: Some(e.to_string()),
            },
        }
    }
}
