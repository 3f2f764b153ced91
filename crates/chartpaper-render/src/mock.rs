use crate::credentials::Credentials;
use crate::engine::{RenderEngine, RenderRequest, RenderedChart};
use crate::workloads::decode_applications;
use crate::RenderError;
use chartpaper_schema::{Application, ChartMetadata};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// A chart served by [`MockEngine`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MockChart {
    #[serde(default)]
    pub metadata: Option<ChartMetadata>,
    #[serde(default)]
    pub manifest: String,
    /// Applications returned by `parse`. When absent they are decoded from
    /// `manifest`.
    #[serde(default)]
    pub applications: Option<Vec<Application>>,
    /// Render succeeds but produces nothing.
    #[serde(default)]
    pub empty: bool,
}

/// Fixture file format: charts keyed by location.
#[derive(Debug, Default, Deserialize)]
struct Fixtures {
    #[serde(default)]
    charts: HashMap<String, MockChart>,
    #[serde(default)]
    fail_parse: bool,
}

/// In-memory engine keyed by location. Records every location it was asked
/// to render so tests can assert on fetch order.
#[derive(Default)]
pub struct MockEngine {
    charts: Mutex<HashMap<String, MockChart>>,
    attempts: Mutex<Vec<String>>,
    logins: Mutex<Vec<Credentials>>,
    fail_parse: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RenderError> {
    mutex
        .lock()
        .map_err(|e| RenderError::MalformedOutput(format!("mock mutex poisoned: {e}")))
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load charts from a JSON fixture file:
    /// `{"charts": {"<location>": {"metadata": {...}, "manifest": "..."}}}`.
    pub fn from_fixtures(path: &Path) -> Result<Self, RenderError> {
        let content = std::fs::read_to_string(path)?;
        let fixtures: Fixtures = serde_json::from_str(&content).map_err(|e| {
            RenderError::MalformedOutput(format!("invalid mock fixtures {}: {e}", path.display()))
        })?;
        let engine = Self {
            charts: Mutex::new(fixtures.charts),
            ..Self::default()
        };
        engine.set_fail_parse(fixtures.fail_parse);
        Ok(engine)
    }

    pub fn insert(&self, location: &str, chart: MockChart) {
        if let Ok(mut charts) = self.charts.lock() {
            charts.insert(location.to_owned(), chart);
        }
    }

    /// Register a chart with metadata and a manifest.
    #[must_use]
    pub fn with_chart(self, location: &str, metadata: ChartMetadata, manifest: &str) -> Self {
        self.insert(
            location,
            MockChart {
                metadata: Some(metadata),
                manifest: manifest.to_owned(),
                ..MockChart::default()
            },
        );
        self
    }

    pub fn set_fail_parse(&self, fail: bool) {
        self.fail_parse.store(fail, Ordering::SeqCst);
    }

    /// Locations passed to `render`, in call order.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn clear_attempts(&self) {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.clear();
        }
    }

    pub fn logins(&self) -> Vec<Credentials> {
        self.logins.lock().map(|l| l.clone()).unwrap_or_default()
    }

    fn lookup(&self, location: &str) -> Result<MockChart, RenderError> {
        lock(&self.charts)?
            .get(location)
            .cloned()
            .ok_or_else(|| RenderError::ChartNotFound(location.to_owned()))
    }
}

impl RenderEngine for MockEngine {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn available(&self) -> bool {
        true
    }

    fn render(&self, request: &RenderRequest) -> Result<Option<RenderedChart>, RenderError> {
        lock(&self.attempts)?.push(request.location.to_string());
        let chart = self.lookup(&request.location)?;
        if chart.empty {
            return Ok(None);
        }
        Ok(Some(RenderedChart {
            metadata: chart.metadata,
            manifest: chart.manifest,
        }))
    }

    fn parse(
        &self,
        request: &RenderRequest,
        host_network: bool,
    ) -> Result<Vec<Application>, RenderError> {
        if self.fail_parse.load(Ordering::SeqCst) {
            return Err(RenderError::MalformedOutput(
                "mock parse failure".to_owned(),
            ));
        }
        let chart = self.lookup(&request.location)?;
        match chart.applications {
            Some(apps) => Ok(apps),
            None => decode_applications(&chart.manifest, host_network),
        }
    }

    fn authenticate(&self, credentials: &Credentials) -> Result<(), RenderError> {
        if credentials.username.is_empty() {
            return Err(RenderError::Credentials("username is required".to_owned()));
        }
        lock(&self.logins)?.push(credentials.clone());
        Ok(())
    }
}
