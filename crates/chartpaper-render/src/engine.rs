use crate::credentials::Credentials;
use crate::RenderError;
use chartpaper_schema::{Application, ChartMetadata, Location};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What to render: a chart location plus value overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenderRequest {
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values_path: Option<PathBuf>,
    #[serde(default)]
    pub set_values: Vec<String>,
}

impl RenderRequest {
    pub fn new(location: impl Into<Location>) -> Self {
        Self {
            location: location.into(),
            ..Self::default()
        }
    }
}

/// Output of a render: the chart's own metadata when the engine could read
/// it, and the rendered multi-document manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenderedChart {
    #[serde(default)]
    pub metadata: Option<ChartMetadata>,
    #[serde(default)]
    pub manifest: String,
}

pub trait RenderEngine: Send + Sync {
    fn name(&self) -> &str;

    fn available(&self) -> bool;

    /// Render `request`. `Ok(None)` means the engine produced nothing for
    /// the location; callers treat it like a failure.
    fn render(&self, request: &RenderRequest) -> Result<Option<RenderedChart>, RenderError>;

    /// Decode workloads from the chart. With `host_network`, container
    /// ports are published on the same host port.
    fn parse(
        &self,
        request: &RenderRequest,
        host_network: bool,
    ) -> Result<Vec<Application>, RenderError>;

    fn authenticate(&self, _credentials: &Credentials) -> Result<(), RenderError> {
        Err(RenderError::EngineUnavailable(format!(
            "{} engine does not support registry login",
            self.name()
        )))
    }
}

impl<T: RenderEngine + ?Sized> RenderEngine for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn available(&self) -> bool {
        (**self).available()
    }

    fn render(&self, request: &RenderRequest) -> Result<Option<RenderedChart>, RenderError> {
        (**self).render(request)
    }

    fn parse(
        &self,
        request: &RenderRequest,
        host_network: bool,
    ) -> Result<Vec<Application>, RenderError> {
        (**self).parse(request, host_network)
    }

    fn authenticate(&self, credentials: &Credentials) -> Result<(), RenderError> {
        (**self).authenticate(credentials)
    }
}

/// Engine construction settings, taken from the `[engine]` config table.
#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub helm_binary: Option<PathBuf>,
    pub mock_fixtures: Option<PathBuf>,
}

pub fn select_engine(
    name: &str,
    settings: &EngineSettings,
) -> Result<Box<dyn RenderEngine>, RenderError> {
    match name {
        "helm" => Ok(Box::new(match &settings.helm_binary {
            Some(binary) => crate::helm::HelmEngine::with_binary(binary),
            None => crate::helm::HelmEngine::new(),
        })),
        "mock" => Ok(Box::new(match &settings.mock_fixtures {
            Some(path) => crate::mock::MockEngine::from_fixtures(path)?,
            None => crate::mock::MockEngine::new(),
        })),
        other => Err(RenderError::EngineUnavailable(other.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_valid_engines() {
        let settings = EngineSettings::default();
        assert_eq!(select_engine("helm", &settings).unwrap().name(), "helm");
        assert_eq!(select_engine("mock", &settings).unwrap().name(), "mock");
    }

    #[test]
    fn shared_engine_delegates() {
        let shared = std::sync::Arc::new(crate::mock::MockEngine::new());
        let engine: Box<dyn RenderEngine> = Box::new(std::sync::Arc::clone(&shared));
        assert_eq!(engine.name(), "mock");
        assert!(engine.render(&RenderRequest::new("oci://r/x")).is_err());
        assert_eq!(shared.attempts(), vec!["oci://r/x"]);
    }

    #[test]
    fn select_invalid_engine_fails() {
        assert!(select_engine("kustomize", &EngineSettings::default()).is_err());
    }

    #[test]
    fn select_mock_with_missing_fixtures_fails() {
        let settings = EngineSettings {
            mock_fixtures: Some(PathBuf::from("/nonexistent/fixtures.json")),
            ..EngineSettings::default()
        };
        assert!(select_engine("mock", &settings).is_err());
    }
}
