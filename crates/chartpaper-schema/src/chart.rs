use crate::types::ChartName;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to parse chart metadata: {0}")]
    ParseYaml(#[from] serde_yaml::Error),
    #[error("chart metadata is missing '{0}'")]
    MissingField(&'static str),
    #[error("unknown chart kind: '{0}', expected 'application' or 'library'")]
    UnknownKind(String),
}

/// Helm chart type. Charts without a declared type are applications.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Application,
    Library,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartKind::Application => write!(f, "application"),
            ChartKind::Library => write!(f, "library"),
        }
    }
}

impl FromStr for ChartKind {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "application" | "" => Ok(ChartKind::Application),
            "library" => Ok(ChartKind::Library),
            other => Err(SchemaError::UnknownKind(other.to_owned())),
        }
    }
}

/// A dependency entry from `Chart.yaml`, copied verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub version: String,
    #[serde(default)]
    pub repository: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// The subset of `Chart.yaml` the catalog cares about. Unknown keys
/// (`appVersion`, `maintainers`, `annotations`, ...) are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    #[serde(default)]
    pub api_version: String,
    pub name: ChartName,
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type", deserialize_with = "deserialize_kind")]
    pub kind: ChartKind,
    #[serde(default, deserialize_with = "deserialize_null_as_empty")]
    pub dependencies: Vec<Dependency>,
}

fn deserialize_kind<'de, D>(deserializer: D) -> Result<ChartKind, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(ChartKind::Application),
        Some(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// Versions such as `1.0` are YAML floats unless quoted; keep them as written.
fn deserialize_scalar<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::Null => Ok(String::new()),
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a scalar version, found {other:?}"
        ))),
    }
}

fn deserialize_null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Dependency>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Dependency>>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn parse_chart_yaml(input: &str) -> Result<ChartMetadata, SchemaError> {
    let meta: ChartMetadata = serde_yaml::from_str(input)?;
    if meta.name.is_empty() {
        return Err(SchemaError::MissingField("name"));
    }
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REDIS_CHART: &str = r"
apiVersion: v2
name: redis
version: 18.6.1
appVersion: 7.2.4
description: Redis(R) is an open source, advanced key-value store.
type: application
dependencies:
  - name: common
    repository: oci://registry-1.docker.io/bitnamicharts
    tags:
      - bitnami-common
    version: 2.x.x
  - name: metrics
    version: 1.0.0
    repository: https://charts.example.com
    condition: metrics.enabled
";

    #[test]
    fn parse_full_chart() {
        let meta = parse_chart_yaml(REDIS_CHART).unwrap();
        assert_eq!(meta.name, "redis");
        assert_eq!(meta.version, "18.6.1");
        assert_eq!(meta.api_version, "v2");
        assert_eq!(meta.kind, ChartKind::Application);
        assert_eq!(meta.dependencies.len(), 2);
        assert_eq!(meta.dependencies[0].name, "common");
        assert_eq!(meta.dependencies[0].condition, None);
        assert_eq!(
            meta.dependencies[1].condition.as_deref(),
            Some("metrics.enabled")
        );
    }

    #[test]
    fn missing_type_defaults_to_application() {
        let meta = parse_chart_yaml("name: plain\nversion: 0.1.0\n").unwrap();
        assert_eq!(meta.kind, ChartKind::Application);
        assert!(meta.dependencies.is_empty());
        assert!(meta.description.is_empty());
    }

    #[test]
    fn library_kind_parses() {
        let meta = parse_chart_yaml("name: common\nversion: 2.0.0\ntype: library\n").unwrap();
        assert_eq!(meta.kind, ChartKind::Library);
    }

    #[test]
    fn null_dependencies_are_empty() {
        let meta = parse_chart_yaml("name: a\nversion: 1.0.0\ndependencies:\n").unwrap();
        assert!(meta.dependencies.is_empty());
    }

    #[test]
    fn numeric_version_is_kept_as_text() {
        let meta = parse_chart_yaml("name: a\nversion: 1.5\n").unwrap();
        assert_eq!(meta.version, "1.5");
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(parse_chart_yaml("name: a\ntype: plugin\n").is_err());
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = parse_chart_yaml("name: ''\nversion: 1.0.0\n").unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn kind_display_roundtrip() {
        for kind in [ChartKind::Application, ChartKind::Library] {
            assert_eq!(kind.to_string().parse::<ChartKind>().unwrap(), kind);
        }
    }
}
