use chartpaper_schema::{Application, ChartKind, ChartName, Location, ManifestFacts, NOT_AVAILABLE};
use rusqlite::types::Type;
use rusqlite::Row;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One stored snapshot of a chart at one version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChartRecord {
    pub id: i64,
    pub name: ChartName,
    pub version: String,
    pub description: String,
    pub kind: ChartKind,
    pub source: Location,
    pub image_tag: Option<String>,
    pub canary_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facts: Option<ManifestFacts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_digest: Option<String>,
    pub fetched_at: String,
    pub is_current: bool,
}

pub(crate) const CHART_COLUMNS: &str = "id, name, version, description, kind, source, \
     image_tag, canary_tag, container_images, ingress_paths, service_ports, \
     manifest_digest, fetched_at, is_current";

impl ChartRecord {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let kind: String = row.get(4)?;
        let image_tag: Option<String> = row.get(6)?;
        let canary_tag: Option<String> = row.get(7)?;
        let container_images: Option<Vec<String>> = json_column(row, 8)?;
        let ingress_paths: Option<Vec<String>> = json_column(row, 9)?;
        let service_ports: Option<Vec<String>> = json_column(row, 10)?;

        // facts are written together; a row without images was never scanned
        let facts = container_images.map(|container_images| ManifestFacts {
            image_tag: image_tag.clone().unwrap_or_else(|| NOT_AVAILABLE.to_owned()),
            canary_tag: canary_tag.clone().unwrap_or_else(|| NOT_AVAILABLE.to_owned()),
            container_images,
            ingress_paths: ingress_paths.unwrap_or_default(),
            service_ports: service_ports.unwrap_or_default(),
        });

        Ok(Self {
            id: row.get(0)?,
            name: ChartName::new(row.get::<_, String>(1)?),
            version: row.get(2)?,
            description: row.get(3)?,
            kind: kind.parse().unwrap_or_default(),
            source: Location::new(row.get::<_, String>(5)?),
            image_tag,
            canary_tag,
            facts,
            manifest_digest: row.get(11)?,
            fetched_at: row.get(12)?,
            is_current: row.get(13)?,
        })
    }
}

/// A declared dependency of one stored chart version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DependencyEdge {
    pub id: i64,
    pub chart_id: i64,
    pub name: String,
    pub version: String,
    pub repository: Option<String>,
    pub condition: Option<String>,
    pub image_tag: Option<String>,
    pub canary_tag: Option<String>,
    /// Whether any version of the dependency is stored. Computed at read time.
    pub resolved: bool,
}

pub(crate) const EDGE_QUERY: &str = "SELECT d.id, d.chart_id, d.name, d.version, d.repository, \
     d.condition, d.image_tag, d.canary_tag, \
     EXISTS(SELECT 1 FROM charts c WHERE c.name = d.name) \
     FROM dependencies d WHERE d.chart_id = ?1 ORDER BY d.id";

impl DependencyEdge {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            chart_id: row.get(1)?,
            name: row.get(2)?,
            version: row.get(3)?,
            repository: row.get(4)?,
            condition: row.get(5)?,
            image_tag: row.get(6)?,
            canary_tag: row.get(7)?,
            resolved: row.get(8)?,
        })
    }
}

/// Image tags learned for a dependency by fetching it ahead of the write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyTags {
    pub image_tag: Option<String>,
    pub canary_tag: Option<String>,
}

impl DependencyTags {
    pub fn from_facts(facts: &ManifestFacts) -> Self {
        Self {
            image_tag: facts.image_tag().map(str::to_owned),
            canary_tag: facts.canary_tag().map(str::to_owned),
        }
    }
}

/// A workload found in one stored chart version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplicationRecord {
    pub id: i64,
    pub chart_id: i64,
    pub name: String,
    pub image: Option<String>,
    pub kind: Option<String>,
    pub ports: Vec<String>,
    pub configs: BTreeMap<String, String>,
    pub mounts: BTreeMap<String, String>,
}

pub(crate) const APP_QUERY: &str = "SELECT id, chart_id, name, image, app_type, ports, configs, mounts \
     FROM apps WHERE chart_id = ?1 ORDER BY id";

impl ApplicationRecord {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            chart_id: row.get(1)?,
            name: row.get(2)?,
            image: row.get(3)?,
            kind: row.get(4)?,
            ports: json_column(row, 5)?.unwrap_or_default(),
            configs: json_column(row, 6)?.unwrap_or_default(),
            mounts: json_column(row, 7)?.unwrap_or_default(),
        })
    }
}

impl From<ApplicationRecord> for Application {
    fn from(record: ApplicationRecord) -> Self {
        Application {
            name: record.name,
            image: record.image,
            kind: record.kind,
            ports: record.ports,
            configs: record.configs,
            mounts: record.mounts,
        }
    }
}

/// A named registry endpoint. The password is never serialized.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RegistryConfig {
    pub id: i64,
    pub name: String,
    pub registry_url: String,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub is_default: bool,
    pub created_at: String,
    pub updated_at: String,
}

pub(crate) const REGISTRY_COLUMNS: &str =
    "id, name, registry_url, username, password, is_default, created_at, updated_at";

impl RegistryConfig {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            registry_url: row.get(2)?,
            username: row.get(3)?,
            password: row.get(4)?,
            is_default: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

/// Fields accepted when creating or updating a registry config.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistryConfigInput {
    pub name: String,
    pub registry_url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

/// JSON text column decoded into `T`; SQL NULL is `None`.
pub(crate) fn json_column<T: DeserializeOwned>(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|text| {
        serde_json::from_str(&text)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

/// `"N/A"` and empty tags are stored as NULL.
pub(crate) fn tag_column(tag: &str) -> Option<&str> {
    if tag.is_empty() || tag == NOT_AVAILABLE {
        None
    } else {
        Some(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_column_drops_placeholder() {
        assert_eq!(tag_column(NOT_AVAILABLE), None);
        assert_eq!(tag_column(""), None);
        assert_eq!(tag_column("1.2.3"), Some("1.2.3"));
    }

    #[test]
    fn dependency_tags_from_default_facts_are_empty() {
        assert_eq!(
            DependencyTags::from_facts(&ManifestFacts::default()),
            DependencyTags::default()
        );
    }

    #[test]
    fn registry_config_hides_password() {
        let config = RegistryConfig {
            id: 1,
            name: "docker".to_owned(),
            registry_url: "registry-1.docker.io".to_owned(),
            username: Some("me".to_owned()),
            password: Some("hunter2".to_owned()),
            is_default: true,
            created_at: "t".to_owned(),
            updated_at: "t".to_owned(),
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(json.contains("\"is_default\":true"));
    }

    #[test]
    fn registry_input_defaults_optional_fields() {
        let input: RegistryConfigInput =
            serde_json::from_str(r#"{"name":"ghcr","registry_url":"ghcr.io"}"#).unwrap();
        assert!(!input.is_default);
        assert!(input.username.is_none());
    }
}
