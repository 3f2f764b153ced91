use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A workload unit found in a rendered chart: one container of a
/// Deployment, StatefulSet, DaemonSet, Job or CronJob.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Application {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Port mappings, `"container"` or `"host:container"`.
    #[serde(default)]
    pub ports: Vec<String>,
    /// Environment-style configuration, `KEY -> value`.
    #[serde(default)]
    pub configs: BTreeMap<String, String>,
    /// Volume mounts, `volume name -> mount path`.
    #[serde(default)]
    pub mounts: BTreeMap<String, String>,
}

impl Application {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_fields_are_omitted() {
        let json = serde_json::to_value(Application::new("web")).unwrap();
        assert!(json.get("image").is_none());
        assert!(json.get("type").is_none());
        assert_eq!(json["ports"], serde_json::json!([]));
    }

    #[test]
    fn deserializes_with_missing_collections() {
        let app: Application =
            serde_json::from_str(r#"{"name":"api","image":"api:1.0","type":"Deployment"}"#)
                .unwrap();
        assert_eq!(app.kind.as_deref(), Some("Deployment"));
        assert!(app.ports.is_empty());
        assert!(app.mounts.is_empty());
    }
}
