use crate::app::Application;
use crate::chart::ChartMetadata;
use crate::extract::{ManifestFacts, NOT_AVAILABLE};
use serde::{Deserialize, Serialize};

/// Canonical result of fetching one chart: its metadata, the facts lifted
/// from its rendered manifest, and the workloads the engine found.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChartSummary {
    pub chart: ChartMetadata,
    pub image_tag: String,
    pub canary_tag: String,
    #[serde(
        default,
        rename = "manifestMetadata",
        skip_serializing_if = "Option::is_none"
    )]
    pub facts: Option<ManifestFacts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_digest: Option<String>,
    #[serde(default)]
    pub applications: Vec<Application>,
}

impl ChartSummary {
    /// A summary with no manifest facts attached yet.
    pub fn new(chart: ChartMetadata) -> Self {
        Self {
            chart,
            image_tag: NOT_AVAILABLE.to_owned(),
            canary_tag: NOT_AVAILABLE.to_owned(),
            facts: None,
            manifest_digest: None,
            applications: Vec::new(),
        }
    }

    /// Attach facts extracted from `manifest` and lift the primary tags.
    pub fn attach_facts(&mut self, manifest: &str, facts: ManifestFacts) {
        self.image_tag.clone_from(&facts.image_tag);
        self.canary_tag.clone_from(&facts.canary_tag);
        self.manifest_digest = Some(manifest_digest(manifest));
        self.facts = Some(facts);
    }
}

/// Hex blake3 digest of rendered manifest text.
pub fn manifest_digest(manifest: &str) -> String {
    blake3::hash(manifest.as_bytes()).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::parse_chart_yaml;
    use crate::extract::extract_manifest_facts;

    #[test]
    fn new_summary_has_placeholder_tags() {
        let meta = parse_chart_yaml("name: web\nversion: 1.0.0\n").unwrap();
        let summary = ChartSummary::new(meta);
        assert_eq!(summary.image_tag, NOT_AVAILABLE);
        assert_eq!(summary.canary_tag, NOT_AVAILABLE);
        assert!(summary.facts.is_none());
    }

    #[test]
    fn attach_facts_lifts_tags_and_digest() {
        let meta = parse_chart_yaml("name: web\nversion: 1.0.0\n").unwrap();
        let manifest = "kind: Deployment\nspec:\n  - image: web:2.0-canary\n";
        let mut summary = ChartSummary::new(meta);
        summary.attach_facts(manifest, extract_manifest_facts(manifest));
        assert_eq!(summary.image_tag, "2.0-canary");
        assert_eq!(summary.canary_tag, "2.0-canary");
        assert_eq!(
            summary.manifest_digest.as_deref(),
            Some(manifest_digest(manifest).as_str())
        );
    }

    #[test]
    fn digest_is_stable_hex() {
        let a = manifest_digest("kind: Service\n");
        assert_eq!(a, manifest_digest("kind: Service\n"));
        assert_eq!(a.len(), 64);
        assert_ne!(a, manifest_digest("kind: Ingress\n"));
    }

    #[test]
    fn json_uses_manifest_metadata_key() {
        let meta = parse_chart_yaml("name: web\nversion: 1.0.0\n").unwrap();
        let mut summary = ChartSummary::new(meta);
        summary.attach_facts("image: a:1", extract_manifest_facts("image: a:1"));
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["imageTag"], "1");
        assert_eq!(json["manifestMetadata"]["containerImages"][0], "a:1");
        assert_eq!(json["chart"]["name"], "web");
    }
}
