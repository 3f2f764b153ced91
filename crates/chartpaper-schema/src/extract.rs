//! Heuristic fact extraction from rendered multi-document manifests.
//!
//! The scan is line-oriented and deliberately not a YAML parse: rendered
//! manifests are already the output of a templating step, and only a handful
//! of facts are needed. Stored facts were produced by this exact scan, so its
//! edge-case behavior (an `image:` inside a comment, a `path:` key nested in an
//! unrelated block of an Ingress document) must not change.

use serde::{Deserialize, Serialize};

/// Placeholder for a tag that could not be determined.
pub const NOT_AVAILABLE: &str = "N/A";

const DOCUMENT_SEPARATOR: &str = "---";

/// Facts recovered from a rendered manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManifestFacts {
    pub image_tag: String,
    pub canary_tag: String,
    pub container_images: Vec<String>,
    pub ingress_paths: Vec<String>,
    pub service_ports: Vec<String>,
}

impl Default for ManifestFacts {
    fn default() -> Self {
        Self {
            image_tag: NOT_AVAILABLE.to_owned(),
            canary_tag: NOT_AVAILABLE.to_owned(),
            container_images: Vec::new(),
            ingress_paths: Vec::new(),
            service_ports: Vec::new(),
        }
    }
}

impl ManifestFacts {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// `image_tag` as an option, `None` when it is the placeholder.
    pub fn image_tag(&self) -> Option<&str> {
        available(&self.image_tag)
    }

    /// `canary_tag` as an option, `None` when it is the placeholder.
    pub fn canary_tag(&self) -> Option<&str> {
        available(&self.canary_tag)
    }

    fn record_image(&mut self, image_ref: &str) {
        if !image_ref.is_empty() && !self.container_images.iter().any(|i| i == image_ref) {
            self.container_images.push(image_ref.to_owned());
        }

        if image_ref.contains(':') {
            let tag = image_ref.rsplit(':').next().unwrap_or("");
            if self.image_tag == NOT_AVAILABLE {
                self.image_tag = tag.to_owned();
            }
            if tag.to_lowercase().contains("canary") && self.canary_tag == NOT_AVAILABLE {
                self.canary_tag = tag.to_owned();
            }
        }
    }
}

fn available(tag: &str) -> Option<&str> {
    if tag == NOT_AVAILABLE {
        None
    } else {
        Some(tag)
    }
}

fn trim_quotes(value: &str) -> &str {
    value.trim_matches(|c| c == '"' || c == '\'')
}

/// Text between the first and second colon, trimmed of whitespace and then quotes.
fn second_field(line: &str) -> Option<&str> {
    line.split(':').nth(1).map(|v| trim_quotes(v.trim()))
}

/// Everything after the first colon, trimmed of whitespace and then quotes.
fn after_first_colon(line: &str) -> Option<&str> {
    line.split_once(':').map(|(_, v)| trim_quotes(v.trim()))
}

#[derive(Default)]
struct ScanState<'a> {
    current_kind: &'a str,
    in_ingress: bool,
    in_service: bool,
    in_spec: bool,
}

/// Scan `manifest` and collect image tags, container images, ingress paths,
/// and service ports. Never fails; empty or unrecognizable input yields
/// [`ManifestFacts::default`].
pub fn extract_manifest_facts(manifest: &str) -> ManifestFacts {
    let mut facts = ManifestFacts::default();

    for document in manifest.split(DOCUMENT_SEPARATOR) {
        let document = document.trim();
        if document.is_empty() {
            continue;
        }

        let mut state = ScanState::default();
        for line in document.split('\n') {
            let line = line.trim();

            if line.starts_with("kind:") {
                if let Some(kind) = line.split(':').nth(1) {
                    state.current_kind = kind.trim();
                    state.in_ingress = state.current_kind == "Ingress";
                    state.in_service = state.current_kind == "Service";
                }
            }

            if line.starts_with("spec:") {
                state.in_spec = true;
            }

            if line.contains("image:") && !line.contains("imagePullPolicy") {
                if let Some(image_ref) = after_first_colon(line) {
                    facts.record_image(image_ref);
                }
            }

            if state.in_ingress && line.contains("path:") {
                if let Some(path) = second_field(line) {
                    if !path.is_empty() && path != "/" {
                        facts.ingress_paths.push(path.to_owned());
                    }
                }
            }

            if state.in_service && state.in_spec && line.contains("port:") {
                if let Some(port) = second_field(line) {
                    if !port.is_empty() {
                        facts.service_ports.push(port.to_owned());
                    }
                }
            }
        }
    }

    facts
}
