//! Workload decoding from rendered manifests.
//!
//! Unlike the fact scan in `chartpaper_schema::extract`, this is a real YAML
//! decode: every document is parsed and pod templates are walked for
//! containers.

use crate::RenderError;
use chartpaper_schema::Application;
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;

const POD_TEMPLATE_KINDS: &[&str] = &["Deployment", "StatefulSet", "DaemonSet", "ReplicaSet", "Job"];

fn get<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, key| v.get(*key))
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn pod_spec<'a>(kind: &str, doc: &'a Value) -> Option<&'a Value> {
    if POD_TEMPLATE_KINDS.contains(&kind) {
        get(doc, &["spec", "template", "spec"])
    } else if kind == "CronJob" {
        get(doc, &["spec", "jobTemplate", "spec", "template", "spec"])
    } else {
        None
    }
}

fn container_ports(container: &Value, host_network: bool) -> Vec<String> {
    let Some(ports) = container.get("ports").and_then(Value::as_sequence) else {
        return Vec::new();
    };
    ports
        .iter()
        .filter_map(|port| {
            let container_port = port.get("containerPort").and_then(scalar)?;
            let host_port = port.get("hostPort").and_then(scalar);
            Some(match (host_network, host_port) {
                (true, _) => format!("{container_port}:{container_port}"),
                (false, Some(host)) => format!("{host}:{container_port}"),
                (false, None) => container_port,
            })
        })
        .collect()
}

fn named_pairs(container: &Value, list: &str, key: &str, value: &str) -> BTreeMap<String, String> {
    container
        .get(list)
        .and_then(Value::as_sequence)
        .into_iter()
        .flatten()
        .filter_map(|entry| {
            let k = entry.get(key).and_then(scalar)?;
            let v = entry.get(value).and_then(scalar)?;
            Some((k, v))
        })
        .collect()
}

/// Decode one [`Application`] per container of every pod-bearing workload.
///
/// Single-container workloads are named after the workload; otherwise each
/// application is `<workload>-<container>`. Environment variables sourced
/// from `valueFrom` are skipped.
pub fn decode_applications(
    manifest: &str,
    host_network: bool,
) -> Result<Vec<Application>, RenderError> {
    let mut apps = Vec::new();

    for document in serde_yaml::Deserializer::from_str(manifest) {
        let doc = Value::deserialize(document)
            .map_err(|e| RenderError::MalformedOutput(format!("manifest is not YAML: {e}")))?;
        let Some(kind) = doc.get("kind").and_then(Value::as_str) else {
            continue;
        };
        let Some(spec) = pod_spec(kind, &doc) else {
            continue;
        };
        let workload = get(&doc, &["metadata", "name"])
            .and_then(scalar)
            .unwrap_or_default();

        let containers: Vec<&Value> = spec
            .get("containers")
            .and_then(Value::as_sequence)
            .map(|c| c.iter().collect())
            .unwrap_or_default();
        let single = containers.len() == 1;

        for container in containers {
            let container_name = container.get("name").and_then(scalar).unwrap_or_default();
            let name = if single && !workload.is_empty() {
                workload.clone()
            } else if workload.is_empty() {
                container_name
            } else {
                format!("{workload}-{container_name}")
            };

            apps.push(Application {
                name,
                image: container.get("image").and_then(scalar),
                kind: Some(kind.to_owned()),
                ports: container_ports(container, host_network),
                configs: named_pairs(container, "env", "name", "value"),
                mounts: named_pairs(container, "volumeMounts", "name", "mountPath"),
            });
        }
    }

    Ok(apps)
}
