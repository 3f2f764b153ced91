use crate::credentials::Credentials;
use crate::engine::{RenderEngine, RenderRequest, RenderedChart};
use crate::workloads::decode_applications;
use crate::RenderError;
use chartpaper_schema::{parse_chart_yaml, Application};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

const RELEASE_NAME: &str = "chartpaper";

/// Renders charts by shelling out to the `helm` binary.
pub struct HelmEngine {
    binary: PathBuf,
}

impl Default for HelmEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl HelmEngine {
    pub fn new() -> Self {
        Self::with_binary("helm")
    }

    pub fn with_binary(binary: impl AsRef<Path>) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
        }
    }

    /// Chart reference arguments. `https://host/repo/<chart>` names a chart
    /// inside a classic repository, which helm only resolves through `--repo`;
    /// packaged `.tgz` URLs and every other location pass through as-is.
    fn chart_ref(location: &str) -> Vec<String> {
        let is_http = location.starts_with("http://") || location.starts_with("https://");
        if is_http && !location.ends_with(".tgz") {
            let trimmed = location.trim_end_matches('/');
            if let Some((repo, chart)) = trimmed.rsplit_once('/') {
                if !chart.is_empty() && !repo.ends_with('/') {
                    return vec![chart.to_owned(), "--repo".to_owned(), repo.to_owned()];
                }
            }
        }
        vec![location.to_owned()]
    }

    fn template_args(request: &RenderRequest) -> Vec<String> {
        let mut args = vec!["template".to_owned(), RELEASE_NAME.to_owned()];
        args.extend(Self::chart_ref(request.location.as_str()));
        if let Some(values) = &request.values_path {
            args.push("-f".to_owned());
            args.push(values.display().to_string());
        }
        for set in &request.set_values {
            args.push("--set".to_owned());
            args.push(set.clone());
        }
        args
    }

    fn run(&self, args: &[String], stdin: Option<&str>) -> Result<String, RenderError> {
        let command = format!("{} {}", self.binary.display(), args.join(" "));
        debug!("running {command}");

        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    RenderError::EngineUnavailable(self.binary.display().to_string())
                } else {
                    RenderError::Io(e)
                }
            })?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes())?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(RenderError::CommandFailed {
                command,
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        String::from_utf8(output.stdout)
            .map_err(|e| RenderError::MalformedOutput(format!("helm output is not UTF-8: {e}")))
    }

    fn template(&self, request: &RenderRequest) -> Result<String, RenderError> {
        self.run(&Self::template_args(request), None)
    }
}

impl RenderEngine for HelmEngine {
    fn name(&self) -> &'static str {
        "helm"
    }

    fn available(&self) -> bool {
        Command::new(&self.binary)
            .args(["version", "--short"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|s| s.success())
    }

    fn render(&self, request: &RenderRequest) -> Result<Option<RenderedChart>, RenderError> {
        let mut show = vec!["show".to_owned(), "chart".to_owned()];
        show.extend(Self::chart_ref(request.location.as_str()));
        let chart_yaml = self.run(&show, None)?;
        let metadata = match parse_chart_yaml(&chart_yaml) {
            Ok(meta) => Some(meta),
            Err(e) => {
                warn!("unreadable Chart.yaml for {}: {e}", request.location);
                None
            }
        };

        let manifest = self.template(request)?;
        Ok(Some(RenderedChart { metadata, manifest }))
    }

    fn parse(
        &self,
        request: &RenderRequest,
        host_network: bool,
    ) -> Result<Vec<Application>, RenderError> {
        let manifest = self.template(request)?;
        decode_applications(&manifest, host_network)
    }

    fn authenticate(&self, credentials: &Credentials) -> Result<(), RenderError> {
        let args = [
            "registry".to_owned(),
            "login".to_owned(),
            credentials.registry.clone(),
            "--username".to_owned(),
            credentials.username.clone(),
            "--password-stdin".to_owned(),
        ];
        self.run(&args, Some(&credentials.password))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_args_include_overrides() {
        let mut request = RenderRequest::new("oci://registry-1.docker.io/bitnamicharts/redis");
        request.values_path = Some(PathBuf::from("/tmp/values.yaml"));
        request.set_values = vec!["auth.enabled=false".to_owned(), "replica.replicaCount=1".to_owned()];

        assert_eq!(
            HelmEngine::template_args(&request),
            vec![
                "template",
                "chartpaper",
                "oci://registry-1.docker.io/bitnamicharts/redis",
                "-f",
                "/tmp/values.yaml",
                "--set",
                "auth.enabled=false",
                "--set",
                "replica.replicaCount=1",
            ]
        );
    }

    #[test]
    fn classic_repo_urls_use_repo_flag() {
        assert_eq!(
            HelmEngine::chart_ref("https://charts.bitnami.com/bitnami/redis"),
            vec!["redis", "--repo", "https://charts.bitnami.com/bitnami"]
        );
        assert_eq!(
            HelmEngine::chart_ref("https://example.com/charts/nginx-15.3.1.tgz"),
            vec!["https://example.com/charts/nginx-15.3.1.tgz"]
        );
        assert_eq!(
            HelmEngine::chart_ref("oci://registry-1.docker.io/bitnamicharts/redis"),
            vec!["oci://registry-1.docker.io/bitnamicharts/redis"]
        );
        assert_eq!(HelmEngine::chart_ref("bitnami/redis"), vec!["bitnami/redis"]);

        let request = RenderRequest::new("https://charts.example.com/stable/api/");
        assert_eq!(
            HelmEngine::template_args(&request),
            vec!["template", "chartpaper", "api", "--repo", "https://charts.example.com/stable"]
        );
    }

    #[test]
    fn missing_binary_is_unavailable() {
        let engine = HelmEngine::with_binary("/nonexistent/helm-binary");
        assert!(!engine.available());
        let err = engine
            .render(&RenderRequest::new("oci://example/chart"))
            .unwrap_err();
        assert!(matches!(err, RenderError::EngineUnavailable(_)));
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_reports_stderr() {
        // `false` ignores its arguments and exits 1
        let engine = HelmEngine::with_binary("false");
        let err = engine
            .render(&RenderRequest::new("oci://example/chart"))
            .unwrap_err();
        match err {
            RenderError::CommandFailed { command, status, .. } => {
                assert!(command.contains("show chart"));
                assert_eq!(status, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
