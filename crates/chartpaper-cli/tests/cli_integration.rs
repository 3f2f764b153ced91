//! CLI subprocess integration tests.
//!
//! These tests invoke the `chartpaper` binary against the mock engine and a
//! temporary store, and verify exit codes, stdout content, and JSON output.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

fn deployment(name: &str, image: &str) -> String {
    format!(
        "kind: Deployment\nmetadata:\n  name: {name}\nspec:\n  template:\n    spec:\n      containers:\n      - name: {name}\n        image: {image}\n"
    )
}

/// A scratch catalog: a fixtures file, a config file, and a store directory.
struct Workspace {
    dir: tempfile::TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let fixtures = dir.path().join("fixtures.json");
        let charts = serde_json::json!({
            "charts": {
                "oci://r/web": {
                    "metadata": {
                        "name": "web",
                        "version": "1.0.0",
                        "description": "web frontend",
                        "dependencies": [
                            {"name": "redis", "version": "18.x"},
                            {"name": "ghost", "version": "1.x"}
                        ]
                    },
                    "manifest": deployment("web", "ghcr.io/acme/web:1.0.0")
                },
                "oci://r/web:2.0.0": {
                    "metadata": {"name": "web", "version": "2.0.0"},
                    "manifest": deployment("web", "ghcr.io/acme/web:2.0.0")
                },
                "oci://registry-1.docker.io/bitnamicharts/redis": {
                    "metadata": {"name": "redis", "version": "18.1.0"},
                    "manifest": deployment("redis", "bitnami/redis:7.2.4")
                }
            }
        });
        std::fs::write(&fixtures, serde_json::to_string(&charts).unwrap()).unwrap();

        let config = dir.path().join("chartpaper.toml");
        std::fs::write(
            &config,
            format!(
                "store_dir = {:?}\ncredentials_path = {:?}\n\n[engine]\nkind = \"mock\"\nmock_fixtures = {:?}\n",
                dir.path().join("store").display().to_string(),
                dir.path().join("credentials.json").display().to_string(),
                fixtures.display().to_string(),
            ),
        )
        .unwrap();
        Self { dir, config }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_chartpaper"));
        cmd.env_remove("CHARTPAPER_STORE")
            .env_remove("CHARTPAPER_LOG")
            .arg("--config")
            .arg(&self.config)
            .stdin(Stdio::null());
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.cmd().args(args).output().unwrap()
    }

    fn run_ok(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "{args:?} must exit 0. stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    fn run_json(&self, args: &[&str]) -> serde_json::Value {
        let mut full = vec!["--json"];
        full.extend_from_slice(args);
        let stdout = self.run_ok(&full);
        serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("invalid JSON ({e}): {stdout}"))
    }

    fn run_with_stdin(&self, args: &[&str], input: &str) -> Output {
        let mut child = self
            .cmd()
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        child
            .stdin
            .take()
            .unwrap()
            .write_all(input.as_bytes())
            .unwrap();
        child.wait_with_output().unwrap()
    }
}

#[test]
fn cli_version_exits_zero() {
    let output = Command::new(env!("CARGO_BIN_EXE_chartpaper"))
        .arg("--version")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("chartpaper"));
}

#[test]
fn cli_help_lists_commands() {
    let output = Command::new(env!("CARGO_BIN_EXE_chartpaper"))
        .arg("--help")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["fetch", "list", "versions", "switch", "resolve", "registry"] {
        assert!(stdout.contains(command), "help must list '{command}'");
    }
}

#[test]
fn cli_list_on_empty_store() {
    let ws = Workspace::new();
    assert!(ws.run_ok(&["list"]).contains("no charts stored"));
    assert_eq!(ws.run_json(&["list"]), serde_json::json!([]));
}

#[test]
fn cli_fetch_then_show() {
    let ws = Workspace::new();
    let stdout = ws.run_ok(&["fetch", "oci://r/web"]);
    assert!(stdout.contains("stored web 1.0.0"), "got: {stdout}");

    let list = ws.run_json(&["list"]);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["name"], "web");
    assert_eq!(list[0]["image_tag"], "1.0.0");
    assert_eq!(list[0]["source"], "oci://r/web");

    let detail = ws.run_json(&["show", "web"]);
    assert_eq!(detail["version"], "1.0.0");
    assert_eq!(detail["description"], "web frontend");
    assert_eq!(detail["dependencies"].as_array().unwrap().len(), 2);
    assert_eq!(detail["applications"][0]["name"], "web");
    assert_eq!(detail["applications"][0]["image"], "ghcr.io/acme/web:1.0.0");

    let refetch = ws.run_json(&["fetch", "oci://r/web"]);
    assert_eq!(refetch["created"], false);
    assert_eq!(refetch["stored"]["id"], detail["id"]);
}

#[test]
fn cli_fetch_unknown_location_exits_with_fetch_error() {
    let ws = Workspace::new();
    let output = ws.run(&["fetch", "oci://r/nope"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to fetch chart"), "got: {stderr}");
    assert!(stderr.contains("oci://r/nope"), "got: {stderr}");
}

#[test]
fn cli_show_unknown_chart_fails() {
    let ws = Workspace::new();
    let output = ws.run(&["show", "missing"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("chart not found"));
}

#[test]
fn cli_versions_and_switch() {
    let ws = Workspace::new();
    ws.run_ok(&["fetch", "oci://r/web"]);
    ws.run_ok(&["fetch", "oci://r/web:2.0.0"]);

    let versions = ws.run_json(&["versions", "web"]);
    let versions = versions.as_array().unwrap();
    assert_eq!(versions.len(), 2);
    let current: Vec<&str> = versions
        .iter()
        .filter(|v| v["is_current"] == true)
        .map(|v| v["version"].as_str().unwrap())
        .collect();
    assert_eq!(current, vec!["2.0.0"]);

    assert!(ws.run_ok(&["switch", "web", "1.0.0"]).contains("switched web to version 1.0.0"));
    assert_eq!(ws.run_json(&["show", "web"])["version"], "1.0.0");

    let output = ws.run(&["switch", "web", "9.9.9"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
    assert_eq!(ws.run_json(&["show", "web"])["version"], "1.0.0");
}

#[test]
fn cli_delete_requires_confirmation_without_tty() {
    let ws = Workspace::new();
    ws.run_ok(&["fetch", "oci://r/web"]);

    let output = ws.run(&["delete", "web"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--yes"));
    assert_eq!(ws.run_json(&["list"]).as_array().unwrap().len(), 1);

    let deleted = ws.run_json(&["delete", "web", "--yes"]);
    assert_eq!(deleted["deleted"], 1);
    assert_eq!(ws.run_json(&["list"]), serde_json::json!([]));
}

#[test]
fn cli_delete_single_version() {
    let ws = Workspace::new();
    ws.run_ok(&["fetch", "oci://r/web"]);
    ws.run_ok(&["fetch", "oci://r/web:2.0.0"]);

    ws.run_ok(&["delete", "web", "--version", "1.0.0", "--yes"]);
    let versions = ws.run_json(&["versions", "web"]);
    assert_eq!(versions.as_array().unwrap().len(), 1);
    assert_eq!(versions[0]["version"], "2.0.0");
}

#[test]
fn cli_deps_and_resolve() {
    let ws = Workspace::new();
    ws.run_ok(&["fetch", "oci://r/web"]);

    let deps = ws.run_json(&["deps", "web"]);
    assert_eq!(deps["count"], 2);
    assert_eq!(deps["dependencies"][0]["name"], "redis");
    assert_eq!(deps["dependencies"][0]["resolved"], false);

    // ghost exists in no candidate registry, so resolve reports a failure
    let output = ws.run(&["--json", "resolve", "web"]);
    assert_eq!(output.status.code(), Some(1));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["total_dependencies"], 2);
    assert_eq!(report["fetched_charts"].as_array().unwrap().len(), 1);
    assert_eq!(report["fetched_charts"][0]["chart"]["name"], "redis");
    let errors = report["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].as_str().unwrap().starts_with("ghost:"));

    let redis = ws.run_json(&["show", "redis"]);
    assert_eq!(redis["source"], "oci://registry-1.docker.io/bitnamicharts/redis");
    assert_eq!(redis["image_tag"], "7.2.4");
    let deps = ws.run_json(&["deps", "web"]);
    assert_eq!(deps["dependencies"][0]["resolved"], true);
}

#[test]
fn cli_login_with_saved_credentials() {
    let ws = Workspace::new();
    let output = ws.run(&["login"]);
    assert_eq!(output.status.code(), Some(1), "no credentials file yet");

    let output = ws.run_with_stdin(
        &[
            "--json",
            "login",
            "--registry",
            "ghcr.io",
            "--username",
            "deploy",
            "--password-stdin",
        ],
        "s3cret\n",
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["status"], "authenticated");
    assert_eq!(payload["registry"], "ghcr.io");
    assert!(!String::from_utf8_lossy(&output.stdout).contains("s3cret"));

    let saved: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(ws.path().join("credentials.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(saved["username"], "deploy");

    assert!(ws.run_ok(&["login"]).contains("logged in to ghcr.io as deploy"));
}

#[test]
fn cli_registry_lifecycle() {
    let ws = Workspace::new();
    assert!(ws.run_ok(&["registry", "list"]).contains("no registry configurations"));

    let first = ws.run_json(&["registry", "add", "hub", "https://registry-1.docker.io", "--default"]);
    assert_eq!(first["is_default"], true);
    let output = ws.run(&["registry", "add", "hub", "https://mirror.example.com"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("'hub' already exists"));

    let output = ws.run_with_stdin(
        &[
            "--json",
            "registry",
            "add",
            "ghcr",
            "https://ghcr.io",
            "--username",
            "bot",
            "--password-stdin",
        ],
        "token\n",
    );
    assert!(output.status.success());
    let second: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(second.get("password").is_none());

    let id = second["id"].as_i64().unwrap().to_string();
    ws.run_ok(&["registry", "set-default", &id]);
    let list = ws.run_json(&["registry", "list"]);
    let defaults: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .filter(|r| r["is_default"] == true)
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(defaults, vec!["ghcr"]);

    ws.run_ok(&["registry", "remove", &id]);
    assert_eq!(ws.run_json(&["registry", "list"]).as_array().unwrap().len(), 1);
    let output = ws.run(&["registry", "remove", &id]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn cli_store_flag_overrides_config() {
    let ws = Workspace::new();
    let other = ws.path().join("other-store");
    ws.run_ok(&["--store", &other.to_string_lossy(), "fetch", "oci://r/web"]);
    assert!(other.exists());
    assert_eq!(ws.run_json(&["list"]), serde_json::json!([]));
}

#[test]
fn cli_unknown_engine_is_rejected() {
    let ws = Workspace::new();
    let output = ws.run(&["--engine", "kustomize", "list"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("kustomize"));
}

#[test]
fn cli_completions_and_man_pages() {
    let output = Command::new(env!("CARGO_BIN_EXE_chartpaper"))
        .args(["completions", "bash"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("chartpaper"));

    let dir = tempfile::tempdir().unwrap();
    let man_dir = dir.path().join("man");
    let output = Command::new(env!("CARGO_BIN_EXE_chartpaper"))
        .args(["man-pages", &man_dir.to_string_lossy()])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(man_dir.join("chartpaper.1").exists());
    assert!(man_dir.join("chartpaper-fetch.1").exists());
}
