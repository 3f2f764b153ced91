//! HTTP API for the Chartpaper catalog.
//!
//! Every route under `/chartpaper/api` maps onto one [`Catalog`] operation;
//! `/healthz` and `/livez` are the probes. A fixed pool of worker threads
//! pulls requests from one `tiny_http::Server`; the catalog serializes its
//! own store access.
//!
//! The [`TestServer`] helper starts a server on a random port for integration testing.

use chartpaper_core::{Catalog, CoreError, FetchRequest};
use chartpaper_store::{RegistryConfigInput, StoreError};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::Read;
use std::sync::Arc;
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};
use tracing::{debug, error, info, warn};

pub const API_PREFIX: &str = "/chartpaper/api";

/// A parsed request path. Method dispatch happens in [`handle_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route<'a> {
    Health,
    Live,
    FetchChart,
    Charts,
    Chart(&'a str),
    Versions(&'a str),
    Version(&'a str, &'a str),
    Dependencies(&'a str),
    FetchDependencies(&'a str),
    SwitchVersion(&'a str),
    DockerConfig,
    Authenticate,
    Registries,
    Registry(&'a str),
    RegistryDefault(&'a str),
}

/// Parse a URL path (query string ignored) into a [`Route`].
pub fn parse_route(url: &str) -> Option<Route<'_>> {
    let path = url.split('?').next().unwrap_or("");
    let path = path.trim_end_matches('/');
    match path {
        "/healthz" => return Some(Route::Health),
        "/livez" => return Some(Route::Live),
        _ => {}
    }

    let rest = path.strip_prefix(API_PREFIX)?.strip_prefix('/')?;
    let segments: Vec<&str> = rest.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }

    match segments.as_slice() {
        ["fetch-chart"] => Some(Route::FetchChart),
        ["charts"] => Some(Route::Charts),
        ["charts", name] => Some(Route::Chart(name)),
        ["charts", name, "versions"] => Some(Route::Versions(name)),
        ["charts", name, "versions", version] => Some(Route::Version(name, version)),
        ["charts", name, "dependencies"] => Some(Route::Dependencies(name)),
        ["charts", name, "fetch-dependencies"] => Some(Route::FetchDependencies(name)),
        ["charts", name, "switch-version"] => Some(Route::SwitchVersion(name)),
        ["docker-config"] => Some(Route::DockerConfig),
        ["authenticate"] => Some(Route::Authenticate),
        ["registry-configs"] => Some(Route::Registries),
        ["registry-configs", id] => Some(Route::Registry(id)),
        ["registry-configs", id, "set-default"] => Some(Route::RegistryDefault(id)),
        _ => None,
    }
}

fn json_header() -> Header {
    Header::from_bytes("Content-Type", "application/json").expect("valid header")
}

fn respond_json(req: Request, code: u16, body: &Value) {
    let data = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());
    let response = Response::from_data(data)
        .with_status_code(StatusCode(code))
        .with_header(json_header());
    if let Err(e) = req.respond(response) {
        debug!("client went away: {e}");
    }
}

fn respond_value(req: Request, code: u16, body: &impl serde::Serialize) {
    match serde_json::to_value(body) {
        Ok(value) => respond_json(req, code, &value),
        Err(e) => {
            error!("response serialization failed: {e}");
            respond_err(req, 500, &format!("serialization error: {e}"));
        }
    }
}

fn respond_err(req: Request, code: u16, msg: &str) {
    respond_json(req, code, &json!({ "error": msg }));
}

/// Map a catalog error to a status code and JSON error body.
pub fn error_response(err: &CoreError) -> (u16, Value) {
    match err {
        CoreError::Fetch(e) => (
            400,
            json!({
                "error": "Failed to fetch chart",
                "details": e.to_string(),
                "chart_url": e.location.as_str(),
            }),
        ),
        CoreError::InvalidRequest(msg) => (400, json!({ "error": msg })),
        CoreError::Store(StoreError::InvalidName(msg)) => (400, json!({ "error": msg })),
        CoreError::Store(e @ StoreError::RegistryExists(_)) => {
            (409, json!({ "error": e.to_string() }))
        }
        e if e.is_not_found() => (404, json!({ "error": e.to_string() })),
        e => (500, json!({ "error": e.to_string() })),
    }
}

fn respond_core_err(req: Request, err: &CoreError) {
    let (code, body) = error_response(err);
    if code >= 500 {
        error!("{err}");
    } else {
        debug!("{err}");
    }
    respond_json(req, code, &body);
}

fn read_json<T: DeserializeOwned>(req: &mut Request) -> Result<T, String> {
    let mut body = Vec::new();
    req.as_reader()
        .read_to_end(&mut body)
        .map_err(|e| format!("read error: {e}"))?;
    serde_json::from_slice(&body).map_err(|e| format!("Invalid request format: {e}"))
}

fn parse_id(raw: &str) -> Option<i64> {
    raw.parse().ok()
}

#[derive(Deserialize)]
struct SwitchBody {
    version: String,
}

fn handle_fetch_chart(catalog: &Catalog, mut req: Request) {
    let request: FetchRequest = match read_json(&mut req) {
        Ok(r) => r,
        Err(msg) => return respond_err(req, 400, &msg),
    };
    match catalog.fetch(&request) {
        Ok(outcome) => {
            let deps = outcome.summary.chart.dependencies.len();
            let info = if deps == 0 {
                "Chart has no dependencies".to_owned()
            } else {
                format!("Chart has {deps} dependencies")
            };
            respond_json(
                req,
                200,
                &json!({
                    "message": "Chart fetched successfully",
                    "chart": outcome.summary,
                    "apps": outcome.summary.applications,
                    "dependencies_count": deps,
                    "stored": true,
                    "created": outcome.created,
                    "chart_id": outcome.stored.id,
                    "info": info,
                }),
            );
        }
        Err(e) => respond_core_err(req, &e),
    }
}

fn handle_dependencies(catalog: &Catalog, req: Request, name: &str) {
    match catalog.dependencies(name) {
        Ok(deps) if deps.is_empty() => respond_json(
            req,
            200,
            &json!({
                "message": "Chart has no dependencies",
                "chart": name,
                "dependencies": [],
                "count": 0,
            }),
        ),
        Ok(deps) => respond_json(
            req,
            200,
            &json!({ "chart": name, "count": deps.len(), "dependencies": deps }),
        ),
        Err(e) => respond_core_err(req, &e),
    }
}

fn handle_fetch_dependencies(catalog: &Catalog, req: Request, name: &str) {
    match catalog.resolve_dependencies(name) {
        Ok(report) => {
            let mut body = serde_json::to_value(&report).unwrap_or_else(|_| json!({}));
            if let Some(map) = body.as_object_mut() {
                map.insert(
                    "message".to_owned(),
                    json!(format!(
                        "Processed {} dependencies",
                        report.total_dependencies
                    )),
                );
            }
            respond_json(req, 200, &body);
        }
        Err(e) => respond_core_err(req, &e),
    }
}

fn handle_switch(catalog: &Catalog, mut req: Request, name: &str) {
    let body: SwitchBody = match read_json(&mut req) {
        Ok(b) => b,
        Err(msg) => return respond_err(req, 400, &msg),
    };
    match catalog.switch_version(name, &body.version) {
        Ok(_) => respond_json(
            req,
            200,
            &json!({
                "message": format!("Switched {name} to version {}", body.version),
                "chart": name,
                "version": body.version,
            }),
        ),
        Err(e) => respond_core_err(req, &e),
    }
}

fn handle_docker_config(catalog: &Catalog, req: Request) {
    match catalog.load_credentials() {
        Ok(creds) => respond_json(
            req,
            200,
            &json!({
                "username": creds.username,
                "registry": creds.registry,
                "status": "configured",
            }),
        ),
        Err(e) => {
            debug!("docker config unavailable: {e}");
            respond_json(
                req,
                404,
                &json!({ "error": "Docker config not found", "details": e.to_string() }),
            );
        }
    }
}

fn handle_authenticate(catalog: &Catalog, req: Request) {
    let creds = match catalog.load_credentials() {
        Ok(c) => c,
        Err(e) => {
            return respond_json(
                req,
                404,
                &json!({ "error": "Docker config not found", "details": e.to_string() }),
            );
        }
    };
    match catalog.authenticate(&creds) {
        Ok(()) => respond_json(
            req,
            200,
            &json!({
                "message": "Authentication successful",
                "registry": creds.registry,
                "username": creds.username,
            }),
        ),
        Err(e) => {
            warn!("authentication against {} failed: {e}", creds.registry);
            respond_json(
                req,
                401,
                &json!({
                    "error": format!("Authentication failed: {e}"),
                    "registry": creds.registry,
                    "username": creds.username,
                }),
            );
        }
    }
}

fn handle_registry(catalog: &Catalog, mut req: Request, method: &Method, raw_id: &str) {
    let Some(id) = parse_id(raw_id) else {
        return respond_err(req, 400, &format!("invalid registry config id '{raw_id}'"));
    };
    match *method {
        Method::Put => {
            let input: RegistryConfigInput = match read_json(&mut req) {
                Ok(i) => i,
                Err(msg) => return respond_err(req, 400, &msg),
            };
            match catalog.update_registry(id, &input) {
                Ok(config) => respond_value(req, 200, &config),
                Err(e) => respond_core_err(req, &e),
            }
        }
        Method::Delete => match catalog.delete_registry(id) {
            Ok(()) => respond_json(
                req,
                200,
                &json!({ "message": "Registry configuration deleted" }),
            ),
            Err(e) => respond_core_err(req, &e),
        },
        _ => respond_err(req, 405, "method not allowed"),
    }
}

/// Handle a single HTTP request, dispatching to the appropriate route handler.
pub fn handle_request(catalog: &Catalog, mut req: Request) {
    let method = req.method().clone();
    let url = req.url().to_owned();
    debug!("{method} {url}");

    let Some(route) = parse_route(&url) else {
        return respond_err(req, 404, "not found");
    };

    match (route, &method) {
        (Route::Health, Method::Get) => {
            let health = catalog.health();
            let code = if health.is_healthy() { 200 } else { 500 };
            respond_value(req, code, &health);
        }
        (Route::Live, Method::Get) => {
            let _ = req.respond(Response::empty(200));
        }
        (Route::FetchChart, Method::Post) => handle_fetch_chart(catalog, req),
        (Route::Charts, Method::Get) => match catalog.list() {
            Ok(charts) => respond_value(req, 200, &charts),
            Err(e) => respond_core_err(req, &e),
        },
        (Route::Chart(name), Method::Get) => match catalog.get(name) {
            Ok(detail) => respond_value(req, 200, &detail),
            Err(e) => respond_core_err(req, &e),
        },
        (Route::Chart(name), Method::Delete) => match catalog.delete(name) {
            Ok(deleted) => {
                info!("deleted {deleted} versions of {name}");
                respond_json(
                    req,
                    200,
                    &json!({ "message": "Chart deleted successfully", "deleted": deleted }),
                );
            }
            Err(e) => respond_core_err(req, &e),
        },
        (Route::Versions(name), Method::Get) => match catalog.versions(name) {
            Ok(versions) => respond_json(
                req,
                200,
                &json!({ "chart": name, "count": versions.len(), "versions": versions }),
            ),
            Err(e) => respond_core_err(req, &e),
        },
        (Route::Version(name, version), Method::Delete) => {
            match catalog.delete_version(name, version) {
                Ok(()) => respond_json(
                    req,
                    200,
                    &json!({ "message": "Chart version deleted successfully" }),
                ),
                Err(e) => respond_core_err(req, &e),
            }
        }
        (Route::Dependencies(name), Method::Get) => handle_dependencies(catalog, req, name),
        (Route::FetchDependencies(name), Method::Post) => {
            handle_fetch_dependencies(catalog, req, name);
        }
        (Route::SwitchVersion(name), Method::Post) => handle_switch(catalog, req, name),
        (Route::DockerConfig, Method::Get) => handle_docker_config(catalog, req),
        (Route::Authenticate, Method::Post) => handle_authenticate(catalog, req),
        (Route::Registries, Method::Get) => match catalog.list_registries() {
            Ok(configs) => respond_value(req, 200, &configs),
            Err(e) => respond_core_err(req, &e),
        },
        (Route::Registries, Method::Post) => {
            let input: RegistryConfigInput = match read_json(&mut req) {
                Ok(i) => i,
                Err(msg) => return respond_err(req, 400, &msg),
            };
            match catalog.create_registry(&input) {
                Ok(config) => respond_value(req, 201, &config),
                Err(e) => respond_core_err(req, &e),
            }
        }
        (Route::Registry(id), m @ (Method::Put | Method::Delete)) => {
            handle_registry(catalog, req, m, id);
        }
        (Route::RegistryDefault(raw_id), Method::Post) => match parse_id(raw_id) {
            Some(id) => match catalog.set_default_registry(id) {
                Ok(_) => respond_json(req, 200, &json!({ "message": "Default registry updated" })),
                Err(e) => respond_core_err(req, &e),
            },
            None => respond_err(req, 400, &format!("invalid registry config id '{raw_id}'")),
        },
        _ => respond_err(req, 405, "method not allowed"),
    }
}

fn spawn_workers(
    server: &Arc<Server>,
    catalog: &Arc<Catalog>,
    workers: usize,
) -> Vec<std::thread::JoinHandle<()>> {
    (0..workers.max(1))
        .map(|_| {
            let server = Arc::clone(server);
            let catalog = Arc::clone(catalog);
            std::thread::spawn(move || {
                for request in server.incoming_requests() {
                    handle_request(&catalog, request);
                }
            })
        })
        .collect()
}

/// Bind `addr` and serve with `workers` threads, blocking until every
/// worker exits.
pub fn run_server(
    catalog: &Arc<Catalog>,
    addr: &str,
    workers: usize,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let server = Arc::new(Server::http(addr)?);
    info!("listening on {addr} with {workers} workers");
    for handle in spawn_workers(&server, catalog, workers) {
        if handle.join().is_err() {
            error!("worker thread panicked");
        }
    }
    Ok(())
}

/// A test helper that serves a [`Catalog`] on a random port in background threads.
///
/// The server listens on `127.0.0.1:{port}`. Dropping the `TestServer`
/// unblocks and joins every worker.
pub struct TestServer {
    pub url: String,
    pub port: u16,
    pub catalog: Arc<Catalog>,
    server: Arc<Server>,
    handles: Vec<std::thread::JoinHandle<()>>,
}

impl TestServer {
    /// Start a test server with two workers. Binds to `127.0.0.1:0`.
    pub fn start(catalog: Catalog) -> Self {
        let server =
            Arc::new(Server::http("127.0.0.1:0").expect("failed to bind test HTTP server"));
        let port = server.server_addr().to_ip().expect("not an IP addr").port();
        let url = format!("http://127.0.0.1:{port}");

        let catalog = Arc::new(catalog);
        let handles = spawn_workers(&server, &catalog, 2);

        Self {
            url,
            port,
            catalog,
            server,
            handles,
        }
    }

    pub fn api(&self, path: &str) -> String {
        format!("{}{API_PREFIX}{path}", self.url)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        for _ in &self.handles {
            self.server.unblock();
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}
