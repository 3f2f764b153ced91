//! Rendering engines and the fetch adapter for Chartpaper.
//!
//! This crate implements the boundary to the outside world: the pluggable
//! `RenderEngine` trait with a `helm`-driving engine and an in-memory mock,
//! workload decoding from rendered manifests, registry `Credentials`, and
//! `fetch_chart`, which turns a chart location into a canonical
//! `ChartSummary` or a location-tagged `FetchError`.

pub mod credentials;
pub mod engine;
pub mod fetch;
pub mod helm;
pub mod mock;
pub mod workloads;

pub use credentials::Credentials;
pub use engine::{select_engine, EngineSettings, RenderEngine, RenderRequest, RenderedChart};
pub use fetch::{fetch_chart, FetchOptions, UNKNOWN_VERSION};
pub use helm::HelmEngine;
pub use mock::{MockChart, MockEngine};

use chartpaper_schema::{Location, SchemaError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("rendering engine '{0}' is not available on this system")]
    EngineUnavailable(String),
    #[error("`{command}` exited with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },
    #[error("chart not found: {0}")]
    ChartNotFound(String),
    #[error("malformed engine output: {0}")]
    MalformedOutput(String),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("credentials error: {0}")]
    Credentials(String),
}

/// A render failure tagged with the location that was tried.
#[derive(Debug, Error)]
#[error("failed to fetch chart from {location}: {source}")]
pub struct FetchError {
    pub location: Location,
    pub source: RenderError,
}

impl FetchError {
    pub fn new(location: &Location, source: RenderError) -> Self {
        Self {
            location: location.clone(),
            source,
        }
    }
}
