//! Error types for sources, aggregation, lookups, configuration and the HTTP layer.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::ErrorBody;

/// Message returned with every 404 from the detail endpoint.
pub const NOT_FOUND_MESSAGE: &str = "News article not found";

/// Why a single source contributed nothing to a run.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response status: {status} at {url}")]
    Status { status: u16, url: String },

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid selector `{0}`")]
    Selector(String),

    #[error("Source did not finish within the {secs}s aggregation deadline")]
    Deadline { secs: u64 },

    #[error("Source panicked: {0}")]
    Panicked(String),
}

/// A whole aggregation run failed; callers substitute the fallback feed.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("no news sources are configured")]
    NoSources,

    #[error("all {count} news sources failed")]
    AllSourcesFailed { count: usize },
}

/// Outcome of a positional lookup that did not produce an item.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("News article not found")]
    NotFound,
}

/// Problems reading the YAML configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Errors surfaced by HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Lookup(LookupError::NotFound) => StatusCode::NOT_FOUND,
        };

        (status, Json(ErrorBody::new(self.to_string()))).into_response()
    }
}
