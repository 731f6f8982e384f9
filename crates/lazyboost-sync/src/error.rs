use std::path::PathBuf;

use lazyboost_core::{DecodeError, MappingError};
use thiserror::Error;

/// Failure talking to a remote platform.
#[derive(Error, Debug)]
pub enum ApiError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("token refresh failed: {0}")]
    TokenRefresh(String),
    #[error("GraphQL errors: {}", .0.join("; "))]
    GraphQl(Vec<String>),
    #[error("mutation rejected: {}", .0.join("; "))]
    UserErrors(Vec<String>),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("response is missing {0}")]
    Missing(&'static str),
    #[error(transparent)]
    Secret(#[from] SecretError),
}

#[derive(Error, Debug)]
pub enum SecretError {
    #[error("secret {0} is not set")]
    Missing(String),
    #[error("cannot read secrets from {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot write secrets to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("secrets file {path} is not a JSON object of strings: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Failure of a sync step, tagged with the platform it came from.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("etsy: {0}")]
    Etsy(#[source] ApiError),
    #[error("shopify: {0}")]
    Shopify(#[source] ApiError),
    #[error("review platform: {0}")]
    ReviewPlatform(#[source] ApiError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error(transparent)]
    Secret(#[from] SecretError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("unknown task {0:?}")]
    UnknownTask(String),
    #[error("invalid trigger event: {0}")]
    Event(String),
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}
