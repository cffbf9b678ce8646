//! Error types for nichetrack.
//!
//! Two error classes are fatal to a run: configuration errors (missing or
//! partial credentials) and authorization errors (bad caller token). Every
//! other failure is scoped to a single source and is carried as an
//! [`ItemError`] into the run report instead of being raised further.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::openai::OpenAiError;

/// Request-level error. Maps onto an HTTP status in the trigger endpoint.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("unauthorized: {0}")]
    Auth(#[from] AuthError),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("language model error: {0}")]
    Enrichment(#[from] EnrichmentError),
}

impl Error {
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Auth(_) => 401,
            Error::Enrichment(_) => 502,
            Error::Config(_) | Error::Network(_) => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config(ConfigError::Missing { .. }) => "missing_credentials",
            Error::Config(ConfigError::PartialRedditCredentials { .. }) => "partial_credentials",
            Error::Config(ConfigError::Invalid { .. }) => "invalid_config",
            Error::Auth(AuthError::MissingToken) => "missing_token",
            Error::Auth(AuthError::InvalidToken) => "unauthorized",
            Error::Network(_) => "network_error",
            Error::Enrichment(_) => "upstream_error",
        }
    }
}

/// JSON body returned for fatal request errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError {
            success: false,
            error: ErrorDetail { code: err.error_code().to_string(), message: err.to_string() },
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting is absent or blank
    #[error("missing required setting {key}")]
    Missing { key: &'static str },

    /// Some but not all of the reddit script-app credentials are set
    #[error("incomplete reddit credentials, missing: {}", .missing.join(", "))]
    PartialRedditCredentials { missing: Vec<&'static str> },

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid bearer token")]
    InvalidToken,
}

/// Content-source failure for one subreddit.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid subreddit name {0:?}")]
    InvalidSubreddit(String),

    #[error("reddit authentication failed: {0}")]
    Auth(String),

    #[error("reddit returned status {status} for r/{subreddit}")]
    Status { subreddit: String, status: u16 },

    #[error("request to reddit failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected response shape from reddit: {0}")]
    Shape(String),

    #[error("no posts returned for r/{0}")]
    Empty(String),

    #[error("post {post_id} in r/{subreddit} has no title")]
    MissingTitle { subreddit: String, post_id: String },
}

/// Summarization or classification failure.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error(transparent)]
    Llm(#[from] OpenAiError),

    /// The model answered, but not in the shape the classifier asked for
    #[error("unexpected trend shape: {0}")]
    Shape(String),
}

/// Persistence failure for one item.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PersistError {
    #[error("query on {table} failed: {message}")]
    Query { table: &'static str, message: String },

    #[error("insert into {table} failed: {message}")]
    Insert { table: &'static str, message: String },

    #[error("update of {table} row {id} failed: {message}")]
    Update { table: &'static str, id: i64, message: String },
}

/// Everything that can end a single source's pipeline.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Enrichment(#[from] EnrichmentError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error("pipeline panicked: {0}")]
    Panicked(String),
}

impl ItemError {
    /// Stable tag reported alongside the human-readable reason.
    pub fn kind(&self) -> &'static str {
        match self {
            ItemError::Fetch(_) => "fetch",
            ItemError::Enrichment(_) => "enrichment",
            ItemError::Persist(_) => "persist",
            ItemError::Panicked(_) => "panic",
        }
    }
}
