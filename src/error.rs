//! Error types.
//!
//! Two kinds of failure, kept apart because they are handled differently:
//!
//! - [`ConfigError`] is raised while a route table is built. It is a
//!   programmer error and must stop the process from serving.
//! - [`DispatchError`] is raised while one request is resolved or invoked.
//!   It becomes an HTTP status at the response boundary and never escapes as
//!   an unhandled fault.
//!
//! Neither is worth retrying: routing is a pure function of the table and the
//! request.

use std::path::PathBuf;

use http::StatusCode;
use thiserror::Error;

/// Build-time failure: a malformed route declaration or configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The value is not a literal, callable, `[class, method]` or `[class]`.
    #[error("invalid route handle: {route}")]
    InvalidHandler { route: String },

    #[error("invalid route rule: {route}, expected 1 or 2 elements, got {len}")]
    InvalidArity { route: String, len: usize },

    #[error("invalid route rule: {route}, class `{class}` is not registered")]
    UnknownClass { route: String, class: String },

    #[error("invalid route handle: {route}, method `{method}` not found on `{class}`")]
    UnknownMethod { route: String, class: String, method: String },

    #[error("invalid route group: {route}, expected a nested route table")]
    InvalidGroup { route: String },

    #[error("invalid route pattern: {route}, {reason}")]
    InvalidPattern { route: String, reason: String },

    #[error("invalid route pattern: {route}")]
    Regex {
        route: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration")]
    Parse(#[from] toml::de::Error),
}

/// Per-request failure.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No rule matched and convention resolution failed, or the resolved
    /// controller has no such action.
    #[error("not found route: {0}")]
    NotFound(String),

    /// A handler that cannot be invoked reached dispatch.
    #[error("invalid route handle: {route}, {reason}")]
    InvalidHandler { route: String, reason: String },

    #[error("missing argument `{name}`")]
    MissingArgument { name: String },

    #[error("invalid value `{value}` for argument `{name}`")]
    InvalidArgument { name: String, value: String },

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    /// The handler's return value could not be turned into a payload.
    #[error("unserializable payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl DispatchError {
    /// The status the response boundary reports for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_)                => StatusCode::NOT_FOUND,
            Self::InvalidHandler { .. }      => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MissingArgument { .. }     => StatusCode::BAD_REQUEST,
            Self::InvalidArgument { .. }     => StatusCode::BAD_REQUEST,
            Self::InvalidBody(_)             => StatusCode::BAD_REQUEST,
            Self::Payload(_)                 => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Either kind of failure, for callers that build and serve in one place.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
