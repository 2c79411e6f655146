//! Router configuration.
//!
//! Read from TOML; every key is optional.
//!
//! ```toml
//! only_match_rule    = false          # true disables convention dispatch
//! root_namespace     = "app"
//! default_controller = "app.controllers.IndexController"
//! default_action     = "index"
//! format             = "json"         # or "raw"
//! pretty             = false
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::response::{JsonFormatter, RawFormatter, ResponseFormatter};

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct RouterConfig {
    /// When set, paths no route matches are 404 instead of falling back to
    /// convention dispatch.
    pub only_match_rule: bool,
    pub root_namespace: String,
    /// Defaults to `{root_namespace}.controllers.IndexController`.
    pub default_controller: Option<String>,
    pub default_action: String,
    pub format: ResponseFormat,
    /// Pretty-print JSON output.
    pub pretty: bool,
}

/// How payloads are written to the response body.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Raw,
    Json,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            only_match_rule: false,
            root_namespace: "app".to_owned(),
            default_controller: None,
            default_action: "index".to_owned(),
            format: ResponseFormat::Raw,
            pretty: false,
        }
    }
}

impl RouterConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// The formatter selected by `format` and `pretty`.
    pub fn formatter(&self) -> Arc<dyn ResponseFormatter> {
        match self.format {
            ResponseFormat::Raw  => Arc::new(RawFormatter),
            ResponseFormat::Json => Arc::new(JsonFormatter { pretty: self.pretty }),
        }
    }
}
