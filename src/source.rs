//! Declarative route tables, as written by the user.
//!
//! A [`RouteSource`] is an ordered list of `key => value` entries. Keys look
//! like `[METHODS:]path` or `GROUP:[METHODS:]prefix`; values are literals,
//! callables, class targets or nested tables. Order matters: when two
//! entries compile to the same method set and path, the first one wins.
//!
//! Tables can be built in code or loaded from TOML:
//!
//! ```toml
//! "GET:/ping" = "pong"
//! "/calc/add" = ["app.services.Calc", "add"]
//! "/users"    = ["app.controllers.Users"]
//!
//! ["GROUP:/v1"]
//! "/hello" = "hello v1"
//! ```

use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::handler::{BoxedCallable, Callable};
use crate::response::Payload;

/// Prefix marking a key as a group of nested routes.
pub const GROUP_PREFIX: &str = "GROUP:";

/// The right-hand side of a route entry.
#[derive(Clone)]
pub enum RouteValue {
    /// Returned verbatim.
    Literal(Payload),
    /// Called with no arguments.
    Callable(BoxedCallable),
    /// `[class, method]`, or `[class]` to expand every action of the class.
    Target(Vec<String>),
    /// Nested routes. Only valid under a `GROUP:` key.
    Table(RouteSource),
}

impl RouteValue {
    pub fn callable(f: impl Callable) -> Self {
        Self::Callable(f.into_boxed_callable())
    }

    pub fn target<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Target(parts.into_iter().map(Into::into).collect())
    }
}

impl std::fmt::Debug for RouteValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(p)  => f.debug_tuple("Literal").field(p).finish(),
            Self::Callable(_) => f.write_str("Callable(..)"),
            Self::Target(t)   => f.debug_tuple("Target").field(t).finish(),
            Self::Table(t)    => f.debug_tuple("Table").field(t).finish(),
        }
    }
}

impl From<Payload> for RouteValue {
    fn from(payload: Payload) -> Self { Self::Literal(payload) }
}

impl From<&str> for RouteValue {
    fn from(s: &str) -> Self { Self::Literal(Payload::String(s.to_owned())) }
}

impl From<String> for RouteValue {
    fn from(s: String) -> Self { Self::Literal(Payload::String(s)) }
}

impl From<i64> for RouteValue {
    fn from(n: i64) -> Self { Self::Literal(Payload::from(n)) }
}

impl<const N: usize> From<[&str; N]> for RouteValue {
    fn from(parts: [&str; N]) -> Self { Self::target(parts) }
}

impl From<Vec<String>> for RouteValue {
    fn from(parts: Vec<String>) -> Self { Self::Target(parts) }
}

impl From<RouteSource> for RouteValue {
    fn from(table: RouteSource) -> Self { Self::Table(table) }
}

// ── RouteSource ───────────────────────────────────────────────────────────────

/// An ordered route table.
#[derive(Clone, Debug, Default)]
pub struct RouteSource {
    entries: Vec<(String, RouteValue)>,
}

impl RouteSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `key => value`.
    pub fn route(mut self, key: impl Into<String>, value: impl Into<RouteValue>) -> Self {
        self.push(key, value);
        self
    }

    /// Appends a zero-argument callable.
    pub fn callable(self, key: impl Into<String>, f: impl Callable) -> Self {
        self.route(key, RouteValue::callable(f))
    }

    /// Appends a group. `prefix` may carry a method constraint
    /// (`"GET:/admin"`) that nested keys without their own inherit.
    pub fn group(self, prefix: &str, routes: RouteSource) -> Self {
        self.route(format!("{GROUP_PREFIX}{prefix}"), routes)
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<RouteValue>) {
        self.entries.push((key.into(), value.into()));
    }

    pub fn entries(&self) -> &[(String, RouteValue)] {
        &self.entries
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Parses a TOML route table, keeping entry order.
    ///
    /// Strings and numbers become literals, arrays of strings become class
    /// targets and tables become nested route tables.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = toml::from_str(s)?;
        from_toml_table(table)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

fn from_toml_table(table: toml::Table) -> Result<RouteSource, ConfigError> {
    let mut source = RouteSource::new();
    for (key, value) in table {
        let value = match value {
            toml::Value::String(s)  => RouteValue::from(s),
            toml::Value::Integer(n) => RouteValue::from(n),
            toml::Value::Float(f)   => RouteValue::Literal(Payload::from(f)),
            toml::Value::Boolean(b) => RouteValue::Literal(Payload::Bool(b)),
            toml::Value::Array(items) => {
                let parts = items
                    .into_iter()
                    .map(|item| match item {
                        toml::Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| ConfigError::InvalidHandler { route: key.clone() })?;
                RouteValue::Target(parts)
            }
            toml::Value::Table(nested) => RouteValue::Table(from_toml_table(nested)?),
            toml::Value::Datetime(_) => return Err(ConfigError::InvalidHandler { route: key }),
        };
        source.push(key, value);
    }
    Ok(source)
}
