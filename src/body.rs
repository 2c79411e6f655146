//! Request body decoding, keyed by content type.
//!
//! Bodies are decoded into the flat parameter map handlers read through
//! [`Request::post`](crate::Request::post). The defaults cover form posts
//! and JSON objects; a parser registered under `*` handles every other
//! content type. Without one, unrecognised bodies are ignored.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::DispatchError;

/// Decodes a raw body into named parameters.
pub trait BodyParser: Send + Sync + 'static {
    fn parse(&self, raw: &[u8]) -> Result<Map<String, Value>, DispatchError>;
}

/// `application/x-www-form-urlencoded`. Repeated names keep the last value.
#[derive(Clone, Copy, Debug, Default)]
pub struct FormParser;

impl BodyParser for FormParser {
    fn parse(&self, raw: &[u8]) -> Result<Map<String, Value>, DispatchError> {
        Ok(url::form_urlencoded::parse(raw)
            .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
            .collect())
    }
}

/// JSON objects. `null` decodes to no parameters; any other non-object is
/// rejected.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonParser;

impl BodyParser for JsonParser {
    fn parse(&self, raw: &[u8]) -> Result<Map<String, Value>, DispatchError> {
        match serde_json::from_slice(raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(Value::Null)        => Ok(Map::new()),
            Ok(other)              => Err(DispatchError::InvalidBody(format!(
                "expected a JSON object, got {}",
                kind(&other)
            ))),
            Err(e) => Err(DispatchError::InvalidBody(e.to_string())),
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null      => "null",
        Value::Bool(_)   => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_)  => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parsers by media type.
#[derive(Clone)]
pub struct BodyParsers {
    parsers: HashMap<String, Arc<dyn BodyParser>>,
    fallback: Option<Arc<dyn BodyParser>>,
}

impl BodyParsers {
    /// No parsers at all: every body is ignored.
    pub fn empty() -> Self {
        Self { parsers: HashMap::new(), fallback: None }
    }

    /// Registers `parser` for a media type, or for everything else with `*`.
    pub fn register(mut self, content_type: &str, parser: impl BodyParser) -> Self {
        let parser: Arc<dyn BodyParser> = Arc::new(parser);
        if content_type == "*" {
            self.fallback = Some(parser);
        } else {
            self.parsers.insert(content_type.to_ascii_lowercase(), parser);
        }
        self
    }

    /// Decodes `raw` according to a `Content-Type` header value. Parameters
    /// such as `charset` are ignored when choosing the parser.
    pub fn parse(&self, content_type: Option<&str>, raw: &[u8]) -> Result<Map<String, Value>, DispatchError> {
        if raw.is_empty() {
            return Ok(Map::new());
        }
        let media = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .unwrap_or_default();
        match self.parsers.get(&media).or(self.fallback.as_ref()) {
            Some(parser) => parser.parse(raw),
            None         => Ok(Map::new()),
        }
    }
}

impl Default for BodyParsers {
    fn default() -> Self {
        Self::empty()
            .register("application/x-www-form-urlencoded", FormParser)
            .register("application/json", JsonParser)
            .register("text/json", JsonParser)
    }
}
