//! Incoming request facade.
//!
//! Transport parsing and body decoding happen upstream; by the time a
//! [`Request`] exists it holds plain maps of query, body and route parameters.

use std::borrow::Cow;
use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::method::Method;

/// An incoming request, as seen by the router and by handlers.
#[derive(Clone, Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: HashMap<String, String>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Map<String, Value>,
    pub(crate) params: HashMap<String, String>,
}

impl Request {
    /// Builds a request from a method and a request target (`/path?query`).
    ///
    /// The query string is decoded with form-urlencoded rules. When a name
    /// repeats, the last value wins.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None                => (target, HashMap::new()),
        };
        Self {
            method,
            path: path.to_owned(),
            query,
            headers: Vec::new(),
            body: Map::new(),
            params: HashMap::new(),
        }
    }

    /// Builds a command-line request from argv-style arguments.
    ///
    /// The first argument is the path; every following `key=value` argument
    /// becomes a query parameter. Arguments without `=` are ignored.
    pub fn cli<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut args = args.into_iter();
        let path = args.next().map(|p| p.as_ref().to_owned()).unwrap_or_default();
        let mut req = Self::new(Method::Cli, &path);
        for arg in args {
            if let Some((k, v)) = arg.as_ref().split_once('=') {
                req.query.insert(k.to_owned(), v.to_owned());
            }
        }
        req
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Attaches already-parsed body parameters.
    pub fn with_body(mut self, body: Map<String, Value>) -> Self {
        self.body = body;
        self
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn query(&self) -> &HashMap<String, String> { &self.query }
    pub fn body(&self) -> &Map<String, Value> { &self.body }
    pub fn params(&self) -> &HashMap<String, String> { &self.params }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a query-string parameter.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Returns a body parameter.
    pub fn post(&self, name: &str) -> Option<&Value> {
        self.body.get(name)
    }

    /// Returns a named route parameter.
    ///
    /// For a route `/users/:id`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Looks a name up in route params, then the query, then the body.
    ///
    /// Non-string body values are rendered as JSON text.
    pub fn value(&self, name: &str) -> Option<Cow<'_, str>> {
        if let Some(v) = self.param(name).or_else(|| self.get(name)) {
            return Some(Cow::Borrowed(v));
        }
        match self.post(name)? {
            Value::String(s) => Some(Cow::Borrowed(s)),
            Value::Null      => None,
            other            => Some(Cow::Owned(other.to_string())),
        }
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }
}

fn parse_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn splits_target_into_path_and_query() {
        let req = Request::new(Method::Get, "/calc/add?a=2&b=3&name=J%C3%BCrgen+K");
        assert_eq!(req.path(), "/calc/add");
        assert_eq!(req.get("a"), Some("2"));
        assert_eq!(req.get("b"), Some("3"));
        assert_eq!(req.get("name"), Some("Jürgen K"));
        assert_eq!(req.get("missing"), None);
    }

    #[test]
    fn last_duplicate_query_value_wins() {
        let req = Request::new(Method::Get, "/x?id=1&id=2");
        assert_eq!(req.get("id"), Some("2"));
    }

    #[test]
    fn value_prefers_route_then_query_then_body() {
        let body = json!({ "id": 7, "name": "body", "tag": "t" });
        let mut req = Request::new(Method::Post, "/x?id=query&name=query")
            .with_body(body.as_object().cloned().unwrap());
        req.set_params(HashMap::from([("id".to_owned(), "route".to_owned())]));

        assert_eq!(req.value("id").as_deref(), Some("route"));
        assert_eq!(req.value("name").as_deref(), Some("query"));
        assert_eq!(req.value("tag").as_deref(), Some("t"));
        assert_eq!(req.value("none"), None);
        assert_eq!(req.post("id"), Some(&json!(7)));
    }

    #[test]
    fn cli_arguments_become_query_parameters() {
        let req = Request::cli(["/report/daily", "day=3", "verbose", "fmt=csv"]);
        assert_eq!(req.method(), Method::Cli);
        assert_eq!(req.path(), "/report/daily");
        assert_eq!(req.get("day"), Some("3"));
        assert_eq!(req.get("fmt"), Some("csv"));
        assert_eq!(req.query().len(), 2);
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = Request::new(Method::Get, "/").with_header("Content-Type", "application/json");
        assert_eq!(req.header("content-type"), Some("application/json"));
    }
}
