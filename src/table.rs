//! The compiled route table and first-match lookup.
//!
//! Routes are kept in priority order: deeper paths first, then routes bound
//! to fewer methods. Lookup is a linear scan that returns the first route
//! accepting the method whose path matches. Static paths compare by string
//! equality, and paths with `:name` segments go through their anchored regex.

use std::collections::HashMap;
use std::fmt;

use regex::Regex;

use crate::handler::Handler;
use crate::method::{Method, MethodSet};

/// Anchored regex for a parameterized path, plus its capture names in order.
#[derive(Clone, Debug)]
pub(crate) struct PathPattern {
    pub(crate) regex: Regex,
    pub(crate) names: Vec<String>,
}

impl PathPattern {
    fn captures(&self, path: &str) -> Option<HashMap<String, String>> {
        let caps = self.regex.captures(path)?;
        Some(
            self.names
                .iter()
                .zip(caps.iter().skip(1))
                .map(|(name, m)| (name.clone(), m.map_or("", |m| m.as_str()).to_owned()))
                .collect(),
        )
    }
}

/// One route after group expansion and class expansion.
#[derive(Clone)]
pub struct CompiledRoute {
    key: String,
    path: String,
    methods: MethodSet,
    handler: Handler,
    pattern: Option<PathPattern>,
    depth: usize,
}

impl CompiledRoute {
    pub(crate) fn new(path: String, methods: MethodSet, handler: Handler, pattern: Option<PathPattern>) -> Self {
        Self {
            key: format!("{methods}:{path}"),
            depth: depth(&path),
            path,
            methods,
            handler,
            pattern,
        }
    }

    /// `METHODS:path`, e.g. `GET|POST:/user/:id`.
    pub fn key(&self) -> &str { &self.key }
    pub fn path(&self) -> &str { &self.path }
    pub fn methods(&self) -> MethodSet { self.methods }
    pub fn handler(&self) -> &Handler { &self.handler }
    pub fn depth(&self) -> usize { self.depth }

    /// The anchored regex source, for parameterized routes.
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_ref().map(|p| p.regex.as_str())
    }

    /// Capture names in path order. Empty for static routes.
    pub fn capture_names(&self) -> &[String] {
        self.pattern.as_ref().map(|p| p.names.as_slice()).unwrap_or_default()
    }

    fn matches(&self, method: Method, path: &str) -> Option<HashMap<String, String>> {
        if !self.methods.contains(method) {
            return None;
        }
        match &self.pattern {
            Some(pattern) => pattern.captures(path),
            None          => (self.path == path).then(HashMap::new),
        }
    }
}

impl fmt::Debug for CompiledRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRoute")
            .field("key", &self.key)
            .field("handler", &self.handler)
            .field("pattern", &self.pattern())
            .field("depth", &self.depth)
            .finish()
    }
}

/// Number of `/`-separated pieces, empty ones included: `/a/b` is 3.
pub(crate) fn depth(path: &str) -> usize {
    path.split('/').count()
}

// ── RouteTable ────────────────────────────────────────────────────────────────

/// Routes in match priority order.
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    routes: Vec<CompiledRoute>,
}

/// A successful lookup.
#[derive(Clone, Debug)]
pub struct RouteMatch {
    pub handler: Handler,
    pub method: Method,
    /// Key of the route that matched.
    pub route: String,
    /// Named captures. Empty for static routes.
    pub params: HashMap<String, String>,
}

impl RouteTable {
    pub(crate) fn new(routes: Vec<CompiledRoute>) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &[CompiledRoute] { &self.routes }
    pub fn len(&self) -> usize { self.routes.len() }
    pub fn is_empty(&self) -> bool { self.routes.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledRoute> {
        self.routes.iter()
    }

    /// Returns the first route accepting `method` whose path matches.
    ///
    /// `path` is normalized first: the query string and a trailing file
    /// extension are stripped.
    pub fn find(&self, method: Method, path: &str) -> Option<RouteMatch> {
        let path = normalize_path(path);
        self.routes.iter().find_map(|route| {
            route.matches(method, path).map(|params| RouteMatch {
                handler: route.handler.clone(),
                method,
                route: route.key.clone(),
                params,
            })
        })
    }
}

/// Strips the query string, then the extension of the last path segment.
///
/// ```rust
/// use switchyard::normalize_path;
///
/// assert_eq!(normalize_path("/user/5.json?x=1"), "/user/5");
/// assert_eq!(normalize_path("/v1.2/user"), "/v1.2/user");
/// ```
pub fn normalize_path(path: &str) -> &str {
    let path = path.split_once('?').map_or(path, |(path, _)| path);
    let start = path.rfind('/').map_or(0, |i| i + 1);
    let last = &path[start..];
    match last.rfind('.') {
        Some(dot) if dot + 1 < last.len() => &path[..start + dot],
        _ => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Payload;

    fn literal(s: &str) -> Handler {
        Handler::Literal(Payload::String(s.to_owned()))
    }

    fn param_route(path: &str, regex: &str, names: &[&str]) -> CompiledRoute {
        let pattern = PathPattern {
            regex: Regex::new(regex).unwrap(),
            names: names.iter().map(|n| (*n).to_owned()).collect(),
        };
        CompiledRoute::new(path.to_owned(), MethodSet::ALL, literal(path), Some(pattern))
    }

    #[test]
    fn normalizes_query_and_extension() {
        assert_eq!(normalize_path("/a/b?x=1"), "/a/b");
        assert_eq!(normalize_path("/a/b.html"), "/a/b");
        assert_eq!(normalize_path("/a/b.tar.gz"), "/a/b.tar");
        assert_eq!(normalize_path("/a.b/c"), "/a.b/c");
        assert_eq!(normalize_path("/a/b."), "/a/b.");
        assert_eq!(normalize_path("/a/"), "/a/");
        assert_eq!(normalize_path("/"), "/");
    }

    #[test]
    fn depth_counts_empty_pieces() {
        assert_eq!(depth("/"), 2);
        assert_eq!(depth("/a"), 2);
        assert_eq!(depth("/a/b"), 3);
        assert_eq!(depth("/a/b/"), 4);
    }

    #[test]
    fn static_routes_match_exactly_and_respect_methods() {
        let get = CompiledRoute::new("/ping".into(), MethodSet::single(Method::Get), literal("get"), None);
        let table = RouteTable::new(vec![get]);

        let hit = table.find(Method::Get, "/ping.json?x=1").unwrap();
        assert_eq!(hit.route, "GET:/ping");
        assert!(hit.params.is_empty());
        assert!(table.find(Method::Post, "/ping").is_none());
        assert!(table.find(Method::Get, "/ping/more").is_none());
    }

    #[test]
    fn regex_routes_capture_named_params() {
        let table = RouteTable::new(vec![param_route("/user/:id", r"^/user/([A-Za-z0-9_]+)$", &["id"])]);
        let hit = table.find(Method::Put, "/user/42").unwrap();
        assert_eq!(hit.params["id"], "42");
        assert!(table.find(Method::Put, "/user/42/x").is_none());
    }

    #[test]
    fn first_matching_route_wins() {
        let table = RouteTable::new(vec![
            param_route("/a/:x", r"^/a/([A-Za-z0-9_]+)$", &["x"]),
            CompiledRoute::new("/a/b".into(), MethodSet::ALL, literal("static"), None),
        ]);
        let hit = table.find(Method::Get, "/a/b").unwrap();
        assert_eq!(hit.route, "ALL:/a/:x");
    }
}
