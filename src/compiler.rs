//! Route table compilation.
//!
//! Turns a nested, declarative [`RouteSource`] into a flat [`RouteTable`]:
//!
//! 1. `GROUP:` entries are flattened, their prefix prepended to every nested
//!    path and their method constraint inherited by keys without one.
//! 2. `[class]` entries are expanded into one route per action method.
//! 3. Every value is checked and resolved into a [`Handler`].
//! 4. Paths with `:name` or `:name<regex>` segments get an anchored regex.
//! 5. Routes are sorted by depth, deepest first, then by method count,
//!    fewest first. The sort is stable, so ties keep declaration order.
//!
//! When two entries compile to the same method set and path, the first one
//! wins and the later one is dropped.

use std::collections::HashSet;

use regex::Regex;
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::handler::Handler;
use crate::method::{Method, MethodSet};
use crate::registry::{Registry, ACTION_PREFIX};
use crate::source::{RouteSource, RouteValue, GROUP_PREFIX};
use crate::table::{CompiledRoute, PathPattern, RouteTable};

/// Capture class for `:name` segments without an explicit pattern.
pub const DEFAULT_PARAM_PATTERN: &str = "[A-Za-z0-9_]+";

/// Compiles route sources against a class registry.
pub struct RouteCompiler<'r> {
    registry: &'r Registry,
}

struct Flattened {
    routes: Vec<(MethodSet, String, Handler)>,
    seen: HashSet<(MethodSet, String)>,
}

impl Flattened {
    fn push(&mut self, methods: MethodSet, path: String, handler: Handler) {
        if !self.seen.insert((methods, path.clone())) {
            debug!(route = %format_args!("{methods}:{path}"), "duplicate route ignored");
            return;
        }
        self.routes.push((methods, path, handler));
    }
}

impl<'r> RouteCompiler<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    pub fn compile(&self, source: &RouteSource) -> Result<RouteTable, ConfigError> {
        let mut flat = Flattened { routes: Vec::new(), seen: HashSet::new() };
        self.flatten(source, "", None, &mut flat)?;

        let mut routes = flat
            .routes
            .into_iter()
            .map(|(methods, path, handler)| {
                let pattern = compile_pattern(&format!("{methods}:{path}"), &path)?;
                Ok(CompiledRoute::new(path, methods, handler, pattern))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        routes.sort_by(|a, b| {
            b.depth()
                .cmp(&a.depth())
                .then_with(|| a.methods().len().cmp(&b.methods().len()))
        });

        info!(routes = routes.len(), "route table compiled");
        Ok(RouteTable::new(routes))
    }

    fn flatten(
        &self,
        source: &RouteSource,
        prefix: &str,
        inherited: Option<MethodSet>,
        out: &mut Flattened,
    ) -> Result<(), ConfigError> {
        for (key, value) in source.entries() {
            if let Some(group) = strip_group(key) {
                let (methods, group_prefix) = split_method(group);
                let RouteValue::Table(nested) = value else {
                    return Err(ConfigError::InvalidGroup { route: key.clone() });
                };
                let prefix = format!("{prefix}{group_prefix}");
                self.flatten(nested, &prefix, methods.or(inherited), out)?;
                continue;
            }

            let (methods, path) = split_method(key);
            let methods = methods.or(inherited).unwrap_or(MethodSet::ALL);
            let path = format!("{prefix}{path}");
            let route = format!("{methods}:{path}");

            match value {
                RouteValue::Target(parts) if parts.len() == 1 => {
                    self.expand_class(&route, &parts[0], &path, out)?;
                }
                value => {
                    let handler = Handler::resolve(value, self.registry)
                        .map_err(|e| e.into_config(&route))?;
                    out.push(methods, path, handler);
                }
            }
        }
        Ok(())
    }

    /// One route per action method of `class`, under `base`. The method set
    /// comes from the action name, not from the key or group.
    fn expand_class(&self, route: &str, class: &str, base: &str, out: &mut Flattened) -> Result<(), ConfigError> {
        let def = self.registry.get(class).ok_or_else(|| ConfigError::UnknownClass {
            route: route.to_owned(),
            class: class.to_owned(),
        })?;

        for method in def.methods() {
            let Some((methods, action)) = action_route(method.name()) else {
                continue;
            };
            let path = format!("{base}/{}", lcfirst(action));
            out.push(methods, path, Handler::Action(def.action(method)));
        }
        Ok(())
    }
}

/// The rest of a `GROUP:` key. The marker is case-insensitive.
fn strip_group(key: &str) -> Option<&str> {
    let marker = key.get(..GROUP_PREFIX.len())?;
    marker
        .eq_ignore_ascii_case(GROUP_PREFIX)
        .then(|| &key[GROUP_PREFIX.len()..])
}

/// Splits `GET|POST:/path` into its method set and path.
///
/// The prefix only counts when the colon is not the first character and
/// every `|`-separated token is a method, so `/user/:id` stays a path.
pub fn split_method(key: &str) -> (Option<MethodSet>, &str) {
    match key.find(':') {
        Some(colon) if colon > 0 => match MethodSet::parse(&key[..colon]) {
            Some(methods) => (Some(methods), &key[colon + 1..]),
            None          => (None, key),
        },
        _ => (None, key),
    }
}

/// Derives the route of an action method: `actionGetInfo` is `GET` +
/// `Info`, `actionList` is every method + `List`.
///
/// A verb prefix only counts when an uppercase letter follows it, so
/// `actionGetaway` is `Getaway` on every method. Names that are not
/// `action` followed by an uppercase letter are not actions.
pub fn action_route(name: &str) -> Option<(MethodSet, &str)> {
    let rest = name.strip_prefix(ACTION_PREFIX)?;
    if !starts_upper(rest) {
        return None;
    }
    for method in Method::ALL {
        if let Some(action) = rest.strip_prefix(method.title()) {
            if starts_upper(action) {
                return Some((MethodSet::single(method), action));
            }
        }
    }
    Some((MethodSet::ALL, rest))
}

fn starts_upper(s: &str) -> bool {
    s.chars().next().is_some_and(char::is_uppercase)
}

pub(crate) fn lcfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None        => String::new(),
    }
}

/// Builds the anchored regex for a path with parameter segments.
///
/// Literal segments are escaped. Returns `None` for static paths.
pub(crate) fn compile_pattern(route: &str, path: &str) -> Result<Option<PathPattern>, ConfigError> {
    if !path.split('/').any(|segment| segment.starts_with(':')) {
        return Ok(None);
    }

    let mut names = Vec::new();
    let mut source = String::from("^");
    for (i, segment) in path.split('/').enumerate() {
        if i > 0 {
            source.push('/');
        }
        match segment.strip_prefix(':') {
            Some(param) => {
                let (name, pattern) = split_param(route, param)?;
                source.push('(');
                source.push_str(pattern.unwrap_or(DEFAULT_PARAM_PATTERN));
                source.push(')');
                names.push(name.to_owned());
            }
            None => source.push_str(&regex::escape(segment)),
        }
    }
    source.push('$');

    let regex = Regex::new(&source).map_err(|source| ConfigError::Regex {
        route: route.to_owned(),
        source,
    })?;
    // One group per parameter, or captures would shift onto the wrong names.
    if regex.captures_len() - 1 != names.len() {
        return Err(ConfigError::InvalidPattern {
            route: route.to_owned(),
            reason: "parameter patterns must not contain capture groups".to_owned(),
        });
    }
    Ok(Some(PathPattern { regex, names }))
}

/// `id<\d+>` into `("id", Some("\d+"))`, `id` into `("id", None)`.
fn split_param<'p>(route: &str, param: &'p str) -> Result<(&'p str, Option<&'p str>), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidPattern {
        route: route.to_owned(),
        reason: format!("{reason} in `:{param}`"),
    };

    let (name, pattern) = match param.find('<') {
        Some(lt) => {
            let pattern = param[lt + 1..]
                .strip_suffix('>')
                .ok_or_else(|| invalid("unterminated pattern"))?;
            if pattern.is_empty() {
                return Err(invalid("empty pattern"));
            }
            (&param[..lt], Some(pattern))
        }
        None => (param, None),
    };
    if name.is_empty() {
        return Err(invalid("missing parameter name"));
    }
    Ok((name, pattern))
}
