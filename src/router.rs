//! The router: a compiled route table, a class registry and the convention
//! fallback behind one entry point.
//!
//! Build it once at startup and share it. Every request goes through the
//! same three steps:
//!
//! ```text
//! Router::handle(request)
//!   1. table.find(method, path)         → route handler, params bound
//!   2. convention.resolve(path)         → controller action, unless
//!                                          `only_match_rule` is set
//!   3. otherwise                        → DispatchError::NotFound
//! ```

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::compiler::RouteCompiler;
use crate::config::RouterConfig;
use crate::convention::{ConventionResolver, Mca};
use crate::dispatch::Dispatcher;
use crate::error::{ConfigError, DispatchError};
use crate::registry::Registry;
use crate::request::Request;
use crate::response::Payload;
use crate::source::{RouteSource, RouteValue};
use crate::table::{normalize_path, RouteMatch, RouteTable};

/// How a request was resolved, before anything is invoked.
#[derive(Debug)]
pub enum Resolution {
    Route(RouteMatch),
    Convention(Mca),
    NotFound,
}

/// The application router.
pub struct Router {
    table: RouteTable,
    registry: Registry,
    config: RouterConfig,
    convention: ConventionResolver,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    pub fn table(&self) -> &RouteTable { &self.table }
    pub fn registry(&self) -> &Registry { &self.registry }
    pub fn config(&self) -> &RouterConfig { &self.config }
    pub fn convention(&self) -> &ConventionResolver { &self.convention }

    /// Finds what would handle `request` without invoking it.
    pub fn resolve(&self, request: &Request) -> Resolution {
        if let Some(found) = self.table.find(request.method(), request.path()) {
            return Resolution::Route(found);
        }
        if self.config.only_match_rule {
            return Resolution::NotFound;
        }
        match self.convention.resolve(normalize_path(request.path())) {
            Some(mca) => Resolution::Convention(mca),
            None      => Resolution::NotFound,
        }
    }

    /// Resolves and invokes the handler for `request`.
    pub fn handle(&self, mut request: Request) -> Result<Payload, DispatchError> {
        let dispatcher = Dispatcher::new(&self.registry);
        match self.resolve(&request) {
            Resolution::Route(found) => {
                debug!(method = %request.method(), path = request.path(), route = %found.route, "route matched");
                request.set_params(found.params);
                dispatcher.dispatch(&found.handler, &request)
            }
            Resolution::Convention(mca) => {
                debug!(method = %request.method(), path = request.path(), controller = %mca.controller_class, action = %mca.action, "convention dispatch");
                dispatcher.dispatch_controller(&mca, &request)
            }
            Resolution::NotFound => Err(DispatchError::NotFound(request.path().to_owned())),
        }
    }

    /// Checks and invokes a route value that was not compiled into the table.
    pub fn dispatch_value(&self, route: &str, value: &RouteValue, request: &Request) -> Result<Payload, DispatchError> {
        Dispatcher::new(&self.registry).dispatch_value(route, value, request)
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

/// Collects routes, classes and configuration, then compiles them.
#[derive(Default)]
pub struct RouterBuilder {
    routes: RouteSource,
    registry: Registry,
    config: RouterConfig,
}

impl RouterBuilder {
    pub fn routes(mut self, routes: RouteSource) -> Self {
        self.routes = routes;
        self
    }

    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Compiles the route table. Fails on the first malformed declaration.
    pub fn build(self) -> Result<Router, ConfigError> {
        let table = RouteCompiler::new(&self.registry).compile(&self.routes)?;
        let convention = ConventionResolver::from_config(&self.config);
        info!(
            routes = table.len(),
            classes = self.registry.len(),
            convention = !self.config.only_match_rule,
            "router built"
        );
        Ok(Router { table, registry: self.registry, config: self.config, convention })
    }
}

// ── RouterCell ────────────────────────────────────────────────────────────────

/// A router built on first use and shared afterwards.
///
/// ```rust
/// use switchyard::{RouteSource, Router, RouterCell};
///
/// static ROUTER: RouterCell = RouterCell::new();
///
/// let router = ROUTER
///     .get_or_try_init(|| Router::builder().routes(RouteSource::new().route("/", "home")).build())
///     .unwrap();
/// assert_eq!(router.table().len(), 1);
/// ```
pub struct RouterCell {
    cell: OnceCell<Arc<Router>>,
}

impl RouterCell {
    pub const fn new() -> Self {
        Self { cell: OnceCell::new() }
    }

    pub fn get(&self) -> Option<Arc<Router>> {
        self.cell.get().cloned()
    }

    /// Returns the router, building it if this is the first call. A failed
    /// build leaves the cell empty.
    pub fn get_or_try_init<F>(&self, build: F) -> Result<Arc<Router>, ConfigError>
    where
        F: FnOnce() -> Result<Router, ConfigError>,
    {
        self.cell.get_or_try_init(|| build().map(Arc::new)).cloned()
    }
}

impl Default for RouterCell {
    fn default() -> Self { Self::new() }
}
