//! # switchyard
//!
//! Declarative request routing: a table of `[METHODS:]path => handler`
//! entries, compiled once into an ordered match list, with a
//! module/controller/action naming convention for everything the table
//! does not cover.
//!
//! ## The contract
//!
//! The router maps a method and a path to a payload. Nothing more:
//!
//! - Route tables are plain data. Groups nest, `:name` and `:name<regex>`
//!   segments capture, and `[class]` entries expand to one route per
//!   action method.
//! - Classes are registered ahead of time in a [`Registry`], each with a
//!   constructor and named, parameterized methods.
//! - Anything that fails to compile fails at startup with a
//!   [`ConfigError`]. Nothing is discovered lazily on the request path.
//! - Paths no route matches go to `{root}.controllers.{Name}Controller` by
//!   convention, unless `only_match_rule` is set.
//! - A handler's result is a [`Payload`]. Formatting is a separate,
//!   configurable step, and [`RouterService`] does it for hyper.
//!
//! ## Quick start
//!
//! ```rust
//! use serde_json::json;
//! use switchyard::{Args, DispatchError, Method, Registry, Request, RouteSource, Router};
//!
//! struct Calc;
//!
//! let mut registry = Registry::new();
//! registry
//!     .service("app.services.Calc", || Calc)
//!     .method("add", ["a", "b"], |_: &mut Calc, args: &Args<'_>| {
//!         Ok::<_, DispatchError>(args.parse::<i64>("a")? + args.parse::<i64>("b")?)
//!     });
//!
//! let routes = RouteSource::new()
//!     .route("GET:/health", "ok")
//!     .route("/calc/add", ["app.services.Calc", "add"])
//!     .group("/v1", RouteSource::new().route("/user/:id<\\d+>", "user"));
//!
//! let router = Router::builder().routes(routes).registry(registry).build()?;
//!
//! let sum = router.handle(Request::new(Method::Get, "/calc/add?a=2&b=3"))?;
//! assert_eq!(sum, json!(5));
//!
//! let user = router.handle(Request::new(Method::Get, "/v1/user/42.json"))?;
//! assert_eq!(user, json!("user"));
//! # Ok::<(), switchyard::Error>(())
//! ```

mod body;
mod compiler;
mod config;
mod convention;
mod dispatch;
mod error;
mod handler;
mod method;
mod registry;
mod request;
mod response;
mod router;
mod service;
mod source;
mod table;

pub use body::{BodyParser, BodyParsers, FormParser, JsonParser};
pub use compiler::{action_route, split_method, RouteCompiler, DEFAULT_PARAM_PATTERN};
pub use config::{ResponseFormat, RouterConfig};
pub use convention::{ConventionResolver, Mca};
pub use dispatch::Dispatcher;
pub use error::{ConfigError, DispatchError, Error};
pub use handler::{Callable, Handler};
pub use method::{Method, MethodSet, ParseMethodError};
pub use registry::{
    Action, ActionContext, Args, BeforeAction, ClassBuilder, ClassDef, ClassKind, Controller, MethodDef, Param,
    Registry, ACTION_PREFIX,
};
pub use request::Request;
pub use response::{ContentType, IntoPayload, Json, JsonFormatter, Payload, RawFormatter, Response, ResponseFormatter};
pub use router::{Resolution, Router, RouterBuilder, RouterCell};
pub use service::RouterService;
pub use source::{RouteSource, RouteValue, GROUP_PREFIX};
pub use table::{normalize_path, CompiledRoute, RouteMatch, RouteTable};
