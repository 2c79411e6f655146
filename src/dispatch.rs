//! Handler invocation and argument binding.
//!
//! Two binding rules, one per dispatch path:
//!
//! | path                   | each declared parameter binds from          |
//! |------------------------|---------------------------------------------|
//! | route `[class, method]`| route param, query, declared default, none  |
//! | convention controller  | query, declared default, none               |
//!
//! Route params are not consulted for convention dispatch: a conventional
//! path has no `:name` segments to capture.

use crate::convention::{ucfirst, Mca};
use crate::error::DispatchError;
use crate::handler::Handler;
use crate::method::Method;
use crate::registry::{ActionContext, Args, BeforeAction, ClassDef, ClassKind, MethodDef, Param, Registry, ACTION_PREFIX};
use crate::request::Request;
use crate::response::Payload;
use crate::source::RouteValue;

/// Invokes handlers against a request.
pub struct Dispatcher<'a> {
    registry: &'a Registry,
}

impl<'a> Dispatcher<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Invokes a resolved route handler. Route params must already be set on
    /// the request.
    pub fn dispatch(&self, handler: &Handler, request: &Request) -> Result<Payload, DispatchError> {
        match handler {
            Handler::Literal(payload) => Ok(payload.clone()),
            Handler::Callable(f)      => f.call(),
            Handler::Action(action)   => {
                let args = bind(action.params(), request, true);
                action.invoke(&args)
            }
        }
    }

    /// Checks and invokes a route value that did not go through compilation.
    ///
    /// Any shape the compiler would reject is an
    /// [`DispatchError::InvalidHandler`] here.
    pub fn dispatch_value(&self, route: &str, value: &RouteValue, request: &Request) -> Result<Payload, DispatchError> {
        let handler = Handler::resolve(value, self.registry).map_err(|e| e.into_dispatch(route))?;
        self.dispatch(&handler, request)
    }

    /// Runs a controller action found by convention, with its lifecycle.
    pub fn dispatch_controller(&self, mca: &Mca, request: &Request) -> Result<Payload, DispatchError> {
        let class = self
            .registry
            .get(&mca.controller_class)
            .filter(|class| class.kind() == ClassKind::Controller)
            .ok_or_else(|| DispatchError::NotFound(mca.controller_class.clone()))?;

        let mut instance = class.instantiate();
        let action = if mca.action.is_empty() {
            instance.default_action().to_owned()
        } else {
            mca.action.clone()
        };

        if instance.runs_before_action(&action) {
            let ctx = ActionContext { action: &action, method: request.method(), request };
            match instance.before_action(&ctx) {
                BeforeAction::Continue      => {}
                BeforeAction::Halt          => return Ok(Payload::Null),
                BeforeAction::Respond(body) => return Ok(body),
            }
        }

        let method = find_action(class, request.method(), &action)
            .or_else(|| instance.empty_action_method().and_then(|name| class.method(name)))
            .ok_or_else(|| {
                DispatchError::NotFound(format!("{}::{ACTION_PREFIX}{}", class.name(), ucfirst(&action)))
            })?;

        let args = bind(method.params(), request, false);
        method.invoke(instance.as_mut(), &args)
    }
}

/// `action{Method}{Action}`, then `action{Action}`.
fn find_action<'c>(class: &'c ClassDef, method: Method, action: &str) -> Option<&'c MethodDef> {
    let action = ucfirst(action);
    class
        .method(&format!("{ACTION_PREFIX}{}{action}", method.title()))
        .or_else(|| class.method(&format!("{ACTION_PREFIX}{action}")))
}

fn bind<'a>(params: &'a [Param], request: &'a Request, route_params: bool) -> Args<'a> {
    let values = params
        .iter()
        .map(|p| {
            route_params
                .then(|| request.param(p.name()))
                .flatten()
                .or_else(|| request.get(p.name()))
                .or_else(|| p.default_value())
        })
        .collect();
    Args::new(request, params, values)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::registry::Controller;

    struct Calc;

    #[derive(Default)]
    struct UserController;

    impl Controller for UserController {
        fn before_action(&mut self, ctx: &ActionContext<'_>) -> BeforeAction {
            match ctx.request.get("token") {
                Some("deny") => BeforeAction::Halt,
                Some("teapot") => BeforeAction::Respond(json!("short and stout")),
                _ => BeforeAction::Continue,
            }
        }

        fn except_filter_actions(&self) -> &[&str] { &["public"] }
        fn empty_action_method(&self) -> Option<&str> { Some("fallback") }
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .service("app.services.Calc", || Calc)
            .method("add", [Param::new("a"), Param::with_default("b", "10")], |_: &mut Calc, args: &Args<'_>| {
                Ok::<_, DispatchError>(args.parse::<i64>("a")? + args.parse::<i64>("b")?)
            });
        registry
            .controller("app.controllers.UserController", UserController::default)
            .method("actionGetShow", ["id"], |_: &mut UserController, args: &Args<'_>| {
                format!("get show {}", args.get("id").unwrap_or("-"))
            })
            .method("actionShow", ["id"], |_: &mut UserController, _: &Args<'_>| "any show")
            .method("actionPublic", Vec::<&str>::new(), |_: &mut UserController, _: &Args<'_>| "public")
            .method("fallback", ["id"], |_: &mut UserController, args: &Args<'_>| {
                format!("fallback {}", args.get("id").unwrap_or("-"))
            });
        registry.service("app.controllers.PlainController", || Calc);
        registry
    }

    fn mca(controller_class: &str, action: &str) -> Mca {
        Mca {
            module: String::new(),
            controller: String::new(),
            action: action.to_owned(),
            controller_class: controller_class.to_owned(),
        }
    }

    #[test]
    fn route_actions_bind_params_then_query_then_defaults() {
        let registry = registry();
        let d = Dispatcher::new(&registry);
        let value = RouteValue::from(["app.services.Calc", "add"]);

        let mut req = Request::new(Method::Get, "/calc?a=1&b=2");
        req.set_params(HashMap::from([("a".to_owned(), "5".to_owned())]));
        assert_eq!(d.dispatch_value("ALL:/calc", &value, &req).unwrap(), json!(7));

        let req = Request::new(Method::Get, "/calc?a=1");
        assert_eq!(d.dispatch_value("ALL:/calc", &value, &req).unwrap(), json!(11));

        let req = Request::new(Method::Get, "/calc");
        assert!(matches!(
            d.dispatch_value("ALL:/calc", &value, &req),
            Err(DispatchError::MissingArgument { .. })
        ));
    }

    #[test]
    fn literals_and_callables() {
        let registry = registry();
        let d = Dispatcher::new(&registry);
        let req = Request::new(Method::Get, "/");
        assert_eq!(d.dispatch_value("r", &RouteValue::from("pong"), &req).unwrap(), json!("pong"));
        assert_eq!(d.dispatch_value("r", &RouteValue::callable(|| "hi"), &req).unwrap(), json!("hi"));
    }

    #[test]
    fn invalid_values_are_invalid_handlers() {
        let registry = registry();
        let d = Dispatcher::new(&registry);
        let req = Request::new(Method::Get, "/");
        for value in [RouteValue::from(["only"]), RouteValue::Table(Default::default()), RouteValue::from(["app.Missing", "x"])] {
            assert!(matches!(
                d.dispatch_value("ALL:/bad", &value, &req),
                Err(DispatchError::InvalidHandler { .. })
            ));
        }
    }

    #[test]
    fn controller_prefers_verb_specific_actions() {
        let registry = registry();
        let d = Dispatcher::new(&registry);
        let target = mca("app.controllers.UserController", "show");

        let get = Request::new(Method::Get, "/user/show?id=3");
        assert_eq!(d.dispatch_controller(&target, &get).unwrap(), json!("get show 3"));

        let post = Request::new(Method::Post, "/user/show");
        assert_eq!(d.dispatch_controller(&target, &post).unwrap(), json!("any show"));
    }

    #[test]
    fn controller_binds_from_query_only() {
        let registry = registry();
        let d = Dispatcher::new(&registry);
        let mut req = Request::new(Method::Get, "/user/show");
        req.set_params(HashMap::from([("id".to_owned(), "route".to_owned())]));
        let out = d.dispatch_controller(&mca("app.controllers.UserController", "show"), &req).unwrap();
        assert_eq!(out, json!("get show -"));
    }

    #[test]
    fn before_action_can_halt_or_respond() {
        let registry = registry();
        let d = Dispatcher::new(&registry);
        let target = mca("app.controllers.UserController", "show");

        let halted = Request::new(Method::Get, "/user/show?token=deny");
        assert_eq!(d.dispatch_controller(&target, &halted).unwrap(), Payload::Null);

        let teapot = Request::new(Method::Get, "/user/show?token=teapot");
        assert_eq!(d.dispatch_controller(&target, &teapot).unwrap(), json!("short and stout"));

        let public = Request::new(Method::Get, "/user/public?token=deny");
        let out = d.dispatch_controller(&mca("app.controllers.UserController", "public"), &public).unwrap();
        assert_eq!(out, json!("public"));
    }

    #[test]
    fn missing_actions_use_the_empty_action_method() {
        let registry = registry();
        let d = Dispatcher::new(&registry);
        let req = Request::new(Method::Get, "/user/nope?id=9");
        let out = d.dispatch_controller(&mca("app.controllers.UserController", "nope"), &req).unwrap();
        assert_eq!(out, json!("fallback 9"));
    }

    #[test]
    fn unknown_or_plain_classes_are_not_found() {
        let registry = registry();
        let d = Dispatcher::new(&registry);
        let req = Request::new(Method::Get, "/");
        for class in ["app.controllers.GhostController", "app.controllers.PlainController"] {
            assert!(d.dispatch_controller(&mca(class, "index"), &req).unwrap_err().is_not_found());
        }
    }
}
