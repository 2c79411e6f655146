//! Handler classes, declared ahead of time.
//!
//! Route tables name handlers by class and method (`["app.services.Calc",
//! "add"]`), and convention dispatch derives controller class names from the
//! path. Rust has no runtime reflection to find those, so every class is
//! registered up front: a constructor plus an ordered list of methods, each
//! with its parameter names and a typed invoker.
//!
//! ```text
//! registry.service("app.services.Calc", || Calc)      ← constructor
//!     .method("add", ["a", "b"], |calc, args| …)       ← name, params, body
//!        ↓
//! ClassDef { construct: Arc<dyn Fn() -> Box<dyn Instance>>,
//!            methods:   [MethodDef { params, invoke: Arc<dyn Fn(&mut dyn Any, &Args)> }] }
//! ```
//!
//! The invoker downcasts the erased instance back to the concrete type it was
//! registered with, so the only per-call cost is one allocation for the
//! instance and one virtual call.

use std::any::{type_name, Any};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::DispatchError;
use crate::method::Method;
use crate::request::Request;
use crate::response::{IntoPayload, Payload};

/// Methods whose name starts with this prefix are actions: they are expanded
/// by `[class]` routes and looked up by convention dispatch.
pub const ACTION_PREFIX: &str = "action";

// ── Parameters and bound arguments ────────────────────────────────────────────

/// A declared method parameter.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Param {
    name: String,
    default: Option<String>,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), default: None }
    }

    /// A parameter with a declared default, used when no request data binds it.
    pub fn with_default(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self { name: name.into(), default: Some(default.into()) }
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn default_value(&self) -> Option<&str> { self.default.as_deref() }
}

impl From<&str> for Param {
    fn from(name: &str) -> Self { Self::new(name) }
}

impl From<String> for Param {
    fn from(name: String) -> Self { Self::new(name) }
}

/// Arguments bound to a method's declared parameters, in declaration order.
///
/// A slot is `None` when nothing bound it. Absent values are not an error
/// until the handler asks for one with [`Args::require`] or [`Args::parse`].
pub struct Args<'a> {
    request: &'a Request,
    params: &'a [Param],
    values: Vec<Option<&'a str>>,
}

impl<'a> Args<'a> {
    pub(crate) fn new(request: &'a Request, params: &'a [Param], values: Vec<Option<&'a str>>) -> Self {
        Self { request, params, values }
    }

    /// The request being dispatched, for handlers that need more than their
    /// bound arguments (body parameters, headers).
    pub fn request(&self) -> &'a Request { self.request }

    pub fn len(&self) -> usize { self.values.len() }
    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// Positional access.
    pub fn at(&self, index: usize) -> Option<&'a str> {
        self.values.get(index).copied().flatten()
    }

    /// Access by declared parameter name.
    pub fn get(&self, name: &str) -> Option<&'a str> {
        let index = self.params.iter().position(|p| p.name == name)?;
        self.at(index)
    }

    pub fn require(&self, name: &str) -> Result<&'a str, DispatchError> {
        self.get(name)
            .ok_or_else(|| DispatchError::MissingArgument { name: name.to_owned() })
    }

    /// Parses a bound argument, failing if it is absent or malformed.
    pub fn parse<T: FromStr>(&self, name: &str) -> Result<T, DispatchError> {
        let raw = self.require(name)?;
        raw.parse().map_err(|_| DispatchError::InvalidArgument {
            name: name.to_owned(),
            value: raw.to_owned(),
        })
    }

    /// Parses a bound argument if present.
    pub fn parse_opt<T: FromStr>(&self, name: &str) -> Result<Option<T>, DispatchError> {
        match self.get(name) {
            Some(_) => self.parse(name).map(Some),
            None    => Ok(None),
        }
    }

    /// `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, Option<&'a str>)> + '_ {
        self.params.iter().map(|p| p.name.as_str()).zip(self.values.iter().copied())
    }
}

// ── Controller lifecycle ──────────────────────────────────────────────────────

/// What a controller's `before_action` hook decided.
#[derive(Clone, Debug, PartialEq)]
pub enum BeforeAction {
    /// Run the action.
    Continue,
    /// Skip the action and respond with an empty payload.
    Halt,
    /// Skip the action and respond with this payload.
    Respond(Payload),
}

/// The action about to run, as seen by `before_action`.
pub struct ActionContext<'a> {
    pub action: &'a str,
    pub method: Method,
    pub request: &'a Request,
}

/// Lifecycle hooks for classes dispatched by convention.
///
/// Every hook has a default, so a bare `impl Controller for UserController {}`
/// is a valid controller.
pub trait Controller: 'static {
    /// Runs before the action. See [`Controller::only_filter_actions`] for when.
    fn before_action(&mut self, ctx: &ActionContext<'_>) -> BeforeAction {
        let _ = ctx;
        BeforeAction::Continue
    }

    /// When non-empty, `before_action` runs only for these action names.
    fn only_filter_actions(&self) -> &[&str] { &[] }

    /// When non-empty (and the only-list is empty), `before_action` runs for
    /// every action except these.
    fn except_filter_actions(&self) -> &[&str] { &[] }

    /// Action used when the resolved action name is empty.
    fn default_action(&self) -> &str { "index" }

    /// Method invoked when no action method matches. `None` means 404.
    fn empty_action_method(&self) -> Option<&str> { None }
}

/// A constructed handler object with its class's lifecycle behind one vtable.
pub(crate) trait Instance {
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn before_action(&mut self, ctx: &ActionContext<'_>) -> BeforeAction;
    fn runs_before_action(&self, action: &str) -> bool;
    fn default_action(&self) -> &str;
    fn empty_action_method(&self) -> Option<&str>;
}

/// A service: no lifecycle.
struct Plain<T>(T);

impl<T: 'static> Instance for Plain<T> {
    fn as_any_mut(&mut self) -> &mut dyn Any { &mut self.0 }
    fn before_action(&mut self, _: &ActionContext<'_>) -> BeforeAction { BeforeAction::Continue }
    fn runs_before_action(&self, _: &str) -> bool { false }
    fn default_action(&self) -> &str { "index" }
    fn empty_action_method(&self) -> Option<&str> { None }
}

/// A controller: hooks delegate to the [`Controller`] impl.
struct Managed<T>(T);

impl<T: Controller> Instance for Managed<T> {
    fn as_any_mut(&mut self) -> &mut dyn Any { &mut self.0 }

    fn before_action(&mut self, ctx: &ActionContext<'_>) -> BeforeAction {
        self.0.before_action(ctx)
    }

    fn runs_before_action(&self, action: &str) -> bool {
        let only = self.0.only_filter_actions();
        if !only.is_empty() {
            return only.contains(&action);
        }
        let except = self.0.except_filter_actions();
        !except.contains(&action)
    }

    fn default_action(&self) -> &str { self.0.default_action() }
    fn empty_action_method(&self) -> Option<&str> { self.0.empty_action_method() }
}

// ── Class and method definitions ──────────────────────────────────────────────

type Construct = dyn Fn() -> Box<dyn Instance> + Send + Sync;
type Invoke = dyn Fn(&mut dyn Any, &Args<'_>) -> Result<Payload, DispatchError> + Send + Sync;

/// How a class may be dispatched.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClassKind {
    /// Constructed plainly; reachable through explicit routes only.
    Service,
    /// Has the controller lifecycle; also reachable by convention dispatch.
    Controller,
}

/// A registered method: its name, declared parameters and invoker.
#[derive(Clone)]
pub struct MethodDef {
    name: String,
    params: Arc<[Param]>,
    invoke: Arc<Invoke>,
}

impl MethodDef {
    pub fn name(&self) -> &str { &self.name }
    pub fn params(&self) -> &[Param] { &self.params }

    pub(crate) fn invoke(&self, instance: &mut dyn Instance, args: &Args<'_>) -> Result<Payload, DispatchError> {
        (self.invoke)(instance.as_any_mut(), args)
    }
}

impl fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A registered class.
pub struct ClassDef {
    name: String,
    kind: ClassKind,
    construct: Arc<Construct>,
    methods: Vec<MethodDef>,
}

impl ClassDef {
    pub fn name(&self) -> &str { &self.name }
    pub fn kind(&self) -> ClassKind { self.kind }

    /// Methods in registration order.
    pub fn methods(&self) -> &[MethodDef] { &self.methods }

    pub fn method(&self, name: &str) -> Option<&MethodDef> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub(crate) fn instantiate(&self) -> Box<dyn Instance> {
        (self.construct)()
    }

    /// Binds one of this class's methods into a self-contained handler.
    pub(crate) fn action(&self, method: &MethodDef) -> Action {
        Action {
            class: self.name.clone(),
            construct: Arc::clone(&self.construct),
            method: method.clone(),
        }
    }
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

/// A class method resolved at build time: `[class, method]` after lookup.
///
/// Invoking it constructs a fresh instance through the class constructor and
/// skips any controller lifecycle.
#[derive(Clone)]
pub struct Action {
    class: String,
    construct: Arc<Construct>,
    method: MethodDef,
}

impl Action {
    pub fn class(&self) -> &str { &self.class }
    pub fn method(&self) -> &str { &self.method.name }
    pub fn params(&self) -> &[Param] { &self.method.params }

    pub(crate) fn invoke(&self, args: &Args<'_>) -> Result<Payload, DispatchError> {
        let mut instance = (self.construct)();
        self.method.invoke(instance.as_mut(), args)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.class, self.method.name)
    }
}

// ── Registry ──────────────────────────────────────────────────────────────────

/// All handler classes known to a router, by name.
#[derive(Default)]
pub struct Registry {
    classes: HashMap<String, ClassDef>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plain class. Registering a name twice replaces the first.
    pub fn service<T, F>(&mut self, name: impl Into<String>, factory: F) -> ClassBuilder<'_, T>
    where
        T: 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let construct: Arc<Construct> = Arc::new(move || Box::new(Plain(factory())) as Box<dyn Instance>);
        self.insert(name.into(), ClassKind::Service, construct)
    }

    /// Registers a controller. Registering a name twice replaces the first.
    pub fn controller<T, F>(&mut self, name: impl Into<String>, factory: F) -> ClassBuilder<'_, T>
    where
        T: Controller,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let construct: Arc<Construct> = Arc::new(move || Box::new(Managed(factory())) as Box<dyn Instance>);
        self.insert(name.into(), ClassKind::Controller, construct)
    }

    fn insert<T>(&mut self, name: String, kind: ClassKind, construct: Arc<Construct>) -> ClassBuilder<'_, T> {
        let def = ClassDef { name: name.clone(), kind, construct, methods: Vec::new() };
        let def = match self.classes.entry(name) {
            Entry::Occupied(mut e) => {
                e.insert(def);
                e.into_mut()
            }
            Entry::Vacant(e) => e.insert(def),
        };
        ClassBuilder { def, _marker: PhantomData }
    }

    pub fn get(&self, name: &str) -> Option<&ClassDef> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn len(&self) -> usize { self.classes.len() }
    pub fn is_empty(&self) -> bool { self.classes.is_empty() }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.classes.keys()).finish()
    }
}

/// Adds methods to a class being registered.
pub struct ClassBuilder<'r, T> {
    def: &'r mut ClassDef,
    _marker: PhantomData<fn(&mut T)>,
}

impl<T: 'static> ClassBuilder<'_, T> {
    /// Declares a method with its parameter names and body.
    ///
    /// The body receives the instance and the arguments bound to `params`.
    /// It may return anything [`IntoPayload`], including
    /// `Result<_, DispatchError>` so that `args.parse("id")?` works.
    pub fn method<P, F, R>(self, name: impl Into<String>, params: impl IntoIterator<Item = P>, body: F) -> Self
    where
        P: Into<Param>,
        F: Fn(&mut T, &Args<'_>) -> R + Send + Sync + 'static,
        R: IntoPayload,
    {
        let name = name.into();
        let method = name.clone();
        let invoke = erase(move |instance, args| {
            let this = instance.downcast_mut::<T>().ok_or_else(|| DispatchError::InvalidHandler {
                route: method.clone(),
                reason: format!("instance is not a `{}`", type_name::<T>()),
            })?;
            body(this, args).into_payload()
        });
        self.def.methods.push(MethodDef {
            name,
            params: params.into_iter().map(Into::into).collect(),
            invoke,
        });
        self
    }
}

fn erase<F>(invoke: F) -> Arc<Invoke>
where
    F: Fn(&mut dyn Any, &Args<'_>) -> Result<Payload, DispatchError> + Send + Sync + 'static,
{
    Arc::new(invoke)
}
