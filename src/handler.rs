//! Route handlers and type erasure.
//!
//! # What a route can point at
//!
//! A route value is resolved once, when the table is built, into one of
//! three handler shapes:
//!
//! ```text
//! "pong"                              → Handler::Literal   (returned as-is)
//! RouteValue::callable(|| "pong")     → Handler::Callable  (called with no args)
//! ["app.services.Calc", "add"]        → Handler::Action    (class looked up, method bound)
//! ```
//!
//! # How callables are stored
//!
//! Callables of different closure types live side by side in one route
//! table, so they are stored as trait objects:
//!
//! ```text
//! || "pong"                                  ← user writes this
//!        ↓ RouteValue::callable(…)
//! f.into_boxed_callable()                    ← Callable blanket impl
//!        ↓
//! Arc::new(FnCallable(f))                    ← stored as BoxedCallable
//!        ↓
//! callable.call()  at request time           ← one vtable dispatch
//! ```

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::error::{ConfigError, DispatchError};
use crate::registry::{Action, Registry};
use crate::response::{IntoPayload, Payload};
use crate::source::RouteValue;

// ── Callable erasure ──────────────────────────────────────────────────────────

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Callable` trait's `into_boxed_callable` method.
#[doc(hidden)]
pub trait ErasedCallable {
    fn call(&self) -> Result<Payload, DispatchError>;
}

/// A type-erased callable shared by every request that hits its route.
#[doc(hidden)]
pub type BoxedCallable = Arc<dyn ErasedCallable + Send + Sync + 'static>;

/// Implemented for every zero-argument route callable.
///
/// Sealed: it is satisfied by any `Fn() -> impl IntoPayload` and cannot be
/// implemented by hand.
pub trait Callable: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_callable(self) -> BoxedCallable;
}

mod private {
    pub trait Sealed {}
}

impl<F, R> private::Sealed for F
where
    F: Fn() -> R + Send + Sync + 'static,
    R: IntoPayload,
{
}

impl<F, R> Callable for F
where
    F: Fn() -> R + Send + Sync + 'static,
    R: IntoPayload,
{
    fn into_boxed_callable(self) -> BoxedCallable {
        Arc::new(FnCallable(self))
    }
}

struct FnCallable<F>(F);

impl<F, R> ErasedCallable for FnCallable<F>
where
    F: Fn() -> R + Send + Sync,
    R: IntoPayload,
{
    fn call(&self) -> Result<Payload, DispatchError> {
        (self.0)().into_payload()
    }
}

// ── Resolved handlers ─────────────────────────────────────────────────────────

/// A route target after build-time resolution.
#[derive(Clone)]
pub enum Handler {
    /// Returned verbatim.
    Literal(Payload),
    /// Invoked with no arguments.
    Callable(BoxedCallable),
    /// A registered class method, arguments bound from the request.
    Action(Action),
}

impl Handler {
    /// Checks a route value's shape and resolves class references.
    ///
    /// Single-element targets are expanded by the compiler before reaching
    /// here, so they are rejected like any other wrong arity.
    pub(crate) fn resolve(value: &RouteValue, registry: &Registry) -> Result<Self, ShapeError> {
        match value {
            RouteValue::Literal(payload) => Ok(Self::Literal(payload.clone())),
            RouteValue::Callable(f)      => Ok(Self::Callable(Arc::clone(f))),
            RouteValue::Target(parts)    => match parts.as_slice() {
                [class, method] => {
                    let def = registry
                        .get(class)
                        .ok_or_else(|| ShapeError::UnknownClass(class.clone()))?;
                    let method_def = def.method(method).ok_or_else(|| ShapeError::UnknownMethod {
                        class: class.clone(),
                        method: method.clone(),
                    })?;
                    Ok(Self::Action(def.action(method_def)))
                }
                other => Err(ShapeError::Arity(other.len())),
            },
            RouteValue::Table(_) => Err(ShapeError::NotAHandler),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Literal(_)  => "literal",
            Self::Callable(_) => "callable",
            Self::Action(_)   => "action",
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(payload) => f.debug_tuple("Literal").field(payload).finish(),
            Self::Callable(_)      => f.write_str("Callable(..)"),
            Self::Action(action)   => f.debug_tuple("Action").field(action).finish(),
        }
    }
}

/// Why a route value is not an invocable handler.
///
/// Raised at build time as a [`ConfigError`] and, for values dispatched
/// without compilation, as [`DispatchError::InvalidHandler`].
#[derive(Debug, Error)]
pub(crate) enum ShapeError {
    #[error("expected a literal, a callable or a [class, method] pair")]
    NotAHandler,

    #[error("expected [class, method], got {0} element(s)")]
    Arity(usize),

    #[error("class `{0}` is not registered")]
    UnknownClass(String),

    #[error("method `{method}` not found on `{class}`")]
    UnknownMethod { class: String, method: String },
}

impl ShapeError {
    pub(crate) fn into_config(self, route: &str) -> ConfigError {
        let route = route.to_owned();
        match self {
            Self::NotAHandler              => ConfigError::InvalidHandler { route },
            Self::Arity(len)               => ConfigError::InvalidArity { route, len },
            Self::UnknownClass(class)      => ConfigError::UnknownClass { route, class },
            Self::UnknownMethod { class, method } => ConfigError::UnknownMethod { route, class, method },
        }
    }

    pub(crate) fn into_dispatch(self, route: &str) -> DispatchError {
        DispatchError::InvalidHandler { route: route.to_owned(), reason: self.to_string() }
    }
}
