//! HTTP method as a typed enum, plus the method sets routes are bound to.
//!
//! Covers the RFC 9110 methods a route table can name, and `CLI`, the
//! pseudo-method used when a request is driven from the command line instead
//! of a socket.
//!
//! Route keys spell method constraints as `GET|POST:/path`. Tokens are
//! case-insensitive there; `ALL` is shorthand for every method.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A known HTTP method.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    Trace,
    Connect,
    /// Command-line invocation. Never sent over the wire.
    Cli,
}

impl Method {
    /// Every method, in the order used for display and expansion.
    pub const ALL: [Method; 10] = [
        Self::Get,
        Self::Post,
        Self::Put,
        Self::Delete,
        Self::Head,
        Self::Options,
        Self::Patch,
        Self::Trace,
        Self::Connect,
        Self::Cli,
    ];

    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Delete  => "DELETE",
            Self::Get     => "GET",
            Self::Head    => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch   => "PATCH",
            Self::Post    => "POST",
            Self::Put     => "PUT",
            Self::Trace   => "TRACE",
            Self::Cli     => "CLI",
        }
    }

    /// Capitalised form used inside action method names (`actionGetInfo`).
    pub fn title(self) -> &'static str {
        match self {
            Self::Connect => "Connect",
            Self::Delete  => "Delete",
            Self::Get     => "Get",
            Self::Head    => "Head",
            Self::Options => "Options",
            Self::Patch   => "Patch",
            Self::Post    => "Post",
            Self::Put     => "Put",
            Self::Trace   => "Trace",
            Self::Cli     => "Cli",
        }
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// Returned when a string names no known method.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("unknown http method `{0}`")]
pub struct ParseMethodError(pub String);

/// Parses an uppercase method string (e.g. `"GET"`). Case-sensitive per RFC 9110 §9.1.
impl FromStr for Method {
    type Err = ParseMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONNECT" => Ok(Self::Connect),
            "DELETE"  => Ok(Self::Delete),
            "GET"     => Ok(Self::Get),
            "HEAD"    => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            "PATCH"   => Ok(Self::Patch),
            "POST"    => Ok(Self::Post),
            "PUT"     => Ok(Self::Put),
            "TRACE"   => Ok(Self::Trace),
            "CLI"     => Ok(Self::Cli),
            _         => Err(ParseMethodError(s.to_owned())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── MethodSet ─────────────────────────────────────────────────────────────────

/// The set of methods a compiled route accepts.
///
/// Stored as a bitmask. The number of members is the route's method
/// specificity: fewer members sort earlier in the route table.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct MethodSet(u16);

impl MethodSet {
    pub const EMPTY: MethodSet = MethodSet(0);
    pub const ALL: MethodSet = MethodSet((1 << Method::ALL.len()) - 1);

    pub fn single(method: Method) -> Self {
        Self(method.bit())
    }

    pub fn contains(self, method: Method) -> bool {
        self.0 & method.bit() != 0
    }

    pub fn insert(&mut self, method: Method) {
        self.0 |= method.bit();
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn is_all(self) -> bool {
        self == Self::ALL
    }

    pub fn iter(self) -> impl Iterator<Item = Method> {
        Method::ALL.into_iter().filter(move |m| self.contains(*m))
    }

    /// Parses a route-key method prefix such as `get|Post` or `ALL`.
    ///
    /// Returns `None` unless every `|`-separated token is a known method, so
    /// that a path like `/user/:id` is never mistaken for a method prefix.
    pub fn parse(spec: &str) -> Option<Self> {
        let mut set = Self::EMPTY;
        for token in spec.split('|') {
            let token = token.to_ascii_uppercase();
            if token == "ALL" {
                set = Self::ALL;
                continue;
            }
            set.insert(token.parse().ok()?);
        }
        (!set.is_empty()).then_some(set)
    }
}

impl FromIterator<Method> for MethodSet {
    fn from_iter<I: IntoIterator<Item = Method>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for method in iter {
            set.insert(method);
        }
        set
    }
}

impl From<Method> for MethodSet {
    fn from(method: Method) -> Self {
        Self::single(method)
    }
}

/// `ALL` for the full set, otherwise `GET|POST` style.
impl fmt::Display for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_all() {
            return f.write_str("ALL");
        }
        for (i, method) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            f.write_str(method.as_str())?;
        }
        Ok(())
    }
}
