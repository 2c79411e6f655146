//! `hyper` service adapter.
//!
//! [`RouterService`] plugs a [`Router`] into any hyper connection builder.
//! Per request it:
//!
//! 1. Maps the method (unknown methods and `CLI` get `405`).
//! 2. Collects the body and decodes it with the configured [`BodyParsers`].
//! 3. Runs [`Router::handle`].
//! 4. Formats the payload, or turns the [`DispatchError`] into its status.
//!
//! The error type is [`Infallible`]: every failure becomes a response, so
//! hyper never sees an error.
//!
//! Routing itself is synchronous. Handlers run on the connection task; move
//! blocking work onto `spawn_blocking` inside the handler if needed.

use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::service::Service;
use tracing::{debug, error};

use crate::body::BodyParsers;
use crate::error::DispatchError;
use crate::method::Method;
use crate::request::Request;
use crate::response::{Response, ResponseFormatter};
use crate::router::Router;

/// A cloneable hyper service around a shared router.
#[derive(Clone)]
pub struct RouterService {
    router: Arc<Router>,
    parsers: Arc<BodyParsers>,
    formatter: Arc<dyn ResponseFormatter>,
}

impl RouterService {
    /// Uses the default body parsers and the formatter from the router's
    /// configuration.
    pub fn new(router: Arc<Router>) -> Self {
        let formatter = router.config().formatter();
        Self { router, parsers: Arc::new(BodyParsers::default()), formatter }
    }

    pub fn with_parsers(mut self, parsers: BodyParsers) -> Self {
        self.parsers = Arc::new(parsers);
        self
    }

    pub fn with_formatter(mut self, formatter: impl ResponseFormatter) -> Self {
        self.formatter = Arc::new(formatter);
        self
    }

    pub fn router(&self) -> &Router { &self.router }

    /// Handles one request end to end.
    pub async fn respond<B>(&self, req: http::Request<B>) -> http::Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Display,
    {
        let (parts, body) = req.into_parts();
        let target = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path(), |pq| pq.as_str());

        // CLI is only reachable through `Request::cli`, never over the wire.
        let method = match parts.method.as_str().parse::<Method>() {
            Ok(method) if method != Method::Cli => method,
            _ => {
                debug!(method = %parts.method, path = parts.uri.path(), "unsupported method");
                return Response::status(StatusCode::METHOD_NOT_ALLOWED).into_http();
            }
        };

        let raw = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                debug!(error = %e, "failed to read request body");
                return Response::status(StatusCode::BAD_REQUEST).into_http();
            }
        };

        let mut request = Request::new(method, target);
        request.headers = parts
            .headers
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_owned(), value.to_str().ok()?.to_owned())))
            .collect();

        let response = match self.parsers.parse(request.header("content-type"), &raw) {
            Ok(body) => {
                request.body = body;
                self.dispatch(request)
            }
            Err(err) => {
                debug!(error = %err, "rejected request body");
                Response::from(err)
            }
        };

        debug!(method = %method, path = parts.uri.path(), status = response.status_code().as_u16(), "request handled");
        response.into_http()
    }

    fn dispatch(&self, request: Request) -> Response {
        match self.router.handle(request) {
            Ok(payload) => self.formatter.format(&payload),
            Err(err) => {
                match &err {
                    DispatchError::InvalidHandler { .. } | DispatchError::Payload(_) => error!(error = %err, "dispatch failed"),
                    _ => debug!(error = %err, "dispatch failed"),
                }
                Response::from(err)
            }
        }
    }
}

impl<B> Service<http::Request<B>> for RouterService
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Display,
{
    type Response = http::Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Infallible>> + Send>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let this = self.clone();
        Box::pin(async move { Ok(this.respond(req).await) })
    }
}
