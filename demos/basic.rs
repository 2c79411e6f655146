//! Minimal switchyard server: explicit routes, a class target and a
//! convention-dispatched controller behind hyper.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/health
//!   curl 'http://localhost:3000/calc/add?a=2&b=3'
//!   curl http://localhost:3000/v1/user/42.json
//!   curl 'http://localhost:3000/user/show?id=7'        # convention dispatch
//!   curl -X POST http://localhost:3000/user/rename \
//!        -H 'content-type: application/json' -d '{"name":"alice"}'

use std::net::SocketAddr;
use std::sync::Arc;

use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use serde::Serialize;
use switchyard::{
    ActionContext, Args, BeforeAction, Controller, DispatchError, Json, Registry, RouteSource, Router, RouterCell,
    RouterConfig, RouterService,
};
use tokio::net::TcpListener;
use tracing::{error, info};

static ROUTER: RouterCell = RouterCell::new();

struct CalcService;

#[derive(Serialize)]
struct User {
    id: u64,
    name: String,
}

#[derive(Default)]
struct UserController;

impl Controller for UserController {
    fn before_action(&mut self, ctx: &ActionContext<'_>) -> BeforeAction {
        info!(action = ctx.action, method = %ctx.method, "user controller");
        BeforeAction::Continue
    }
}

fn build() -> Result<Router, switchyard::ConfigError> {
    let mut registry = Registry::new();
    registry
        .service("app.services.CalcService", || CalcService)
        .method("add", ["a", "b"], |_: &mut CalcService, args: &Args<'_>| {
            Ok::<_, DispatchError>(args.parse::<i64>("a")? + args.parse::<i64>("b")?)
        });
    registry
        .controller("app.controllers.UserController", UserController::default)
        .method("actionShow", ["id"], |_: &mut UserController, args: &Args<'_>| {
            Ok::<_, DispatchError>(Json(User { id: args.parse("id")?, name: "alice".to_owned() }))
        })
        .method("actionPostRename", Vec::<&str>::new(), |_: &mut UserController, args: &Args<'_>| {
            let name = args.request().post("name").and_then(|v| v.as_str()).unwrap_or("nobody");
            format!("renamed to {name}")
        });

    let routes = RouteSource::new()
        .route("GET:/health", "ok")
        .route("/calc/add", ["app.services.CalcService", "add"])
        .group("GET:/v1", RouteSource::new().route("/user/:id<\\d+>", "a user"));

    let config = RouterConfig { format: switchyard::ResponseFormat::Json, ..RouterConfig::default() };
    Router::builder().routes(routes).registry(registry).config(config).build()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let router = ROUTER.get_or_try_init(build)?;
    let service = RouterService::new(Arc::clone(&router));

    let addr: SocketAddr = "0.0.0.0:3000".parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, routes = router.table().len(), "switchyard listening");

    loop {
        let (stream, remote_addr) = match listener.accept().await {
            Ok(v) => v,
            Err(e) => {
                error!("accept error: {e}");
                continue;
            }
        };

        let service = service.clone();
        tokio::spawn(async move {
            // `auto::Builder` serves HTTP/1.1 and HTTP/2, whichever the client speaks.
            if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                error!(peer = %remote_addr, "connection error: {e}");
            }
        });
    }
}
