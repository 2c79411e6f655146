use std::collections::HashMap;

use serde_json::json;
use switchyard::{
    ActionContext, Args, BeforeAction, ConfigError, Controller, DispatchError, Handler, Method, MethodSet, Payload,
    Registry, Request, Resolution, RouteSource, Router, RouterConfig,
};

// ── Fixtures ──────────────────────────────────────────────────────────────────

struct CalcService;

struct ProfileController;

impl Controller for ProfileController {}

#[derive(Default)]
struct UserController {
    greeting: String,
}

impl Controller for UserController {
    fn before_action(&mut self, ctx: &ActionContext<'_>) -> BeforeAction {
        if ctx.request.get("banned").is_some() {
            return BeforeAction::Respond(json!({ "error": "banned" }));
        }
        self.greeting = format!("hi from {}", ctx.action);
        BeforeAction::Continue
    }

    fn only_filter_actions(&self) -> &[&str] { &["show"] }
}

fn registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .service("app.services.CalcService", || CalcService)
        .method("add", ["a", "b"], |_: &mut CalcService, args: &Args<'_>| {
            Ok::<_, DispatchError>(args.parse::<i64>("a")? + args.parse::<i64>("b")?)
        });
    registry
        .controller("app.controllers.ProfileController", || ProfileController)
        .method("actionIndex", Vec::<&str>::new(), |_: &mut ProfileController, _: &Args<'_>| "index")
        .method("actionGetProfile", ["id"], |_: &mut ProfileController, args: &Args<'_>| {
            format!("profile {}", args.get("id").unwrap_or("?"))
        });
    registry
        .controller("app.controllers.UserController", UserController::default)
        .method("actionShow", ["id"], |c: &mut UserController, args: &Args<'_>| {
            format!("{} / {}", c.greeting, args.get("id").unwrap_or("-"))
        })
        .method("actionList", Vec::<&str>::new(), |c: &mut UserController, _: &Args<'_>| c.greeting.clone());
    registry
}

fn router(routes: RouteSource) -> Router {
    Router::builder().routes(routes).registry(registry()).build().unwrap()
}

fn get(router: &Router, target: &str) -> Result<Payload, DispatchError> {
    router.handle(Request::new(Method::Get, target))
}

// ── Compilation ───────────────────────────────────────────────────────────────

#[test]
fn groups_expand_to_prefixed_paths() {
    let r = router(RouteSource::new().group("/v1", RouteSource::new().route("/user/info", "info")));
    assert!(r.table().iter().any(|route| route.path() == "/v1/user/info"));
    assert_eq!(get(&r, "/v1/user/info").unwrap(), json!("info"));
}

#[test]
fn class_targets_expand_every_action() {
    let r = router(RouteSource::new().route("/x", ["app.controllers.ProfileController"]));
    let routes: HashMap<_, _> = r.table().iter().map(|route| (route.path(), route.methods())).collect();

    assert_eq!(routes["/x/index"], MethodSet::ALL);
    assert_eq!(routes["/x/profile"], MethodSet::single(Method::Get));

    assert_eq!(get(&r, "/x/profile?id=4").unwrap(), json!("profile 4"));
    assert!(r.handle(Request::new(Method::Post, "/x/profile")).unwrap_err().is_not_found());
}

#[test]
fn first_declaration_wins_over_later_duplicates() {
    let r = router(
        RouteSource::new()
            .route("/x", ["app.controllers.ProfileController"])
            .route("/x/index", "direct")
            .route("GET:/x/profile", "direct"),
    );
    assert_eq!(r.table().len(), 2);
    assert_eq!(get(&r, "/x/index").unwrap(), json!("index"));
    assert_eq!(get(&r, "/x/profile").unwrap(), json!("profile ?"));
}

#[test]
fn single_method_routes_beat_catch_alls_at_equal_depth() {
    for routes in [
        RouteSource::new().route("/item/:id", "any").route("GET:/item/:id", "get"),
        RouteSource::new().route("GET:/item/:id", "get").route("/item/:id", "any"),
    ] {
        let r = router(routes);
        assert_eq!(get(&r, "/item/1").unwrap(), json!("get"));
        assert_eq!(r.handle(Request::new(Method::Post, "/item/1")).unwrap(), json!("any"));
    }
}

#[test]
fn deeper_routes_are_tried_first() {
    let r = router(RouteSource::new().route("GET:/:a/:b", "shallow").route("/:a/:b/:c", "deep"));
    let depths: Vec<_> = r.table().iter().map(|route| route.depth()).collect();
    assert_eq!(depths, [4, 3]);
}

#[test]
fn equal_priority_routes_keep_declaration_order() {
    let r = router(RouteSource::new().route("GET:/:first", "first").route("GET:/:second", "second"));
    assert_eq!(get(&r, "/anything").unwrap(), json!("first"));
}

#[test]
fn regex_segments_match_and_capture() {
    let r = router(RouteSource::new().route("/user/:id<\\d+>/", ["app.controllers.ProfileController", "actionGetProfile"]));

    let hit = r.table().find(Method::Get, "/user/42/").unwrap();
    assert_eq!(hit.params, HashMap::from([("id".to_owned(), "42".to_owned())]));
    assert!(r.table().find(Method::Get, "/user/abc/").is_none());

    assert_eq!(get(&r, "/user/42/").unwrap(), json!("profile 42"));
}

#[test]
fn query_strings_and_extensions_are_ignored_for_matching() {
    let r = router(RouteSource::new().route("GET:/health", "ok"));
    assert_eq!(get(&r, "/health.json?verbose=1").unwrap(), json!("ok"));
}

#[test]
fn malformed_tables_fail_the_build() {
    let build = |routes: RouteSource| Router::builder().routes(routes).registry(registry()).build();

    assert!(matches!(build(RouteSource::new().route("/x", ["a", "b", "c"])), Err(ConfigError::InvalidArity { .. })));
    assert!(matches!(build(RouteSource::new().route("/x", ["app.Nope"])), Err(ConfigError::UnknownClass { .. })));
    assert!(matches!(build(RouteSource::new().route("GROUP:/x", "flat")), Err(ConfigError::InvalidGroup { .. })));
}

// ── Dispatch ──────────────────────────────────────────────────────────────────

#[test]
fn literal_routes_return_their_value() {
    let r = router(RouteSource::new().route("GET:/health", "ok"));
    assert_eq!(get(&r, "/health").unwrap(), json!("ok"));
    assert!(matches!(r.table().routes()[0].handler(), Handler::Literal(_)));
}

#[test]
fn class_method_routes_bind_query_arguments() {
    let r = router(RouteSource::new().route("/calc/add", ["app.services.CalcService", "add"]));
    assert_eq!(get(&r, "/calc/add?a=2&b=3").unwrap(), json!(5));
    assert!(matches!(get(&r, "/calc/add?a=2&b=x"), Err(DispatchError::InvalidArgument { .. })));
}

#[test]
fn callables_are_invoked_without_arguments() {
    let r = router(RouteSource::new().callable("/now", || "tick"));
    assert_eq!(get(&r, "/now").unwrap(), json!("tick"));
}

#[test]
fn unmatched_paths_fall_back_to_controllers() {
    let r = router(RouteSource::new());

    let resolution = r.resolve(&Request::new(Method::Get, "/user/show"));
    match resolution {
        Resolution::Convention(mca) => {
            assert_eq!(mca.controller_class, "app.controllers.UserController");
            assert_eq!(mca.action, "show");
        }
        other => panic!("unexpected {other:?}"),
    }

    assert_eq!(get(&r, "/user/show?id=3").unwrap(), json!("hi from show / 3"));
    assert!(get(&r, "/user/missing").unwrap_err().is_not_found());
    assert!(get(&r, "/ghost/show").unwrap_err().is_not_found());
}

#[test]
fn before_action_runs_only_for_filtered_actions() {
    let r = router(RouteSource::new());
    assert_eq!(get(&r, "/user/show?banned=1").unwrap(), json!({ "error": "banned" }));
    assert_eq!(get(&r, "/user/list?banned=1").unwrap(), json!(""));
}

#[test]
fn route_and_convention_binding_differ() {
    let routes = RouteSource::new().route("/profile/:id<\\d+>", ["app.controllers.ProfileController", "actionGetProfile"]);
    let r = router(routes);

    // Routed: the captured segment wins over the query.
    assert_eq!(get(&r, "/profile/7?id=9").unwrap(), json!("profile 7"));

    // Convention: only the query binds.
    assert_eq!(get(&r, "/profile/profile?id=9").unwrap(), json!("profile 9"));
    assert_eq!(get(&r, "/profile/profile").unwrap(), json!("profile ?"));
}

#[test]
fn only_match_rule_turns_fallback_off() {
    let r = Router::builder()
        .registry(registry())
        .config(RouterConfig { only_match_rule: true, ..RouterConfig::default() })
        .build()
        .unwrap();
    assert!(get(&r, "/user/show").unwrap_err().is_not_found());
}

#[test]
fn cli_requests_route_like_any_other_method() {
    let r = router(RouteSource::new().route("CLI:/report", "report").route("/calc/add", ["app.services.CalcService", "add"]));
    assert_eq!(r.handle(Request::cli(["/report"])).unwrap(), json!("report"));
    assert_eq!(r.handle(Request::cli(["/calc/add", "a=1", "b=1"])).unwrap(), json!(2));
    assert!(get(&r, "/report").unwrap_err().is_not_found());
}

// ── Configuration files ───────────────────────────────────────────────────────

#[test]
fn route_tables_load_from_toml() {
    let routes = RouteSource::from_toml_str(
        r#"
        "GET:/health"  = "ok"
        "/calc/add"    = ["app.services.CalcService", "add"]

        ["GROUP:/v1"]
        "/profile"     = ["app.controllers.ProfileController"]
        "#,
    )
    .unwrap();
    let config = RouterConfig::from_toml_str("only_match_rule = true").unwrap();
    let r = Router::builder().routes(routes).registry(registry()).config(config).build().unwrap();

    assert_eq!(get(&r, "/health").unwrap(), json!("ok"));
    assert_eq!(get(&r, "/calc/add?a=40&b=2").unwrap(), json!(42));
    assert_eq!(get(&r, "/v1/profile/profile?id=1").unwrap(), json!("profile 1"));
    assert_eq!(get(&r, "/v1/profile/index").unwrap(), json!("index"));
}
