//! Route compilation from declarative definitions.

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use futures_util::StreamExt;
use url::Url;

use edge_gateway::config::{parse_config, ConfigRouteDefinitionLocator};
use edge_gateway::http::Exchange;
use edge_gateway::routing::locator::InMemoryRouteDefinitionLocator;
use edge_gateway::routing::{default_registry, RouteDefinition, RouteDefinitionRouteLocator};

fn exchange(path: &str) -> Exchange {
    Exchange::new(Request::builder().uri(path).body(Body::empty()).unwrap())
}

fn compiler(definitions: Vec<RouteDefinition>, defaults: &[&str]) -> RouteDefinitionRouteLocator {
    RouteDefinitionRouteLocator::new(
        Arc::new(InMemoryRouteDefinitionLocator::new(definitions)),
        Arc::new(default_registry()),
        defaults.iter().map(|d| d.parse().unwrap()).collect(),
    )
}

#[tokio::test]
async fn test_single_path_route_without_filters() {
    let definition = RouteDefinition::new("r1", Url::parse("http://backend").unwrap())
        .predicate("Path=/api/**".parse().unwrap());
    let routes: Vec<_> = compiler(vec![definition], &[]).routes().collect().await;

    assert_eq!(routes.len(), 1);
    let route = &routes[0];
    assert_eq!(route.id(), "r1");
    assert_eq!(route.uri().as_str(), "http://backend/");
    assert!(route.filters().is_empty());
    assert!(route.matches(&exchange("/api/x")).await.unwrap());
    assert!(!route.matches(&exchange("/other")).await.unwrap());
}

#[tokio::test]
async fn test_explicit_and_assigned_orders_interleave() {
    let definition = RouteDefinition::new("r1", Url::parse("http://backend").unwrap())
        .predicate("Path=/**".parse().unwrap())
        .filter("StripPrefix=1".parse().unwrap())
        .filter("AddRequestHeader=X-Route, route, 1".parse().unwrap());
    let compiler = compiler(vec![definition], &["AddRequestHeader=X-Default, default, 5"]);

    let route = compiler.routes().next().await.unwrap();
    let chain: Vec<_> = route
        .filters()
        .iter()
        .map(|f| (f.name().to_string(), f.order()))
        .collect();
    assert_eq!(
        chain,
        vec![
            ("AddRequestHeader".to_string(), Some(1)),
            ("StripPrefix".to_string(), Some(2)),
            ("AddRequestHeader".to_string(), Some(5)),
        ]
    );
}

#[tokio::test]
async fn test_unknown_filter_fails_only_its_route() {
    let good = RouteDefinition::new("good", Url::parse("http://backend").unwrap())
        .predicate("Path=/good/**".parse().unwrap());
    let bad = RouteDefinition::new("bad", Url::parse("http://backend").unwrap())
        .predicate("Path=/bad/**".parse().unwrap())
        .filter("RewriteEverything=x".parse().unwrap());
    let compiler = compiler(vec![bad, good], &[]);

    let results: Vec<_> = compiler.try_routes().collect().await;
    let err = results[0].as_ref().unwrap_err();
    assert_eq!(err.route_id, "bad");
    assert_eq!(err.errors[0].missing_factory(), Some("RewriteEverything"));
    assert!(err.to_string().contains("RewriteEverything"));
    assert_eq!(results[1].as_ref().unwrap().id(), "good");

    let ids: Vec<_> = compiler.routes().map(|r| r.id().to_string()).collect().await;
    assert_eq!(ids, vec!["good"]);
}

#[tokio::test]
async fn test_compilation_is_repeatable() {
    let definition = RouteDefinition::new("r1", Url::parse("http://backend").unwrap())
        .predicate("Path=/a/**".parse().unwrap())
        .filter("PrefixPath=/v1".parse().unwrap());
    let compiler = compiler(vec![definition], &[]);

    for _ in 0..2 {
        let routes: Vec<_> = compiler.routes().collect().await;
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].filters().len(), 1);
    }
}

#[tokio::test]
async fn test_predicates_combine_with_and() {
    let definition = RouteDefinition::new("r1", Url::parse("http://backend").unwrap())
        .predicate("Path=/api/**".parse().unwrap())
        .predicate("Method=POST".parse().unwrap());
    let route = compiler(vec![definition], &[]).routes().next().await.unwrap();

    let get = exchange("/api/x");
    let post = Exchange::new(
        Request::builder()
            .method("POST")
            .uri("/api/x")
            .body(Body::empty())
            .unwrap(),
    );
    assert!(!route.matches(&get).await.unwrap());
    assert!(route.matches(&post).await.unwrap());
}

#[tokio::test]
async fn test_compile_from_config_file_text() {
    let config = parse_config(
        r#"
        default_filters = ["AddRequestHeader=X-Gateway, edge"]

        [beans]
        version = "/v2"

        [[routes]]
        id = "users"
        uri = "http://localhost:3000"
        predicates = [
            "Path=/users/**, /people/**, true",
            { name = "Header", args = { header = "X-Tenant", regexp = "acme|globex" } },
        ]
        filters = ["PrefixPath=#{@version}"]

        [[routes]]
        uri = "forward:///"
        order = -1
        predicates = ["Host=**.internal"]
        "#,
    )
    .unwrap();

    let compiler = RouteDefinitionRouteLocator::from_config(
        Arc::new(ConfigRouteDefinitionLocator::new(&config)),
        Arc::new(default_registry()),
        &config,
    );
    let table = compiler.route_table().await;
    assert_eq!(table.len(), 2);

    // Lower order first; the anonymous route got a generated id.
    assert_eq!(table.routes()[0].order(), -1);
    assert!(!table.routes()[0].id().is_empty());

    let users = &table.routes()[1];
    let names: Vec<_> = users.filters().iter().map(|f| f.name()).collect();
    assert_eq!(names, vec!["AddRequestHeader", "PrefixPath"]);

    let tenant = Exchange::new(
        Request::builder()
            .uri("/people/7/")
            .header("x-tenant", "globex")
            .body(Body::empty())
            .unwrap(),
    );
    assert!(users.matches(&tenant).await.unwrap());
    assert!(!users.matches(&exchange("/people/7")).await.unwrap());
}

#[tokio::test]
async fn test_route_without_predicates_fails_alone() {
    let config = parse_config(
        r#"
        [[routes]]
        id = "good"
        uri = "http://localhost:3000"
        predicates = ["Path=/good/**"]

        [[routes]]
        id = "bare"
        uri = "http://localhost:3000"
        "#,
    )
    .unwrap();

    let compiler = RouteDefinitionRouteLocator::from_config(
        Arc::new(ConfigRouteDefinitionLocator::new(&config)),
        Arc::new(default_registry()),
        &config,
    );
    let results: Vec<_> = compiler.try_routes().collect().await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[1].as_ref().unwrap_err().route_id, "bare");

    let table = compiler.route_table().await;
    assert_eq!(table.len(), 1);
    assert_eq!(table.routes()[0].id(), "good");
}

#[tokio::test]
async fn test_empty_shortcut_values_fall_back_to_defaults() {
    let definition = RouteDefinition::new("r1", Url::parse("http://backend").unwrap())
        .predicate("Path=/api/**,".parse().unwrap())
        .filter("StripPrefix=".parse().unwrap());
    let route = compiler(vec![definition], &[]).routes().next().await.unwrap();

    assert_eq!(route.filters().len(), 1);
    assert!(route.matches(&exchange("/api/x")).await.unwrap());
    assert!(!route.matches(&exchange("/")).await.unwrap());
}
