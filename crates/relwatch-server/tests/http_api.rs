//! Router-level tests against mocked upstream registries.

use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{Request, StatusCode};
use axum::Router;
use relwatch_core::{MemoryStore, ServiceConfig, UpdateService, UpstreamEndpoints};
use relwatch_server::{build_router, AppState, FixedWindowLimiter};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app_for(upstream: &str) -> Router {
    let config = ServiceConfig {
        endpoints: UpstreamEndpoints::all(upstream),
        ..ServiceConfig::default()
    };
    let service = UpdateService::new(config, Arc::new(MemoryStore::new())).unwrap();
    let state = Arc::new(AppState::new(service, FixedWindowLimiter::default()));
    build_router(state).layer(MockConnectInfo(SocketAddr::from(([10, 0, 0, 7], 40000))))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn mount(server: &MockServer, route: &str, status: u16, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_health() {
    let app = app_for("http://127.0.0.1:9");
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_package_endpoint_reports_npm_latest() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/react",
        200,
        json!({
            "name": "react",
            "description": "React is a JavaScript library for building user interfaces.",
            "dist-tags": { "latest": "18.3.1", "next": "19.0.0-rc" },
            "time": { "18.3.1": "2024-04-26T16:42:35.474Z" }
        }),
    )
    .await;

    let app = app_for(&server.uri());
    let (status, body) = get(&app, "/api/updates/package/react").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["package"], "react");
    assert_eq!(body["data"]["npm"]["version"], "18.3.1");
    assert_eq!(body["data"]["npm"]["updated_at"], "2024-04-26T16:42:35.474Z");
    assert!(body["data"]["packagist"].is_object());
    assert_eq!(body["data"]["packagist"]["status"], "error");
    assert!(body["data"]["pypi"].is_object());
}

#[tokio::test]
async fn test_scoped_npm_package() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/@types%2Fnode",
        200,
        json!({ "name": "@types/node", "dist-tags": { "latest": "20.14.2" } }),
    )
    .await;

    let app = app_for(&server.uri());
    let (status, body) = get(&app, "/api/updates/package/@types%2Fnode").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["package"], "@types/node");
    assert_eq!(body["data"]["npm"]["name"], "@types/node");
}

#[tokio::test]
async fn test_github_release() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/rust-lang/rust/releases/latest"))
        .and(header("accept", "application/vnd.github.v3+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tag_name": "1.79.0",
            "name": "Rust 1.79.0",
            "published_at": "2024-06-13T14:09:36Z",
            "body": "release notes",
            "html_url": "https://github.com/rust-lang/rust/releases/tag/1.79.0",
            "zipball_url": "https://api.github.com/repos/rust-lang/rust/zipball/1.79.0"
        })))
        .mount(&server)
        .await;

    let app = app_for(&server.uri());
    let (status, body) = get(&app, "/api/updates/github/rust-lang/rust").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["tag_name"], "1.79.0");
    assert_eq!(
        body["data"]["download_url"],
        "https://api.github.com/repos/rust-lang/rust/zipball/1.79.0"
    );
}

#[tokio::test]
async fn test_github_without_releases_is_404() {
    let server = MockServer::start().await;
    mount(&server, "/repos/acme/empty/releases/latest", 404, json!({"message": "Not Found"})).await;

    let app = app_for(&server.uri());
    let (status, body) = get(&app, "/api/updates/github/acme/empty").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Repository not found or has no releases");
    assert_eq!(body["status_code"], 404);
}

#[tokio::test]
async fn test_github_unreachable_is_500() {
    // Nothing listens on the discard port.
    let app = app_for("http://127.0.0.1:9");
    let (status, body) = get(&app, "/api/updates/github/acme/tool").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Failed to fetch GitHub information"));
    assert!(body.get("status_code").is_none());
}

#[tokio::test]
async fn test_languages() {
    let server = MockServer::start().await;
    for (slug, latest) in [("php", "8.3.8"), ("nodejs", "22.3.0"), ("java", "22.0.1")] {
        mount(
            &server,
            &format!("/api/{}.json", slug),
            200,
            json!([{ "cycle": "x", "latest": latest, "eol": false, "extendedSupport": true }]),
        )
        .await;
    }

    let app = app_for(&server.uri());
    let (status, body) = get(&app, "/api/updates/languages").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["php"]["latest_version"], "8.3.8");
    assert_eq!(body["data"]["javascript"]["latest_version"], "22.3.0");
    assert_eq!(body["data"]["java"]["eol"], "false");
    assert_eq!(body["data"]["java"]["extended_support"], true);
    assert_eq!(body["data"]["java"]["release_date"], "N/A");
    assert!(body["cached_at"].is_string());
}

#[tokio::test]
async fn test_libraries() {
    let app = app_for("http://127.0.0.1:9");

    let (status, body) = get(
        &app,
        "/api/updates/libraries?libraries%5B%5D=lodash&libraries%5B%5D=axios",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["lodash"]["status"], "not_implemented");
    assert!(body["data"]["axios"].is_object());

    let (status, body) = get(&app, "/api/updates/libraries").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "success": false, "message": "No libraries specified" }));
}

#[tokio::test]
async fn test_rate_limit_after_sixty_requests() {
    let app = app_for("http://127.0.0.1:9");
    let uri = "/api/updates/libraries?libraries=lodash";

    for _ in 0..60 {
        let (status, _) = get(&app, uri).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = get(&app, uri).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Rate limit exceeded. Try again in 1 minute.");

    // Health checks are not limited.
    let (status, _) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
}
