use std::net::SocketAddr;
use std::sync::Arc;

use fsgate::api::handle_admin;
use fsgate::config::{AppState, Config};
use fsgate::gateway::Gateway;
use fsgate::handler::handle_request;
use fsgate::registry::DuplicatePolicy;
use fsgate::store::MemoryStore;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Bytes;
use hyper::{Method, Request, StatusCode};
use serde_json::Value;
use tempfile::tempdir;

fn state_with(config_toml: &str) -> Arc<AppState> {
    let mut config = Config::from_toml_str(config_toml).unwrap();
    config.logging.access_log = false;
    let gateway = Gateway::new(config.registry.on_duplicate);
    Arc::new(AppState::new(config, Arc::new(gateway)))
}

async fn admin(
    state: &Arc<AppState>,
    method: Method,
    uri: &str,
    body: String,
) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Full::new(Bytes::from(body)))
        .unwrap();
    let response = handle_admin(req, Arc::clone(state)).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn mount_list_and_unmount() {
    let state = state_with("");
    let definition = serde_json::json!({
        "name": "scratch",
        "prefix": "/scratch",
        "store": { "type": "memory" }
    });

    let (status, body) = admin(&state, Method::POST, "/v1/mounts", definition.to_string()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "ACK");

    let (status, body) = admin(&state, Method::GET, "/v1/mounts", String::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["frozen"], false);
    assert_eq!(body["on_duplicate"], "reject");
    let mounts = body["mounts"].as_array().unwrap();
    assert_eq!(mounts.len(), 1);
    assert_eq!(mounts[0]["prefix"], "/scratch");
    assert_eq!(mounts[0]["kind"], "memory");
    assert_eq!(
        mounts[0]["methods"],
        serde_json::json!(["GET", "HEAD", "PUT"])
    );

    // The new mount serves requests right away
    let put = Request::put("/scratch/hello.txt")
        .body(Full::new(Bytes::from("hi")))
        .unwrap();
    let peer = SocketAddr::from(([127, 0, 0, 1], 1));
    let response = handle_request(put, Arc::clone(&state), peer).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let (status, _) = admin(
        &state,
        Method::DELETE,
        "/v1/mounts?prefix=%2Fscratch",
        String::new(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let get = Request::get("/scratch/hello.txt")
        .body(Empty::<Bytes>::new())
        .unwrap();
    let response = handle_request(get, Arc::clone(&state), peer).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let (status, body) = admin(
        &state,
        Method::DELETE,
        "/v1/mounts?prefix=/scratch",
        String::new(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "NACK");
}

#[tokio::test]
async fn duplicate_prefix_conflicts() {
    let state = state_with("");
    state
        .gateway
        .mount("/files", "first", Arc::new(MemoryStore::new()))
        .unwrap();

    let definition = serde_json::json!({
        "name": "second",
        "prefix": "/files/",
        "store": { "type": "memory" }
    });
    let (status, body) = admin(&state, Method::POST, "/v1/mounts", definition.to_string()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_detail"]["code"], 409);
}

#[tokio::test]
async fn replace_policy_rebinds() {
    let state = state_with("[registry]\non_duplicate = \"replace\"");
    state
        .gateway
        .mount("/files", "first", Arc::new(MemoryStore::new()))
        .unwrap();

    let definition = serde_json::json!({
        "name": "second",
        "prefix": "/files",
        "store": { "type": "memory" }
    });
    let (status, _) = admin(&state, Method::POST, "/v1/mounts", definition.to_string()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = admin(&state, Method::GET, "/v1/mounts", String::new()).await;
    assert_eq!(body["mounts"][0]["name"], "second");
}

#[tokio::test]
async fn invalid_definitions_rejected() {
    let dir = tempdir().unwrap();
    let state = state_with("");

    let (status, _) = admin(&state, Method::POST, "/v1/mounts", "not json".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing_root = serde_json::json!({
        "name": "gone",
        "prefix": "/gone",
        "store": { "type": "local", "root": dir.path().join("missing") }
    });
    let (status, _) = admin(&state, Method::POST, "/v1/mounts", missing_root.to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let bad_method = serde_json::json!({
        "name": "m",
        "prefix": "/m",
        "methods": ["DELETE"],
        "store": { "type": "memory" }
    });
    let (status, _) = admin(&state, Method::POST, "/v1/mounts", bad_method.to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = admin(&state, Method::DELETE, "/v1/mounts", String::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(state.gateway.registry().is_empty());
}

#[tokio::test]
async fn static_registry_refuses_changes() {
    let mut config = Config::from_toml_str(
        r#"
        [registry]
        mode = "static"

        [[mounts]]
        name = "m"
        prefix = "/m"
        store = { type = "memory" }
        "#,
    )
    .unwrap();
    config.logging.access_log = false;
    let gateway = Gateway::from_config(&config).await;
    let state = Arc::new(AppState::new(config, Arc::new(gateway)));

    let definition = serde_json::json!({
        "name": "late",
        "prefix": "/late",
        "store": { "type": "memory" }
    });
    let (status, _) = admin(&state, Method::POST, "/v1/mounts", definition.to_string()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = admin(&state, Method::DELETE, "/v1/mounts?prefix=/m", String::new()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = admin(&state, Method::GET, "/v1/mounts", String::new()).await;
    assert_eq!(body["frozen"], true);
}

#[tokio::test]
async fn unknown_admin_route() {
    let state = state_with("");
    let (status, body) = admin(&state, Method::GET, "/v1/other", String::new()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["available_endpoints"].is_array());
}
