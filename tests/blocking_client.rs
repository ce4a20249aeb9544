//! The blocking client flavor exercised end-to-end on plain threads.

mod helpers;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use personal_knowledge::models::{
    EntityStatus, Label, LocaleCode, OntologyClassReference, ThingObject,
};
use personal_knowledge::services::{BlockingGraphClient, ListingFilter, ServiceConfig};
use personal_knowledge::TransportConfig;

use anyhow::Result;
use helpers::{init_tracing, serve_threaded, token_response, Counter};

#[derive(Clone, Default)]
struct BlockingState {
    entities: Arc<Mutex<HashMap<String, Value>>>,
    created: Counter,
}

async fn login() -> impl IntoResponse {
    Json(token_response("t-1", "blocking-user", 3600))
}

async fn create_or_list(
    State(state): State<BlockingState>,
    Query(params): Query<HashMap<String, String>>,
    body: Option<Json<Value>>,
) -> impl IntoResponse {
    if let Some(Json(body)) = body {
        let n = state.created.bump();
        let uri = format!("wacom:entity:blk{}", n);
        state.entities.lock().unwrap().insert(uri.clone(), body);
        return (StatusCode::OK, Json(json!({ "uri": uri })));
    }
    let entity = |uri: &str| json!({"type": "wacom:core#Person", "uri": uri});
    let body = match params.get("nextPageId").map(String::as_str) {
        None => json!({
            "result": [entity("wacom:entity:1")],
            "total": 2,
            "nextPageId": "p2",
        }),
        Some(_) => json!({ "result": [entity("wacom:entity:2")], "total": 2 }),
    };
    (StatusCode::OK, Json(body))
}

async fn get_entity(
    State(state): State<BlockingState>,
    Path(uri): Path<String>,
) -> impl IntoResponse {
    let entities = state.entities.lock().unwrap();
    match entities.get(&uri) {
        Some(stored) => {
            let mut body = stored.clone();
            body["uri"] = json!(uri);
            (StatusCode::OK, Json(body))
        }
        None => (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))),
    }
}

fn router(state: BlockingState) -> Router {
    Router::new()
        .route("/graph/v1/user/login", post(login))
        .route("/graph/v1/entity", post(create_or_list).get(create_or_list))
        .route("/graph/v1/entity/:uri", get(get_entity))
        .with_state(state)
}

fn client(url: url::Url, user: &str) -> BlockingGraphClient {
    init_tracing();
    let config = ServiceConfig::new(url).with_transport(TransportConfig {
        max_retries: 1,
        backoff_factor: 0.01,
        ..Default::default()
    });
    let mut client = BlockingGraphClient::new(&config).expect("client");
    client.core_mut().login("tenant-key", user).expect("login");
    client
}

#[test]
fn blocking_create_and_fetch() -> Result<()> {
    let state = BlockingState::default();
    let url = serve_threaded(router(state));
    let client = client(url, "blocking-create");

    let mut person = ThingObject::new(OntologyClassReference::new("wacom", "core", "Person"));
    person.add_label(Label::main("Grace", LocaleCode::en_us()))?;
    let uri = client.create_entity(&person)?;

    let stored = client.entity(&uri)?;
    assert_eq!(stored.status, EntityStatus::Synced);
    assert_eq!(stored.labels, person.labels);
    Ok(())
}

#[test]
fn blocking_listing_iterator() {
    let state = BlockingState::default();
    let url = serve_threaded(router(state));
    let client = client(url, "blocking-listing");

    let filter = ListingFilter::for_type(OntologyClassReference::new("wacom", "core", "Person"));
    let uris: Vec<String> = client
        .iter_listing(filter)
        .map(|entity| entity.expect("page fetch").uri.unwrap())
        .collect();
    assert_eq!(uris, vec!["wacom:entity:1", "wacom:entity:2"]);
}
