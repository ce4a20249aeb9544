//! Integration tests for the knowledge-graph client against an
//! in-process mock backend.

mod helpers;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use personal_knowledge::models::{
    EntityStatus, Label, LocaleCode, OntologyClassReference, OntologyPropertyReference,
    ThingObject,
};
use personal_knowledge::services::{GraphClient, ListingFilter, ServiceConfig};
use personal_knowledge::{ServiceError, TransportConfig};

use helpers::{init_tracing, serve, token_response, Counter};

#[derive(Clone, Default)]
struct GraphState {
    entities: Arc<Mutex<HashMap<String, Value>>>,
    created: Counter,
    searches: Counter,
    listing_calls: Counter,
    flaky_calls: Counter,
}

async fn login(headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
    if headers.get("x-tenant-api-key").is_none() {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "no key"})));
    }
    let user = body["externalUserId"].as_str().unwrap_or("unknown");
    (StatusCode::OK, Json(token_response("t-1", user, 3600)))
}

async fn create_entity(
    State(state): State<GraphState>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let n = state.created.bump();
    let uri = format!("wacom:entity:{:04x}", n);
    state
        .entities
        .lock()
        .unwrap()
        .insert(uri.clone(), body);
    Json(json!({ "uri": uri }))
}

async fn get_or_list_entities(
    State(state): State<GraphState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    // Listing branch: a `type` filter is present.
    if params.contains_key("type") {
        state.listing_calls.bump();
        let page = params.get("nextPageId").map(String::as_str);
        let entity = |uri: &str| {
            json!({
                "type": "wacom:core#Person",
                "uri": uri,
                "labels": [{"value": uri.to_string(), "locale": "en_US", "isMain": true}],
            })
        };
        let body = match page {
            None => json!({
                "result": [entity("wacom:entity:1"), entity("wacom:entity:2")],
                "total": 3,
                "nextPageId": "p2",
            }),
            Some("p2") => json!({
                "result": [entity("wacom:entity:3")],
                "total": 3,
            }),
            Some(_) => json!({ "result": [], "total": 3 }),
        };
        return (StatusCode::OK, Json(body));
    }
    (StatusCode::BAD_REQUEST, Json(json!({"error": "unsupported"})))
}

async fn get_entity(
    State(state): State<GraphState>,
    Path(uri): Path<String>,
) -> impl IntoResponse {
    if uri == "wacom:entity:locked" {
        return (StatusCode::FORBIDDEN, Json(json!({"error": "no rights"})));
    }
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

async fn search_relation(State(state): State<GraphState>) -> impl IntoResponse {
    state.searches.bump();
    Json(json!({ "result": [], "nextPageToken": null }))
}

async fn flaky(State(state): State<GraphState>) -> impl IntoResponse {
    let n = state.flaky_calls.bump();
    if n <= 2 {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "warming up"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "type": "wacom:core#Person",
            "uri": "wacom:entity:flaky",
        })),
    )
}

fn router(state: GraphState) -> Router {
    Router::new()
        .route("/graph/v1/user/login", post(login))
        .route(
            "/graph/v1/entity",
            post(create_entity).get(get_or_list_entities),
        )
        .route("/graph/v1/entity/:uri", get(get_entity))
        .route("/graph/v1/search/relation", get(search_relation))
        .route("/graph/v1/entity/flaky", get(flaky))
        .with_state(state)
}

async fn client_for(url: url::Url, user: &str) -> GraphClient {
    init_tracing();
    let config = ServiceConfig::new(url).with_transport(TransportConfig {
        max_retries: 3,
        backoff_factor: 0.01,
        ..Default::default()
    });
    let mut client = GraphClient::new(&config).expect("client");
    client
        .core_mut()
        .login("tenant-key", user)
        .await
        .expect("login");
    client
}

#[tokio::test]
async fn create_then_fetch_roundtrip() {
    let state = GraphState::default();
    let url = serve(router(state.clone())).await;
    let client = client_for(url, "create-fetch").await;

    let mut person = ThingObject::new(OntologyClassReference::new("wacom", "core", "Person"));
    person
        .add_label(Label::main("Ada", LocaleCode::en_us()))
        .unwrap();
    let uri = client.create_entity(&person).await.expect("create");
    assert!(uri.starts_with("wacom:entity:"));

    let stored = client.entity(&uri).await.expect("fetch");
    assert_eq!(stored.uri.as_deref(), Some(uri.as_str()));
    assert_eq!(stored.status, EntityStatus::Synced);
    assert_eq!(stored.labels, person.labels);
    assert_eq!(stored.concept_type, person.concept_type);
}

#[tokio::test]
async fn listing_iterator_yields_all_pages_in_order() {
    let state = GraphState::default();
    let url = serve(router(state.clone())).await;
    let client = client_for(url, "listing").await;

    let filter = ListingFilter::for_type(OntologyClassReference::new("wacom", "core", "Person"));
    let mut iterator = client.iter_listing(filter);
    let mut uris = Vec::new();
    while let Some(entity) = iterator.next().await.expect("page fetch") {
        uris.push(entity.uri.unwrap());
    }
    assert_eq!(
        uris,
        vec!["wacom:entity:1", "wacom:entity:2", "wacom:entity:3"]
    );
    assert_eq!(iterator.total(), Some(3));
    assert_eq!(iterator.yielded(), 3);
    // Two pages were enough; the terminal page had no nextPageId.
    assert_eq!(state.listing_calls.get(), 2);
}

#[tokio::test]
async fn relation_search_validates_before_dispatch() {
    let state = GraphState::default();
    let url = serve(router(state.clone())).await;
    let client = client_for(url, "relation-search").await;

    let relation = OntologyPropertyReference::new("wacom", "core", "rel");
    let err = client
        .search_relation(
            Some("wacom:entity:a"),
            &relation,
            Some("wacom:entity:b"),
            &LocaleCode::en_us(),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation { .. }));
    assert!(err.to_string().contains("either subject_uri or object_uri"));
    // The contract violation never reached the wire.
    assert_eq!(state.searches.get(), 0);

    client
        .search_relation(
            Some("wacom:entity:a"),
            &relation,
            None,
            &LocaleCode::en_us(),
            None,
        )
        .await
        .expect("one-sided search");
    assert_eq!(state.searches.get(), 1);
}

#[tokio::test]
async fn forbidden_maps_to_typed_error() {
    let state = GraphState::default();
    let url = serve(router(state.clone())).await;
    let client = client_for(url, "forbidden").await;

    let err = client.entity("wacom:entity:locked").await.unwrap_err();
    // 403 must surface as Forbidden, never retried.
    assert!(matches!(err, ServiceError::Forbidden { .. }));
    assert_eq!(err.status_code(), Some(403));
}

#[tokio::test]
async fn missing_entity_maps_to_not_found() {
    let state = GraphState::default();
    let url = serve(router(state.clone())).await;
    let client = client_for(url, "not-found").await;

    let err = client.entity("wacom:entity:nope").await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
}

#[tokio::test]
async fn transient_faults_are_retried_until_success() {
    let state = GraphState::default();
    let url = serve(router(state.clone())).await;
    let client = client_for(url, "retry").await;

    let entity = client.entity("flaky").await.expect("retried fetch");
    assert_eq!(entity.uri.as_deref(), Some("wacom:entity:flaky"));
    // Two 503s, then success.
    assert_eq!(state.flaky_calls.get(), 3);
}
