//! Shared scaffolding for integration tests: an in-process mock
//! backend and token fabrication.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::Router;
use base64::Engine;
use url::Url;

/// Install a test subscriber once per binary; `RUST_LOG` filters it.
pub fn init_tracing() {
    use std::sync::Once;
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Build an unsigned JWT carrying the claims the client reads.
pub fn make_token(tenant: &str, user: &str, expires_in_secs: i64) -> String {
    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let header = engine.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let exp = chrono::Utc::now().timestamp() + expires_in_secs;
    let claims = serde_json::json!({
        "exp": exp,
        "tenant-id": tenant,
        "external-user-id": user,
    });
    let payload = engine.encode(claims.to_string().as_bytes());
    format!("{}.{}.sig", header, payload)
}

/// Login/refresh response body for the mock auth endpoints.
pub fn token_response(tenant: &str, user: &str, expires_in_secs: i64) -> serde_json::Value {
    serde_json::json!({
        "accessToken": make_token(tenant, user, expires_in_secs),
        "refreshToken": format!("refresh-{}", user),
        "expirationDate": "2026-12-31T00:00:00Z",
    })
}

/// Serve a router on an ephemeral port from the current runtime.
pub async fn serve(router: Router) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("mock server");
    });
    base_url(addr)
}

/// Serve a router from a dedicated thread with its own runtime, for
/// tests driving the blocking client flavor.
pub fn serve_threaded(router: Router) -> Url {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().expect("test runtime");
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("bind mock server");
            tx.send(listener.local_addr().expect("local addr"))
                .expect("report addr");
            axum::serve(listener, router).await.expect("mock server");
        });
    });
    let addr: SocketAddr = rx.recv().expect("mock server addr");
    base_url(addr)
}

fn base_url(addr: SocketAddr) -> Url {
    Url::parse(&format!("http://{}/graph/v1", addr)).expect("base url")
}

/// Shared hit counter for asserting how often an endpoint was called.
#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn bump(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
