//! In-process stand-in for the control server, used by unit tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;

use crate::config::ServerConfig;

#[derive(Default)]
struct Shared {
    routes: HashMap<String, (u16, String)>,
    requests: Vec<String>,
}

/// Serves canned bodies by path and records every request URI.
#[derive(Clone)]
pub(crate) struct StubServer {
    url: String,
    shared: Arc<Mutex<Shared>>,
}

impl StubServer {
    pub(crate) async fn start() -> Self {
        let shared = Arc::new(Mutex::new(Shared::default()));
        let app = Router::new().fallback(handle).with_state(Arc::clone(&shared));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            url: format!("http://{addr}"),
            shared,
        }
    }

    pub(crate) fn url(&self) -> String {
        self.url.clone()
    }

    pub(crate) fn config(&self) -> Arc<ServerConfig> {
        Arc::new(ServerConfig::new(&self.url, Duration::from_secs(5)).unwrap())
    }

    /// Sets (or replaces) the reply for `path`; unknown paths answer 404.
    pub(crate) fn respond(&self, path: &str, status: u16, body: impl Into<String>) {
        self.shared
            .lock()
            .routes
            .insert(path.to_string(), (status, body.into()));
    }

    /// Request URIs (path and query) in arrival order.
    pub(crate) fn requests(&self) -> Vec<String> {
        self.shared.lock().requests.clone()
    }
}

async fn handle(State(shared): State<Arc<Mutex<Shared>>>, uri: Uri) -> Response {
    let mut shared = shared.lock();
    shared.requests.push(uri.to_string());
    match shared.routes.get(uri.path()) {
        Some((status, body)) => (
            StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            [("content-type", "application/json")],
            body.clone(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}
