//! HTTP query boundary.
//!
//! Each configured route answers a POST carrying a question (form field or
//! JSON key `pregunta`, or JSON `text`) with the raw query result of its
//! collection. Any failure answers `{}`.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, header};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;

use crate::config::ServerConfig;
use crate::store::CollectionStore;
use crate::{debug_event, log_event, warn_event};

/// Shared state of every handler.
#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<CollectionStore>>,
    n_results: usize,
}

impl AppState {
    pub fn new(store: Arc<Mutex<CollectionStore>>, n_results: usize) -> Self {
        Self { store, n_results }
    }
}

#[derive(Debug, Default, Deserialize)]
struct QueryRequest {
    pregunta: Option<String>,
    text: Option<String>,
    n_results: Option<usize>,
}

impl QueryRequest {
    fn parse(headers: &HeaderMap, body: &[u8]) -> Option<Self> {
        let is_json = headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));

        if is_json {
            serde_json::from_slice(body).ok()
        } else {
            serde_urlencoded::from_bytes(body).ok()
        }
    }

    fn question(self) -> Option<String> {
        self.pregunta
            .or(self.text)
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
    }
}

/// Router with the configured routes, `/query/{collection}` and `/health`.
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/query/{collection}", post(query_by_path));

    for (route, collection) in &config.routes {
        let collection = collection.clone();
        router = router.route(
            route,
            post(
                move |State(state): State<AppState>, headers: HeaderMap, body: Bytes| {
                    let collection = collection.clone();
                    async move { answer(state, collection, headers, body).await }
                },
            ),
        );
    }

    let router = if config.cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };
    router.with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn query_by_path(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    answer(state, collection, headers, body).await
}

async fn answer(
    state: AppState,
    collection: String,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    let Some(request) = QueryRequest::parse(&headers, &body) else {
        debug_event!("http", "unparsable body", "route for '{collection}'");
        return Json(json!({}));
    };
    let n_results = request.n_results.unwrap_or(state.n_results);
    let Some(question) = request.question() else {
        debug_event!("http", "missing question", "route for '{collection}'");
        return Json(json!({}));
    };

    let store = state.store.clone();
    let target = collection.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        store.lock().query_collection(&target, &question, n_results)
    })
    .await;

    match outcome {
        Ok(Ok(Some(result))) => {
            Json(serde_json::to_value(result).unwrap_or_else(|_| json!({})))
        }
        Ok(Ok(None)) => Json(json!({})),
        Ok(Err(e)) => {
            warn_event!("http", "query failed", "'{collection}': {e}");
            Json(json!({}))
        }
        Err(e) => {
            warn_event!("http", "query task failed", "{e}");
            Json(json!({}))
        }
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        log_event!("http", "shutdown requested");
    }
}

/// Serve until Ctrl+C.
pub async fn serve_http(
    store: Arc<Mutex<CollectionStore>>,
    config: ServerConfig,
    bind: String,
) -> anyhow::Result<()> {
    let state = AppState::new(store, config.n_results);
    let app = router(state, &config);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    log_event!("http", "listening", "http://{bind}");
    eprintln!("Query server listening on http://{bind}");
    for (route, collection) in &config.routes {
        eprintln!("  POST {route} -> {collection}");
    }
    eprintln!("  POST /query/{{collection}}");
    eprintln!("Press Ctrl+C to stop the server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    eprintln!("Query server shut down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, content_type.parse().unwrap());
        headers
    }

    #[test]
    fn test_parse_form_body() {
        let request = QueryRequest::parse(
            &headers("application/x-www-form-urlencoded"),
            b"pregunta=%C2%BFQu%C3%A9+es%3F",
        )
        .unwrap();
        assert_eq!(request.question().as_deref(), Some("¿Qué es?"));
    }

    #[test]
    fn test_parse_json_body_with_text() {
        let request = QueryRequest::parse(
            &headers("application/json"),
            br#"{"text": "monotributo", "n_results": 2}"#,
        )
        .unwrap();
        assert_eq!(request.n_results, Some(2));
        assert_eq!(request.question().as_deref(), Some("monotributo"));
    }

    #[test]
    fn test_blank_question_is_missing() {
        let request = QueryRequest::parse(&HeaderMap::new(), b"pregunta=+++").unwrap();
        assert!(request.question().is_none());
    }
}
