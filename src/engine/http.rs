//! Chroma server client over the REST API (`/api/v1`).
//!
//! Embeddings are computed on the client with the configured [`Embedder`],
//! the same split Chroma's own HTTP clients use. Requests block the caller.

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::embedding::Embedder;
use super::error::{EngineError, EngineResult};
use super::types::{CollectionInfo, Include, Metadata, PeekResult, QueryResult};
use super::{Collection, CollectionHandle, VectorEngine, check_lengths, validate_collection_name};
use crate::config::DatabaseConfig;

/// Collection as the server describes it.
#[derive(Debug, Deserialize)]
struct RawCollection {
    id: String,
    name: String,
    #[serde(default)]
    metadata: Option<IndexMap<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct RawGetResponse {
    ids: Vec<String>,
    #[serde(default)]
    documents: Option<Vec<Option<String>>>,
    #[serde(default)]
    metadatas: Option<Vec<Option<IndexMap<String, Value>>>>,
    #[serde(default)]
    embeddings: Option<Vec<Vec<f32>>>,
}

#[derive(Debug, Deserialize)]
struct RawQueryResponse {
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<IndexMap<String, Value>>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<f32>>>,
    #[serde(default)]
    embeddings: Option<Vec<Vec<Vec<f32>>>>,
}

/// Flatten server metadata into string values.
fn to_metadata(raw: Option<IndexMap<String, Value>>) -> Metadata {
    raw.unwrap_or_default()
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key, value)
        })
        .collect()
}

impl From<RawQueryResponse> for QueryResult {
    fn from(raw: RawQueryResponse) -> Self {
        QueryResult {
            ids: raw.ids,
            documents: raw.documents.map(|outer| {
                outer
                    .into_iter()
                    .map(|inner| inner.into_iter().map(Option::unwrap_or_default).collect())
                    .collect()
            }),
            metadatas: raw.metadatas.map(|outer| {
                outer
                    .into_iter()
                    .map(|inner| inner.into_iter().map(to_metadata).collect())
                    .collect()
            }),
            distances: raw.distances,
            embeddings: raw.embeddings,
        }
    }
}

impl From<RawGetResponse> for PeekResult {
    fn from(raw: RawGetResponse) -> Self {
        PeekResult {
            ids: raw.ids,
            documents: raw
                .documents
                .unwrap_or_default()
                .into_iter()
                .map(Option::unwrap_or_default)
                .collect(),
            metadatas: raw
                .metadatas
                .unwrap_or_default()
                .into_iter()
                .map(to_metadata)
                .collect(),
            embeddings: raw.embeddings.unwrap_or_default(),
        }
    }
}

/// Connection details shared by the engine and its collection handles.
struct HttpContext {
    client: Client,
    base_url: String,
    tenant: Option<String>,
    database: Option<String>,
    embedder: Arc<dyn Embedder>,
}

impl HttpContext {
    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Attach tenant/database scoping when configured.
    fn scoped(&self, request: RequestBuilder) -> RequestBuilder {
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(ref tenant) = self.tenant {
            params.push(("tenant", tenant));
        }
        if let Some(ref database) = self.database {
            params.push(("database", database));
        }
        if params.is_empty() {
            request
        } else {
            request.query(&params)
        }
    }

    fn send(&self, request: RequestBuilder) -> EngineResult<Response> {
        let response = request.send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(EngineError::Http {
            status: status.as_u16(),
            body,
        })
    }

    fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> EngineResult<T> {
        Ok(self.send(request)?.json::<T>()?)
    }
}

/// Translate "does not exist" / "already exists" server replies into typed errors.
fn classify(error: EngineError, name: &str) -> EngineError {
    match error {
        EngineError::Http { status, ref body } => {
            let lower = body.to_lowercase();
            if status == 404 || lower.contains("does not exist") || lower.contains("not found") {
                EngineError::CollectionNotFound(name.to_string())
            } else if status == 409 || lower.contains("already exists") {
                EngineError::CollectionExists(name.to_string())
            } else {
                error
            }
        }
        other => other,
    }
}

/// Remote Chroma engine.
pub struct HttpEngine {
    context: Arc<HttpContext>,
}

impl std::fmt::Debug for HttpEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEngine")
            .field("base_url", &self.context.base_url)
            .field("tenant", &self.context.tenant)
            .field("database", &self.context.database)
            .finish()
    }
}

impl HttpEngine {
    /// Build a client for the server described in the database settings.
    ///
    /// No request is sent here; call [`VectorEngine::heartbeat`] to check the server.
    pub fn new(config: &DatabaseConfig, embedder: Arc<dyn Embedder>) -> EngineResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let scheme = if config.ssl { "https" } else { "http" };
        let base_url = format!("{scheme}://{}:{}", config.host, config.port);

        Ok(Self {
            context: Arc::new(HttpContext {
                client,
                base_url,
                tenant: config.tenant.clone(),
                database: config.database.clone(),
                embedder,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.context.base_url
    }

    fn handle(&self, raw: RawCollection) -> CollectionHandle {
        Arc::new(HttpCollection {
            context: self.context.clone(),
            id: raw.id,
            name: raw.name,
        })
    }
}

impl VectorEngine for HttpEngine {
    fn heartbeat(&self) -> EngineResult<()> {
        let ctx = &self.context;
        ctx.send(ctx.client.get(ctx.url("heartbeat")))?;
        Ok(())
    }

    fn list_collections(&self) -> EngineResult<Vec<CollectionInfo>> {
        let ctx = &self.context;
        let raw: Vec<RawCollection> =
            ctx.send_json(ctx.scoped(ctx.client.get(ctx.url("collections"))))?;

        Ok(raw
            .into_iter()
            .map(|c| CollectionInfo {
                name: c.name,
                metadata: to_metadata(c.metadata),
            })
            .collect())
    }

    fn create_collection(&self, name: &str) -> EngineResult<CollectionHandle> {
        validate_collection_name(name)?;

        let ctx = &self.context;
        let mut metadata = Metadata::new();
        metadata.insert("embedding_model".to_string(), ctx.embedder.name().to_string());

        let request = ctx.scoped(ctx.client.post(ctx.url("collections"))).json(&json!({
            "name": name,
            "metadata": metadata,
            "get_or_create": false,
        }));

        let raw: RawCollection = ctx.send_json(request).map_err(|e| classify(e, name))?;
        Ok(self.handle(raw))
    }

    fn get_collection(&self, name: &str) -> EngineResult<CollectionHandle> {
        validate_collection_name(name)?;

        let ctx = &self.context;
        let request = ctx.scoped(ctx.client.get(ctx.url(&format!("collections/{name}"))));
        let raw: RawCollection = ctx.send_json(request).map_err(|e| classify(e, name))?;
        Ok(self.handle(raw))
    }

    fn delete_collection(&self, name: &str) -> EngineResult<()> {
        validate_collection_name(name)
            .map_err(|_| EngineError::CollectionNotFound(name.to_string()))?;

        let ctx = &self.context;
        let request = ctx.scoped(ctx.client.delete(ctx.url(&format!("collections/{name}"))));
        ctx.send(request).map_err(|e| classify(e, name))?;
        Ok(())
    }
}

/// Handle to a collection on a Chroma server.
pub struct HttpCollection {
    context: Arc<HttpContext>,
    id: String,
    name: String,
}

impl HttpCollection {
    fn post(&self, action: &str) -> RequestBuilder {
        let ctx = &self.context;
        ctx.client
            .post(ctx.url(&format!("collections/{}/{action}", self.id)))
    }

    /// Subset of `ids` already present in the collection.
    fn existing_ids(&self, ids: &[String]) -> EngineResult<Vec<String>> {
        let request = self.post("get").json(&json!({
            "ids": ids,
            "include": [],
        }));
        let raw: RawGetResponse = self.context.send_json(request)?;
        Ok(raw.ids)
    }

    fn embed(&self, documents: &[String]) -> EngineResult<Vec<Vec<f32>>> {
        let texts: Vec<&str> = documents.iter().map(String::as_str).collect();
        self.context.embedder.embed(&texts)
    }

    fn require_existing(&self, ids: &[String]) -> EngineResult<()> {
        let existing = self.existing_ids(ids)?;
        if let Some(missing) = ids.iter().find(|id| !existing.contains(id)) {
            return Err(EngineError::IdNotFound {
                collection: self.name.clone(),
                id: missing.clone(),
            });
        }
        Ok(())
    }
}

impl Collection for HttpCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn add(
        &self,
        documents: &[String],
        metadatas: &[Metadata],
        ids: &[String],
    ) -> EngineResult<()> {
        check_lengths(ids, documents, metadatas)?;

        // The server silently ignores re-used ids; surface them instead.
        if let Some(id) = self.existing_ids(ids)?.into_iter().next() {
            return Err(EngineError::DuplicateId {
                collection: self.name.clone(),
                id,
            });
        }

        let embeddings = self.embed(documents)?;
        let request = self.post("add").json(&json!({
            "ids": ids,
            "embeddings": embeddings,
            "metadatas": metadatas,
            "documents": documents,
        }));
        self.context.send(request)?;
        Ok(())
    }

    fn query(
        &self,
        query_texts: &[String],
        n_results: usize,
        include: &[Include],
    ) -> EngineResult<QueryResult> {
        let query_embeddings = self.embed(query_texts)?;
        let include: Vec<&str> = include.iter().map(|i| i.as_str()).collect();

        let request = self.post("query").json(&json!({
            "query_embeddings": query_embeddings,
            "n_results": n_results,
            "include": include,
        }));
        let raw: RawQueryResponse = self.context.send_json(request)?;
        Ok(raw.into())
    }

    fn update(
        &self,
        ids: &[String],
        documents: &[String],
        metadatas: &[Metadata],
    ) -> EngineResult<()> {
        check_lengths(ids, documents, metadatas)?;
        self.require_existing(ids)?;

        let embeddings = self.embed(documents)?;
        let request = self.post("update").json(&json!({
            "ids": ids,
            "embeddings": embeddings,
            "metadatas": metadatas,
            "documents": documents,
        }));
        self.context.send(request)?;
        Ok(())
    }

    fn delete(&self, ids: &[String]) -> EngineResult<()> {
        self.require_existing(ids)?;

        let request = self.post("delete").json(&json!({ "ids": ids }));
        self.context.send(request)?;
        Ok(())
    }

    fn peek(&self, limit: usize) -> EngineResult<PeekResult> {
        let request = self.post("get").json(&json!({
            "limit": limit,
            "include": ["documents", "metadatas", "embeddings"],
        }));
        let raw: RawGetResponse = self.context.send_json(request)?;
        Ok(raw.into())
    }

    fn count(&self) -> EngineResult<usize> {
        let ctx = &self.context;
        let request = ctx
            .client
            .get(ctx.url(&format!("collections/{}/count", self.id)));
        ctx.send_json(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::engine::HashEmbedder;

    #[test]
    fn test_base_url_from_settings() {
        let config = DatabaseConfig {
            host: "chroma.internal".to_string(),
            port: 8001,
            ..Default::default()
        };
        let engine = HttpEngine::new(&config, Arc::new(HashEmbedder::new())).unwrap();
        assert_eq!(engine.base_url(), "http://chroma.internal:8001");
        assert_eq!(
            engine.context.url("/collections"),
            "http://chroma.internal:8001/api/v1/collections"
        );
    }

    #[test]
    fn test_query_response_conversion() {
        let raw: RawQueryResponse = serde_json::from_value(json!({
            "ids": [["a", "b"]],
            "documents": [["first", null]],
            "metadatas": [[{"pregunta": "first", "orden": 3}, null]],
            "distances": [[0.1, 0.4]],
            "embeddings": null
        }))
        .unwrap();

        let result: QueryResult = raw.into();
        assert_eq!(result.first_documents(), ["first", ""]);
        let metadatas = &result.metadatas.unwrap()[0];
        assert_eq!(metadatas[0]["orden"], "3");
        assert!(metadatas[1].is_empty());
        assert!(result.embeddings.is_none());
    }

    #[test]
    fn test_get_response_conversion() {
        let raw: RawGetResponse = serde_json::from_value(json!({
            "ids": ["a"],
            "documents": ["doc"],
            "metadatas": [{"respuesta": "yes"}],
            "embeddings": [[0.5, 0.5]]
        }))
        .unwrap();

        let peek: PeekResult = raw.into();
        assert_eq!(peek.len(), 1);
        assert_eq!(peek.metadatas[0]["respuesta"], "yes");
        assert_eq!(peek.embeddings[0].len(), 2);
    }

    #[test]
    fn test_classify_server_errors() {
        let not_found = EngineError::Http {
            status: 500,
            body: "Collection faq does not exist.".to_string(),
        };
        assert!(matches!(
            classify(not_found, "faq"),
            EngineError::CollectionNotFound(_)
        ));

        let exists = EngineError::Http {
            status: 409,
            body: String::new(),
        };
        assert!(matches!(
            classify(exists, "faq"),
            EngineError::CollectionExists(_)
        ));

        let other = EngineError::Http {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert!(matches!(classify(other, "faq"), EngineError::Http { status: 502, .. }));
    }
}
