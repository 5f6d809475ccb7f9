//! Core traits for search engine access.
//!
//! - [`SearchClient`] - Document and search operations a backend must provide
//! - [`Connect`] - Builds a client from transport configuration

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AppError;
use crate::query::Query;
use crate::store::request::{
    BulkItemResult, BulkOperation, ClusterInfo, IndexSettings, RawDocument, SearchRequest,
    SearchResponse,
};

/// Shared, read-only handle to an initialised client.
pub type SharedClient = Arc<dyn SearchClient>;

/// Executes document and search operations against a search engine.
///
/// Every method is a single call to the underlying transport. Failures are
/// returned as-is; nothing here retries. Dropping the returned future cancels
/// the in-flight request.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// One-shot connectivity probe.
    async fn info(&self) -> Result<ClusterInfo, AppError>;

    /// Indexes `document`, under `id` when given (create or replace),
    /// otherwise under a store-assigned id. Returns the document id.
    async fn index(
        &self,
        index: &str,
        id: Option<&str>,
        document: Value,
    ) -> Result<String, AppError>;

    /// Fetches a document by id. `Ok(None)` when the store reports it missing.
    async fn get(&self, index: &str, id: &str) -> Result<Option<RawDocument>, AppError>;

    /// Partial update: only the keys present in `partial` are overwritten.
    async fn update(&self, index: &str, id: &str, partial: Value) -> Result<(), AppError>;

    async fn delete(&self, index: &str, id: &str) -> Result<(), AppError>;

    /// Submits several operations in one request. Results are returned in
    /// submission order, one per operation.
    async fn bulk(
        &self,
        index: &str,
        operations: Vec<BulkOperation>,
    ) -> Result<Vec<BulkItemResult>, AppError>;

    async fn search(&self, index: &str, request: &SearchRequest)
        -> Result<SearchResponse, AppError>;

    /// Counts documents matching `query`.
    async fn count(&self, index: &str, query: &Query) -> Result<u64, AppError>;

    /// Existence probe by id.
    async fn exists(&self, index: &str, id: &str) -> Result<bool, AppError>;

    /// Creates `index` unless it exists. Returns whether it was created.
    async fn create_index(&self, index: &str, settings: IndexSettings)
        -> Result<bool, AppError>;
}

/// Constructs a [`SearchClient`] from transport configuration.
///
/// Used by [`Connector`](crate::store::Connector), which adds the one-time
/// liveness probe and caching on top.
#[async_trait]
pub trait Connect: Send + Sync + 'static {
    async fn connect(&self) -> Result<SharedClient, AppError>;
}
