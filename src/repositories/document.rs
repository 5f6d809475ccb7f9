//! Generic document repository.

use std::borrow::Cow;
use std::marker::PhantomData;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::config::Config;
use crate::context::Context;
use crate::di::FromContext;
use crate::error::{AppError, BatchItemFailure, BatchOperation};
use crate::models::{
    stamp_create, stamp_update, Document, PageRequest, PageResult, SearchResult,
};
use crate::query::{QueryFilter, QueryWrapper};
use crate::store::{
    BulkItemResult, BulkOperation, Hit, IndexSettings, SearchRequest, SearchResponse,
    SharedClient,
};

/// Identity keys removed from every fetched body before decoding.
const ID_KEYS: [&str; 3] = ["id", "ID", "_id"];

/// CRUD, bulk, list, page, count and search over documents of type `T`.
///
/// The index is `T::index_name()`. Lookups that find nothing return
/// `Ok(None)`; every other failure is returned as reported, without retry.
#[derive(FromContext)]
pub struct DocumentRepository<T: Document> {
    client: SharedClient,
    config: Arc<Config>,
    #[from_context(default)]
    _entity: PhantomData<fn() -> T>,
}

impl<T: Document> Clone for DocumentRepository<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            config: self.config.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Document> DocumentRepository<T> {
    /// Creates a repository with default configuration.
    pub fn new(client: SharedClient) -> Self {
        Self::with_config(client, Arc::new(Config::default()))
    }

    pub fn with_config(client: SharedClient, config: Arc<Config>) -> Self {
        Self {
            client,
            config,
            _entity: PhantomData,
        }
    }

    pub fn index_name(&self) -> Cow<'static, str> {
        T::index_name()
    }

    // ============================================
    // Writes
    // ============================================

    /// Indexes `entity` and returns its id.
    ///
    /// Stamps both timestamps. An entity with an id is indexed under it
    /// (create or replace); otherwise the store assigns one, which is written
    /// back into `entity`.
    pub async fn insert(&self, entity: &mut T) -> Result<String, AppError> {
        let index = T::index_name();
        stamp_create(entity);

        let id = entity.document_id();
        let body = serde_json::to_value(&*entity)?;
        let assigned = self.client.index(&index, id.as_deref(), body).await?;

        write_back_id(entity, &assigned);
        tracing::debug!(index = %index, id = %assigned, "Inserted document");
        Ok(assigned)
    }

    /// Indexes all `entities` in one bulk request and returns their ids in
    /// order.
    ///
    /// Fails with [`AppError::PartialBatch`] if any item fails; items that
    /// succeeded stay stored. Ids are matched to entities by position.
    pub async fn insert_batch(&self, entities: &mut [T]) -> Result<Vec<String>, AppError> {
        if entities.is_empty() {
            return Ok(Vec::new());
        }

        let index = T::index_name();
        let mut submitted = Vec::with_capacity(entities.len());
        let mut operations = Vec::with_capacity(entities.len());
        for entity in entities.iter_mut() {
            stamp_create(entity);
            let id = entity.document_id();
            operations.push(BulkOperation::Index {
                id: id.clone(),
                document: serde_json::to_value(&*entity)?,
            });
            submitted.push(id);
        }

        let results = self.client.bulk(&index, operations).await?;
        check_batch(BatchOperation::Insert, &results, &submitted)?;

        let mut ids = Vec::with_capacity(results.len());
        for (position, (entity, result)) in entities.iter_mut().zip(results).enumerate() {
            let id = result.id.ok_or_else(|| {
                AppError::Internal(format!("Bulk insert item {} returned no id", position))
            })?;
            write_back_id(entity, &id);
            ids.push(id);
        }

        tracing::debug!(index = %index, count = ids.len(), "Inserted document batch");
        Ok(ids)
    }

    /// Partially updates the stored document with the fields of `entity`.
    ///
    /// Re-stamps the update timestamp. Fails with [`AppError::Validation`]
    /// when `entity` has no id.
    pub async fn update(&self, entity: &mut T) -> Result<(), AppError> {
        let id = require_id(entity, "update")?;
        stamp_update(entity);

        let body = serde_json::to_value(&*entity)?;
        self.client.update(&T::index_name(), &id, body).await?;
        tracing::debug!(index = %T::index_name(), id = %id, "Updated document");
        Ok(())
    }

    /// Partially updates document `id` with `fields`, adding the update
    /// timestamp.
    pub async fn update_by_id(&self, id: &str, mut fields: Map<String, Value>) -> Result<(), AppError> {
        validate_id(id, "update")?;
        fields.insert(T::updated_at_field().to_string(), json!(Utc::now()));

        self.client
            .update(&T::index_name(), id, Value::Object(fields))
            .await?;
        tracing::debug!(index = %T::index_name(), id, "Updated document fields");
        Ok(())
    }

    /// Deletes the stored copy of `entity`. Fails with
    /// [`AppError::Validation`] when `entity` has no id.
    pub async fn delete(&self, entity: &T) -> Result<(), AppError> {
        let id = require_id(entity, "delete")?;
        self.delete_by_id(&id).await
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<(), AppError> {
        validate_id(id, "delete")?;
        self.client.delete(&T::index_name(), id).await?;
        tracing::debug!(index = %T::index_name(), id, "Deleted document");
        Ok(())
    }

    /// Deletes `ids` in one bulk request.
    ///
    /// Fails with [`AppError::PartialBatch`] naming every id that could not
    /// be deleted, including ids that do not exist.
    pub async fn delete_batch<S: AsRef<str>>(&self, ids: &[S]) -> Result<(), AppError> {
        if ids.is_empty() {
            return Ok(());
        }

        let index = T::index_name();
        let submitted: Vec<Option<String>> =
            ids.iter().map(|id| Some(id.as_ref().to_string())).collect();
        let operations = ids
            .iter()
            .map(|id| BulkOperation::Delete {
                id: id.as_ref().to_string(),
            })
            .collect();

        let results = self.client.bulk(&index, operations).await?;
        check_batch(BatchOperation::Delete, &results, &submitted)?;

        tracing::debug!(index = %index, count = ids.len(), "Deleted document batch");
        Ok(())
    }

    // ============================================
    // Reads
    // ============================================

    /// Fetches a document by id; `Ok(None)` when it does not exist.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<T>, AppError> {
        match self.client.get(&T::index_name(), id).await? {
            Some(raw) => decode(raw.source, &raw.id, None).map(Some),
            None => Ok(None),
        }
    }

    /// First match of `wrapper`, honoring its sort; `Ok(None)` when nothing
    /// matches.
    pub async fn get_one(&self, wrapper: &QueryWrapper<T>) -> Result<Option<T>, AppError> {
        let mut request = wrapper.build_search_request();
        request.size = Some(1);

        let response = self.client.search(&T::index_name(), &request).await?;
        response
            .hits
            .into_iter()
            .next()
            .map(decode_hit)
            .transpose()
    }

    /// All matches within the wrapper's window.
    pub async fn list(&self, wrapper: &QueryWrapper<T>) -> Result<Vec<T>, AppError> {
        let response = self
            .client
            .search(&T::index_name(), &wrapper.build_search_request())
            .await?;
        decode_hits(response.hits)
    }

    /// Page `page` (1-based) of `size` matches. The wrapper's own limit and
    /// offset are replaced.
    pub async fn page(
        &self,
        wrapper: &QueryWrapper<T>,
        page: usize,
        size: usize,
    ) -> Result<PageResult<T>, AppError> {
        if page < 1 || size < 1 {
            return Err(AppError::Validation(format!(
                "Page and size must be at least 1 (got page {}, size {})",
                page, size
            )));
        }

        let index = T::index_name();
        let offset = (page - 1).checked_mul(size).ok_or_else(|| {
            AppError::Validation(format!(
                "Page {} of size {} is beyond the addressable range",
                page, size
            ))
        })?;
        let mut request = wrapper.build_search_request();
        request.size = Some(size);
        request.from = (offset > 0).then_some(offset);

        let response = self.client.search(&index, &request).await?;
        let total = response.total;
        let records = decode_hits(response.hits)?;

        tracing::debug!(index = %index, page, size, total, "Fetched page");
        Ok(PageResult::new(records, total, page, size, index))
    }

    /// [`page`](Self::page) driven by a normalised [`PageRequest`].
    pub async fn page_request(
        &self,
        wrapper: &QueryWrapper<T>,
        request: PageRequest,
    ) -> Result<PageResult<T>, AppError> {
        self.page(wrapper, request.page(), request.size()).await
    }

    /// Number of matches. Sort, window and group-by are ignored.
    pub async fn count(&self, wrapper: &QueryWrapper<T>) -> Result<u64, AppError> {
        self.client
            .count(&T::index_name(), &wrapper.build_query())
            .await
    }

    pub async fn exists(&self, id: &str) -> Result<bool, AppError> {
        self.client.exists(&T::index_name(), id).await
    }

    /// Typed hits plus total and group-by buckets.
    pub async fn search(&self, wrapper: &QueryWrapper<T>) -> Result<SearchResult<T>, AppError> {
        let response = self
            .client
            .search(&T::index_name(), &wrapper.build_search_request())
            .await?;
        Ok(SearchResult {
            total: response.total,
            records: decode_hits(response.hits)?,
            aggregations: response.aggregations,
        })
    }

    /// Runs `request` against any index and returns the raw response.
    pub async fn search_raw(
        &self,
        index: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse, AppError> {
        self.client.search(index, request).await
    }

    // ============================================
    // Declarative filters
    // ============================================

    pub async fn get_one_by_filter<F: QueryFilter + ?Sized>(
        &self,
        filter: &F,
    ) -> Result<Option<T>, AppError> {
        self.get_one(&QueryWrapper::from_filter(filter)).await
    }

    pub async fn list_by_filter<F: QueryFilter + ?Sized>(
        &self,
        filter: &F,
    ) -> Result<Vec<T>, AppError> {
        self.list(&QueryWrapper::from_filter(filter)).await
    }

    pub async fn page_by_filter<F: QueryFilter + ?Sized>(
        &self,
        filter: &F,
        page: usize,
        size: usize,
    ) -> Result<PageResult<T>, AppError> {
        self.page(&QueryWrapper::from_filter(filter), page, size)
            .await
    }

    pub async fn count_by_filter<F: QueryFilter + ?Sized>(
        &self,
        filter: &F,
    ) -> Result<u64, AppError> {
        self.count(&QueryWrapper::from_filter(filter)).await
    }

    // ============================================
    // Index management
    // ============================================

    /// Creates the index with the configured shard and replica counts unless
    /// it exists. Returns whether it was created.
    pub async fn ensure_index(&self) -> Result<bool, AppError> {
        let settings = IndexSettings {
            number_of_shards: self.config.elasticsearch.number_of_shards,
            number_of_replicas: self.config.elasticsearch.number_of_replicas,
        };
        self.client.create_index(&T::index_name(), settings).await
    }
}

fn validate_id(id: &str, operation: &str) -> Result<(), AppError> {
    if id.is_empty() {
        return Err(AppError::Validation(format!(
            "Document id is required for {}",
            operation
        )));
    }
    Ok(())
}

fn require_id<T: Document>(entity: &T, operation: &str) -> Result<String, AppError> {
    entity
        .document_id()
        .ok_or_else(|| AppError::Validation(format!("Document id is required for {}", operation)))
}

fn write_back_id<T: Document>(entity: &mut T, id: &str) {
    if !entity.set_document_id(id) {
        tracing::warn!(
            index = %T::index_name(),
            id,
            "Store id does not fit the entity's id field; left unchanged"
        );
    }
}

/// Fails unless every item succeeded; results must match submissions one
/// to one.
fn check_batch(
    operation: BatchOperation,
    results: &[BulkItemResult],
    submitted: &[Option<String>],
) -> Result<(), AppError> {
    if results.len() != submitted.len() {
        return Err(AppError::Internal(format!(
            "Bulk {} returned {} results for {} items",
            operation,
            results.len(),
            submitted.len()
        )));
    }

    let failures: Vec<BatchItemFailure> = results
        .iter()
        .zip(submitted)
        .enumerate()
        .filter(|(_, (result, _))| !result.is_success())
        .map(|(position, (result, id))| BatchItemFailure {
            position,
            id: result.id.clone().or_else(|| id.clone()),
            status: result.status,
            reason: result
                .error
                .clone()
                .unwrap_or_else(|| format!("status {}", result.status)),
        })
        .collect();

    if failures.is_empty() {
        return Ok(());
    }

    tracing::warn!(
        %operation,
        failed = failures.len(),
        total = submitted.len(),
        "Bulk request partially failed"
    );
    Err(AppError::PartialBatch {
        operation,
        total: submitted.len(),
        failures,
    })
}

/// Decodes a stored body. Identity keys in the body are dropped; the id
/// comes from the response envelope.
fn decode<T: Document>(mut source: Value, id: &str, score: Option<f64>) -> Result<T, AppError> {
    if let Value::Object(map) = &mut source {
        for key in ID_KEYS.iter().chain(T::id_fields()) {
            map.remove(*key);
        }
    }

    let mut entity: T = serde_json::from_value(source)?;
    if !id.is_empty() {
        write_back_id(&mut entity, id);
    }
    if let Some(score) = score {
        entity.set_score(score);
    }
    Ok(entity)
}

fn decode_hit<T: Document>(hit: Hit) -> Result<T, AppError> {
    decode(hit.source, &hit.id, hit.score)
}

fn decode_hits<T: Document>(hits: Vec<Hit>) -> Result<Vec<T>, AppError> {
    hits.into_iter().map(decode_hit).collect()
}
