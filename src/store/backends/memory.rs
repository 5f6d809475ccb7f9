//! In-process backend that evaluates the predicate tree directly.
//!
//! Behaves like a single-node Elasticsearch cluster for the operations in
//! [`SearchClient`]: term and range comparisons on JSON values, wildcard
//! matching on strings, default page size of 10, terms aggregations capped at
//! 10 buckets, `index_not_found_exception` for searches on missing indices.
//! Intended for tests and local development.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use docstore::store::backends::memory::MemoryClient;
//!
//! let client: SharedClient = Arc::new(MemoryClient::new());
//! let repo = DocumentRepository::<User>::new(client);
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::query::{BoolQuery, Query, RangeBounds, SortField, SortOrder};
use crate::store::request::{
    Bucket, BulkItemResult, BulkOperation, ClusterInfo, Hit, IndexSettings, RawDocument,
    SearchRequest, SearchResponse,
};
use crate::store::traits::SearchClient;

/// Page size applied when a search request carries none.
const DEFAULT_SIZE: usize = 10;
/// Buckets returned per terms aggregation.
const DEFAULT_BUCKETS: usize = 10;

#[derive(Debug, Clone)]
struct StoredDocument {
    id: String,
    source: Value,
}

/// In-memory [`SearchClient`].
#[derive(Debug, Default)]
pub struct MemoryClient {
    indices: RwLock<HashMap<String, Vec<StoredDocument>>>,
    unreachable: bool,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose liveness probe always fails.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    fn index_missing(operation: &'static str, index: &str) -> AppError {
        AppError::Rejected {
            operation,
            status: 404,
            reason: format!("index_not_found_exception: no such index [{}]", index),
        }
    }

    /// Inserts or replaces a document; returns the HTTP-style status.
    fn put(docs: &mut Vec<StoredDocument>, id: String, source: Value) -> u16 {
        match docs.iter_mut().find(|d| d.id == id) {
            Some(existing) => {
                existing.source = source;
                200
            }
            None => {
                docs.push(StoredDocument { id, source });
                201
            }
        }
    }

    fn remove(docs: &mut Vec<StoredDocument>, id: &str) -> bool {
        let before = docs.len();
        docs.retain(|d| d.id != id);
        docs.len() != before
    }
}

#[async_trait]
impl SearchClient for MemoryClient {
    async fn info(&self) -> Result<ClusterInfo, AppError> {
        if self.unreachable {
            return Err(AppError::Rejected {
                operation: "info",
                status: 503,
                reason: "cluster unreachable".to_string(),
            });
        }
        Ok(ClusterInfo {
            cluster_name: "memory".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    async fn index(
        &self,
        index: &str,
        id: Option<&str>,
        document: Value,
    ) -> Result<String, AppError> {
        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| ulid::Ulid::new().to_string());
        let mut indices = self.indices.write().await;
        Self::put(
            indices.entry(index.to_string()).or_default(),
            id.clone(),
            document,
        );
        Ok(id)
    }

    async fn get(&self, index: &str, id: &str) -> Result<Option<RawDocument>, AppError> {
        let indices = self.indices.read().await;
        Ok(indices
            .get(index)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .map(|d| RawDocument {
                id: d.id.clone(),
                source: d.source.clone(),
            }))
    }

    async fn update(&self, index: &str, id: &str, partial: Value) -> Result<(), AppError> {
        let mut indices = self.indices.write().await;
        let doc = indices
            .get_mut(index)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| AppError::Rejected {
                operation: "update",
                status: 404,
                reason: format!("document_missing_exception: [{}]", id),
            })?;
        merge_json(&mut doc.source, partial);
        Ok(())
    }

    async fn delete(&self, index: &str, id: &str) -> Result<(), AppError> {
        let mut indices = self.indices.write().await;
        let removed = indices
            .get_mut(index)
            .map(|docs| Self::remove(docs, id))
            .unwrap_or(false);
        if removed {
            Ok(())
        } else {
            Err(AppError::Rejected {
                operation: "delete",
                status: 404,
                reason: "not_found".to_string(),
            })
        }
    }

    async fn bulk(
        &self,
        index: &str,
        operations: Vec<BulkOperation>,
    ) -> Result<Vec<BulkItemResult>, AppError> {
        let mut indices = self.indices.write().await;
        let docs = indices.entry(index.to_string()).or_default();

        let results = operations
            .into_iter()
            .map(|op| match op {
                BulkOperation::Index { id, document } => {
                    let id = id.unwrap_or_else(|| ulid::Ulid::new().to_string());
                    if !document.is_object() {
                        return BulkItemResult {
                            id: Some(id),
                            status: 400,
                            error: Some("mapper_parsing_exception: not an object".to_string()),
                        };
                    }
                    let status = Self::put(docs, id.clone(), document);
                    BulkItemResult {
                        id: Some(id),
                        status,
                        error: None,
                    }
                }
                BulkOperation::Delete { id } => {
                    if Self::remove(docs, &id) {
                        BulkItemResult {
                            id: Some(id),
                            status: 200,
                            error: None,
                        }
                    } else {
                        BulkItemResult {
                            id: Some(id),
                            status: 404,
                            error: Some("not_found".to_string()),
                        }
                    }
                }
            })
            .collect();
        Ok(results)
    }

    async fn search(
        &self,
        index: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse, AppError> {
        let indices = self.indices.read().await;
        let docs = indices
            .get(index)
            .ok_or_else(|| Self::index_missing("search", index))?;

        let mut matched: Vec<&StoredDocument> = docs
            .iter()
            .filter(|d| matches(&request.query, &d.source))
            .collect();
        // Stable sort keeps insertion order between equal keys
        matched.sort_by(|a, b| compare_by_sort(&request.sort, &a.source, &b.source));

        let aggregations = request
            .aggregations
            .iter()
            .map(|agg| {
                (
                    agg.name.clone(),
                    terms_buckets(matched.iter().map(|d| &d.source), &agg.field),
                )
            })
            .collect();

        let hits = matched
            .iter()
            .skip(request.from.unwrap_or(0))
            .take(request.size.unwrap_or(DEFAULT_SIZE))
            .map(|d| Hit {
                id: d.id.clone(),
                score: Some(1.0),
                source: d.source.clone(),
            })
            .collect();

        Ok(SearchResponse {
            total: matched.len() as u64,
            hits,
            aggregations,
        })
    }

    async fn count(&self, index: &str, query: &Query) -> Result<u64, AppError> {
        let indices = self.indices.read().await;
        let docs = indices
            .get(index)
            .ok_or_else(|| Self::index_missing("count", index))?;
        Ok(docs.iter().filter(|d| matches(query, &d.source)).count() as u64)
    }

    async fn exists(&self, index: &str, id: &str) -> Result<bool, AppError> {
        let indices = self.indices.read().await;
        Ok(indices
            .get(index)
            .map(|docs| docs.iter().any(|d| d.id == id))
            .unwrap_or(false))
    }

    async fn create_index(
        &self,
        index: &str,
        _settings: IndexSettings,
    ) -> Result<bool, AppError> {
        let mut indices = self.indices.write().await;
        if indices.contains_key(index) {
            return Ok(false);
        }
        indices.insert(index.to_string(), Vec::new());
        Ok(true)
    }
}

// ----------------------------------------------------------------------------
// Query evaluation
// ----------------------------------------------------------------------------

/// Evaluates `query` against a document source.
pub fn matches(query: &Query, source: &Value) -> bool {
    match query {
        Query::Bool(bool_query) => bool_matches(bool_query, source),
        Query::Term { field, value } => field_values(source, field)
            .iter()
            .any(|v| values_equal(v, value)),
        Query::Terms { field, values } => field_values(source, field)
            .iter()
            .any(|v| values.iter().any(|t| values_equal(v, t))),
        Query::Wildcard { field, pattern } => field_values(source, field)
            .iter()
            .any(|v| v.as_str().is_some_and(|s| wildcard_match(pattern, s))),
        Query::Range { field, bounds } => field_values(source, field)
            .iter()
            .any(|v| in_range(v, bounds)),
        Query::Exists { field } => !field_values(source, field).is_empty(),
    }
}

fn bool_matches(query: &BoolQuery, source: &Value) -> bool {
    if !query.must.iter().all(|q| matches(q, source))
        || !query.filter.iter().all(|q| matches(q, source))
        || query.must_not.iter().any(|q| matches(q, source))
    {
        return false;
    }

    // Without must/filter clauses at least one should clause has to match
    let required = query.minimum_should_match.map(|m| m as usize).unwrap_or(
        if query.must.is_empty() && query.filter.is_empty() && !query.should.is_empty() {
            1
        } else {
            0
        },
    );
    query.should.iter().filter(|q| matches(q, source)).count() >= required
}

/// Resolves a dotted field path, flattening arrays and dropping nulls.
fn field_values<'a>(source: &'a Value, field: &str) -> Vec<&'a Value> {
    let mut current = vec![source];
    for segment in field.split('.') {
        current = current
            .into_iter()
            .flat_map(|v| match v {
                Value::Array(items) => items.iter().collect::<Vec<_>>(),
                other => vec![other],
            })
            .filter_map(|v| v.get(segment))
            .collect();
    }
    current
        .into_iter()
        .flat_map(|v| match v {
            Value::Array(items) => items.iter().collect::<Vec<_>>(),
            other => vec![other],
        })
        .filter(|v| !v.is_null())
        .collect()
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn in_range(value: &Value, bounds: &RangeBounds) -> bool {
    let check = |bound: &Option<Value>, accept: fn(Ordering) -> bool| match bound {
        Some(b) => compare_values(value, b).is_some_and(accept),
        None => true,
    };
    check(&bounds.gt, Ordering::is_gt)
        && check(&bounds.gte, Ordering::is_ge)
        && check(&bounds.lt, Ordering::is_lt)
        && check(&bounds.lte, Ordering::is_le)
}

/// `*` matches any run of characters, `?` exactly one. No escape syntax.
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            t = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '*')
}

/// Missing sort values go last regardless of direction.
fn compare_by_sort(sort: &[SortField], a: &Value, b: &Value) -> Ordering {
    for field in sort {
        let left = field_values(a, &field.field).first().copied();
        let right = field_values(b, &field.field).first().copied();
        let ordering = match (left, right) {
            (Some(x), Some(y)) => {
                let ord = compare_values(x, y).unwrap_or(Ordering::Equal);
                match field.order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn terms_buckets<'a>(sources: impl Iterator<Item = &'a Value>, field: &str) -> Vec<Bucket> {
    let mut buckets: Vec<Bucket> = Vec::new();
    for source in sources {
        for value in field_values(source, field) {
            match buckets.iter_mut().find(|b| values_equal(&b.key, value)) {
                Some(bucket) => bucket.doc_count += 1,
                None => buckets.push(Bucket {
                    key: value.clone(),
                    doc_count: 1,
                }),
            }
        }
    }
    buckets.sort_by(|a, b| {
        b.doc_count
            .cmp(&a.doc_count)
            .then_with(|| compare_values(&a.key, &b.key).unwrap_or(Ordering::Equal))
    });
    buckets.truncate(DEFAULT_BUCKETS);
    buckets
}

/// Recursive object merge, as applied by a partial document update.
fn merge_json(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                if let Some(existing) = target.get_mut(&key) {
                    if existing.is_object() && value.is_object() {
                        merge_json(existing, value);
                        continue;
                    }
                }
                target.insert(key, value);
            }
        }
        (target, patch) => *target = patch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("*x*", "axb"));
        assert!(wildcard_match("*x*", "xa"));
        assert!(wildcard_match("*x*", "ax"));
        assert!(!wildcard_match("*x*", "abc"));
        assert!(wildcard_match("ab?d", "abcd"));
        assert!(wildcard_match("a*", "a"));
        assert!(!wildcard_match("a*c", "abcd"));
    }

    #[test]
    fn test_range_is_inclusive_for_between() {
        let bounds = RangeBounds::between(10, 20);
        assert!(in_range(&json!(10), &bounds));
        assert!(in_range(&json!(20), &bounds));
        assert!(!in_range(&json!(9), &bounds));
        assert!(!in_range(&json!(21), &bounds));
    }

    #[test]
    fn test_term_matches_array_members() {
        let doc = json!({ "tags": ["go", "rust"] });
        assert!(matches(&Query::term("tags", "rust"), &doc));
        assert!(!matches(&Query::term("tags", "java"), &doc));
    }

    #[test]
    fn test_exists_ignores_null() {
        let doc = json!({ "deleted_at": null, "name": "x" });
        assert!(!matches(&Query::exists("deleted_at"), &doc));
        assert!(matches(&Query::exists("name"), &doc));
    }

    #[test]
    fn test_nested_field_path() {
        let doc = json!({ "address": { "city": "Oslo" } });
        assert!(matches(&Query::term("address.city", "Oslo"), &doc));
    }

    #[test]
    fn test_merge_is_partial() {
        let mut doc = json!({ "name": "a", "meta": { "x": 1, "y": 2 } });
        merge_json(&mut doc, json!({ "meta": { "y": 3 }, "age": 4 }));
        assert_eq!(doc, json!({ "name": "a", "meta": { "x": 1, "y": 3 }, "age": 4 }));
    }

    #[tokio::test]
    async fn test_search_missing_index_is_rejected() {
        let client = MemoryClient::new();
        let err = client
            .search("nope", &SearchRequest::new(Query::Bool(BoolQuery::default())))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_search_default_size_and_aggregations() {
        let client = MemoryClient::new();
        for i in 0..12 {
            let dept = if i % 3 == 0 { "ops" } else { "eng" };
            client
                .index("staff", None, json!({ "n": i, "dept": dept }))
                .await
                .unwrap();
        }

        let mut request = SearchRequest::new(Query::Bool(BoolQuery::default()));
        request.aggregations.push(crate::query::TermsAggregation {
            name: "by_dept".to_string(),
            field: "dept".to_string(),
        });
        let response = client.search("staff", &request).await.unwrap();

        assert_eq!(response.total, 12);
        assert_eq!(response.hits.len(), DEFAULT_SIZE);
        let buckets = &response.aggregations["by_dept"];
        assert_eq!(buckets[0].key, json!("eng"));
        assert_eq!(buckets[0].doc_count, 8);
        assert_eq!(buckets[1].doc_count, 4);
    }
}
