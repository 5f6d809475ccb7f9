//! Request and response types exchanged with a search engine client.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::query::{Query, SortField, TermsAggregation};

/// A search request: predicate, sort keys, page window and aggregations.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: Query,
    pub sort: Vec<SortField>,
    /// Page size; `None` leaves the server default in place.
    pub size: Option<usize>,
    /// Number of matches to skip; `None` starts from the first match.
    pub from: Option<usize>,
    pub aggregations: Vec<TermsAggregation>,
}

impl SearchRequest {
    pub fn new(query: Query) -> Self {
        Self {
            query,
            sort: Vec::new(),
            size: None,
            from: None,
            aggregations: Vec::new(),
        }
    }

    /// Encodes the request as an Elasticsearch `_search` body.
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("query".to_string(), self.query.to_dsl());
        if !self.sort.is_empty() {
            body.insert(
                "sort".to_string(),
                Value::Array(self.sort.iter().map(SortField::to_dsl).collect()),
            );
        }
        if let Some(size) = self.size {
            body.insert("size".to_string(), json!(size));
        }
        if let Some(from) = self.from {
            body.insert("from".to_string(), json!(from));
        }
        if !self.aggregations.is_empty() {
            let aggs: Map<String, Value> = self
                .aggregations
                .iter()
                .map(|agg| (agg.name.clone(), json!({ "terms": { "field": agg.field } })))
                .collect();
            body.insert("aggs".to_string(), Value::Object(aggs));
        }
        Value::Object(body)
    }
}

/// A stored document as returned by a get-by-id.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    /// Authoritative id from the response envelope.
    pub id: String,
    pub source: Value,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub id: String,
    pub score: Option<f64>,
    pub source: Value,
}

/// One bucket of a terms aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub key: Value,
    pub doc_count: u64,
}

/// Result of a search request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    /// Total number of matches, independent of the page window.
    pub total: u64,
    pub hits: Vec<Hit>,
    /// Terms aggregation buckets keyed by aggregation name.
    pub aggregations: BTreeMap<String, Vec<Bucket>>,
}

impl SearchResponse {
    /// Decodes an Elasticsearch `_search` response body.
    pub fn from_body(body: &Value) -> Self {
        let hits_node = body.get("hits");
        // `hits.total` is an object since 7.x, a bare number before that
        let total = hits_node
            .and_then(|h| h.get("total"))
            .and_then(|t| t.get("value").or(Some(t)))
            .and_then(Value::as_u64)
            .unwrap_or(0);

        let hits = hits_node
            .and_then(|h| h.get("hits"))
            .and_then(Value::as_array)
            .map(|hits| {
                hits.iter()
                    .map(|hit| Hit {
                        id: hit
                            .get("_id")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        score: hit.get("_score").and_then(Value::as_f64),
                        source: hit.get("_source").cloned().unwrap_or(Value::Null),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let aggregations = body
            .get("aggregations")
            .and_then(Value::as_object)
            .map(|aggs| {
                aggs.iter()
                    .map(|(name, agg)| {
                        let buckets = agg
                            .get("buckets")
                            .and_then(Value::as_array)
                            .map(|buckets| {
                                buckets
                                    .iter()
                                    .map(|b| Bucket {
                                        key: b.get("key").cloned().unwrap_or(Value::Null),
                                        doc_count: b
                                            .get("doc_count")
                                            .and_then(Value::as_u64)
                                            .unwrap_or(0),
                                    })
                                    .collect()
                            })
                            .unwrap_or_default();
                        (name.clone(), buckets)
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            total,
            hits,
            aggregations,
        }
    }
}

/// One operation of a bulk request.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOperation {
    /// Index `document`, under `id` when given, otherwise under a store-assigned id.
    Index { id: Option<String>, document: Value },
    Delete { id: String },
}

/// Per-item outcome of a bulk request, in submission order.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkItemResult {
    pub id: Option<String>,
    pub status: u16,
    pub error: Option<String>,
}

impl BulkItemResult {
    /// Success means a 2xx status and no error payload. A delete of a missing
    /// document (404 `not_found`) counts as a failure.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status)
    }

    /// Decodes the `items` array of an Elasticsearch `_bulk` response.
    pub fn from_bulk_body(body: &Value) -> Vec<Self> {
        body.get("items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|item| {
                        // Each item is `{ "<action>": { ... } }`
                        let result = item
                            .as_object()
                            .and_then(|obj| obj.values().next())
                            .cloned()
                            .unwrap_or(Value::Null);
                        let status = result
                            .get("status")
                            .and_then(Value::as_u64)
                            .and_then(|s| u16::try_from(s).ok())
                            .unwrap_or(0);
                        let error = result.get("error").map(|e| {
                            e.get("reason")
                                .and_then(Value::as_str)
                                .map(str::to_string)
                                .unwrap_or_else(|| e.to_string())
                        });
                        let error = error.or_else(|| {
                            // Missing-document deletes carry no error object
                            (status == 404).then(|| {
                                result
                                    .get("result")
                                    .and_then(Value::as_str)
                                    .unwrap_or("not_found")
                                    .to_string()
                            })
                        });
                        BulkItemResult {
                            id: result.get("_id").and_then(Value::as_str).map(str::to_string),
                            status,
                            error,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Cluster identity returned by the liveness probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterInfo {
    pub cluster_name: String,
    pub version: String,
}

/// Settings used when creating an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSettings {
    pub number_of_shards: u32,
    pub number_of_replicas: u32,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            number_of_shards: 1,
            number_of_replicas: 1,
        }
    }
}
