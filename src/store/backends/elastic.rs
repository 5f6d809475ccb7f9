//! Elasticsearch backend implementation.
//!
//! # Example
//!
//! ```ignore
//! use docstore::config::ElasticsearchConfig;
//! use docstore::store::backends::elastic::ElasticClient;
//!
//! let client = ElasticClient::from_config(&ElasticsearchConfig::default())?;
//! let info = client.info().await?;
//! ```

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use elasticsearch::auth::Credentials;
use elasticsearch::cert::{Certificate, CertificateValidation};
use elasticsearch::http::request::JsonBody;
use elasticsearch::http::response::Response;
use elasticsearch::http::transport::{
    ConnectionPool, MultiNodeConnectionPool, SingleNodeConnectionPool, Transport,
    TransportBuilder,
};
use elasticsearch::http::{StatusCode, Url};
use elasticsearch::indices::{IndicesCreateParts, IndicesExistsParts};
use elasticsearch::{
    BulkParts, CountParts, DeleteParts, Elasticsearch, ExistsParts, GetParts, IndexParts,
    SearchParts, UpdateParts,
};
use serde_json::{json, Value};

use crate::config::ElasticsearchConfig;
use crate::error::AppError;
use crate::query::Query;
use crate::store::request::{
    BulkItemResult, BulkOperation, ClusterInfo, IndexSettings, RawDocument, SearchRequest,
    SearchResponse,
};
use crate::store::traits::{Connect, SearchClient, SharedClient};

/// Elasticsearch client.
///
/// Cheap to clone; the underlying transport is shared.
#[derive(Clone, Debug)]
pub struct ElasticClient {
    client: Elasticsearch,
}

impl ElasticClient {
    /// Wraps an already configured client.
    pub fn new(client: Elasticsearch) -> Self {
        Self { client }
    }

    /// Builds the transport from configuration. No request is sent.
    pub fn from_config(config: &ElasticsearchConfig) -> Result<Self, AppError> {
        let mut urls = config
            .addresses
            .iter()
            .map(|address| {
                address.parse::<Url>().map_err(|e| {
                    AppError::Connection(format!("Invalid address '{}': {}", address, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let transport = match urls.len() {
            0 => {
                return Err(AppError::Connection(
                    "No Elasticsearch addresses configured".to_string(),
                ))
            }
            1 => build_transport(SingleNodeConnectionPool::new(urls.remove(0)), config)?,
            _ => build_transport(MultiNodeConnectionPool::round_robin(urls, None), config)?,
        };

        Ok(Self::new(Elasticsearch::new(transport)))
    }

    /// Returns the underlying client for operations not covered here.
    pub fn inner(&self) -> &Elasticsearch {
        &self.client
    }
}

fn build_transport<P>(pool: P, config: &ElasticsearchConfig) -> Result<Transport, AppError>
where
    P: ConnectionPool + Debug + Clone + Send + 'static,
{
    let mut builder =
        TransportBuilder::new(pool).timeout(Duration::from_millis(config.request_timeout_ms));

    if let Some((username, password)) = config.credentials() {
        builder = builder.auth(Credentials::Basic(username.to_string(), password.to_string()));
    }

    if config.disable_certificate_validation {
        builder = builder.cert_validation(CertificateValidation::None);
    } else if let Some(pem) = &config.ca_cert {
        let certificate = Certificate::from_pem(pem.as_bytes())
            .map_err(|e| AppError::Connection(format!("Invalid CA certificate: {}", e)))?;
        builder = builder.cert_validation(CertificateValidation::Full(certificate));
    }

    builder
        .build()
        .map_err(|e| AppError::Connection(format!("Failed to build transport: {}", e)))
}

/// Turns a non-2xx response into [`AppError::Rejected`], keeping the body as reason.
async fn ensure_success(operation: &'static str, response: Response) -> Result<Response, AppError> {
    let status = response.status_code();
    if status.is_success() {
        return Ok(response);
    }
    let reason = response.text().await?;
    Err(AppError::Rejected {
        operation,
        status: status.as_u16(),
        reason,
    })
}

fn str_field(body: &Value, key: &str) -> String {
    body.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl SearchClient for ElasticClient {
    async fn info(&self) -> Result<ClusterInfo, AppError> {
        let response = self.client.info().send().await?;
        let body: Value = ensure_success("info", response).await?.json().await?;
        Ok(ClusterInfo {
            cluster_name: str_field(&body, "cluster_name"),
            version: body
                .get("version")
                .map(|v| str_field(v, "number"))
                .unwrap_or_default(),
        })
    }

    async fn index(
        &self,
        index: &str,
        id: Option<&str>,
        document: Value,
    ) -> Result<String, AppError> {
        let response = match id {
            Some(id) => {
                self.client
                    .index(IndexParts::IndexId(index, id))
                    .body(document)
                    .send()
                    .await?
            }
            None => {
                self.client
                    .index(IndexParts::Index(index))
                    .body(document)
                    .send()
                    .await?
            }
        };
        let body: Value = ensure_success("index", response).await?.json().await?;
        tracing::debug!(index, result = %str_field(&body, "result"), "Indexed document");
        Ok(str_field(&body, "_id"))
    }

    async fn get(&self, index: &str, id: &str) -> Result<Option<RawDocument>, AppError> {
        let response = self.client.get(GetParts::IndexId(index, id)).send().await?;
        if response.status_code() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: Value = ensure_success("get", response).await?.json().await?;
        if !body.get("found").and_then(Value::as_bool).unwrap_or(false) {
            return Ok(None);
        }
        Ok(Some(RawDocument {
            id: str_field(&body, "_id"),
            source: body.get("_source").cloned().unwrap_or(Value::Null),
        }))
    }

    async fn update(&self, index: &str, id: &str, partial: Value) -> Result<(), AppError> {
        let response = self
            .client
            .update(UpdateParts::IndexId(index, id))
            .body(json!({ "doc": partial }))
            .send()
            .await?;
        ensure_success("update", response).await?;
        Ok(())
    }

    async fn delete(&self, index: &str, id: &str) -> Result<(), AppError> {
        let response = self
            .client
            .delete(DeleteParts::IndexId(index, id))
            .send()
            .await?;
        ensure_success("delete", response).await?;
        Ok(())
    }

    async fn bulk(
        &self,
        index: &str,
        operations: Vec<BulkOperation>,
    ) -> Result<Vec<BulkItemResult>, AppError> {
        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(operations.len() * 2);
        for operation in operations {
            match operation {
                BulkOperation::Index { id, document } => {
                    let action = match id {
                        Some(id) => json!({ "index": { "_id": id } }),
                        None => json!({ "index": {} }),
                    };
                    body.push(action.into());
                    body.push(document.into());
                }
                BulkOperation::Delete { id } => {
                    body.push(json!({ "delete": { "_id": id } }).into());
                }
            }
        }

        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(body)
            .send()
            .await?;
        let body: Value = ensure_success("bulk", response).await?.json().await?;
        Ok(BulkItemResult::from_bulk_body(&body))
    }

    async fn search(
        &self,
        index: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse, AppError> {
        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .body(request.to_body())
            .send()
            .await?;
        let body: Value = ensure_success("search", response).await?.json().await?;
        Ok(SearchResponse::from_body(&body))
    }

    async fn count(&self, index: &str, query: &Query) -> Result<u64, AppError> {
        let response = self
            .client
            .count(CountParts::Index(&[index]))
            .body(json!({ "query": query.to_dsl() }))
            .send()
            .await?;
        let body: Value = ensure_success("count", response).await?.json().await?;
        Ok(body.get("count").and_then(Value::as_u64).unwrap_or(0))
    }

    async fn exists(&self, index: &str, id: &str) -> Result<bool, AppError> {
        let response = self
            .client
            .exists(ExistsParts::IndexId(index, id))
            .send()
            .await?;
        match response.status_code() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => ensure_success("exists", response).await.map(|_| false),
        }
    }

    async fn create_index(
        &self,
        index: &str,
        settings: IndexSettings,
    ) -> Result<bool, AppError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await?;
        if response.status_code() == StatusCode::OK {
            return Ok(false);
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(json!({
                "settings": {
                    "number_of_shards": settings.number_of_shards,
                    "number_of_replicas": settings.number_of_replicas,
                }
            }))
            .send()
            .await?;

        match ensure_success("create_index", response).await {
            Ok(_) => {
                tracing::info!(index, "Created index");
                Ok(true)
            }
            // Lost a creation race with another caller
            Err(AppError::Rejected { reason, .. })
                if reason.contains("resource_already_exists_exception") =>
            {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Connect for ElasticsearchConfig {
    async fn connect(&self) -> Result<SharedClient, AppError> {
        Ok(Arc::new(ElasticClient::from_config(self)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_single_node() {
        let client = ElasticClient::from_config(&ElasticsearchConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_from_config_multi_node_with_auth() {
        let config = ElasticsearchConfig {
            addresses: vec![
                "http://es-1:9200".to_string(),
                "http://es-2:9200".to_string(),
            ],
            username: Some("elastic".to_string()),
            password: Some("secret".to_string()),
            ..Default::default()
        };
        assert!(ElasticClient::from_config(&config).is_ok());
    }

    #[test]
    fn test_from_config_rejects_bad_address() {
        let config = ElasticsearchConfig {
            addresses: vec!["not a url".to_string()],
            ..Default::default()
        };
        let err = ElasticClient::from_config(&config).unwrap_err();
        assert!(matches!(err, AppError::Connection(_)));
    }

    #[test]
    fn test_from_config_rejects_empty_addresses() {
        let config = ElasticsearchConfig {
            addresses: vec![],
            ..Default::default()
        };
        assert!(matches!(
            ElasticClient::from_config(&config),
            Err(AppError::Connection(_))
        ));
    }
}
