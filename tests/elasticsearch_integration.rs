//! Integration tests for the Elasticsearch backend.
//!
//! These tests require a running Elasticsearch node on localhost:9200.
//! Run with: `cargo test --features integration --test elasticsearch_integration`

#![cfg(feature = "integration")]

use std::sync::Arc;

use docstore::config::ElasticsearchConfig;
use docstore::error::AppError;
use docstore::query::QueryWrapper;
use docstore::repositories::DocumentRepository;
use docstore::store::backends::elastic::ElasticClient;
use docstore::store::{Connector, SearchClient, SharedClient};
use docstore::Document;
use elasticsearch::indices::{IndicesDeleteParts, IndicesRefreshParts};
use serde::{Deserialize, Serialize};
use serial_test::serial;

const TEST_INDEX: &str = "docstore_integration_books";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Document)]
#[document(index = "docstore_integration_books")]
struct Book {
    #[serde(default)]
    id: String,
    title: String,
    genre: String,
    year: u32,
}

impl Book {
    fn new(title: &str, genre: &str, year: u32) -> Self {
        Self {
            title: title.to_string(),
            genre: genre.to_string(),
            year,
            ..Default::default()
        }
    }
}

fn create_client() -> ElasticClient {
    ElasticClient::from_config(&ElasticsearchConfig::default())
        .expect("Failed to build Elasticsearch client")
}

/// Drop the test index and recreate it empty.
async fn reset(client: &ElasticClient) -> DocumentRepository<Book> {
    let _ = client
        .inner()
        .indices()
        .delete(IndicesDeleteParts::Index(&[TEST_INDEX]))
        .send()
        .await;

    let shared: SharedClient = Arc::new(client.clone());
    let repo = DocumentRepository::new(shared);
    repo.ensure_index().await.expect("Failed to create index");
    repo
}

/// Make indexed documents visible to search.
async fn refresh(client: &ElasticClient) {
    client
        .inner()
        .indices()
        .refresh(IndicesRefreshParts::Index(&[TEST_INDEX]))
        .send()
        .await
        .expect("Refresh failed");
}

async fn seed(client: &ElasticClient, repo: &DocumentRepository<Book>) -> Vec<String> {
    let mut books = vec![
        Book::new("dune", "scifi", 1965),
        Book::new("neuromancer", "scifi", 1984),
        Book::new("emma", "classic", 1815),
        Book::new("hyperion", "scifi", 1989),
        Book::new("persuasion", "classic", 1817),
    ];
    let ids = repo.insert_batch(&mut books).await.expect("Seed failed");
    refresh(client).await;
    ids
}

// Tests share one index and must not interleave
#[serial]
mod elasticsearch_tests {
    use super::*;

    #[tokio::test]
    async fn test_info() {
        let client = create_client();
        let info = client.info().await.expect("Info failed");
        assert!(!info.version.is_empty());
    }

    #[tokio::test]
    async fn test_connector_initializes_once() {
        let connector = Connector::new(ElasticsearchConfig::default());
        let first = connector.initialize().await.expect("Connect failed");
        let second = connector.client().await.expect("Connect failed");
        assert!(Arc::ptr_eq(&first, &second));

        let info = connector.cluster_info().await.expect("Connect failed");
        assert!(!info.version.is_empty());
    }

    #[tokio::test]
    async fn test_ensure_index_is_idempotent() {
        let client = create_client();
        let repo = reset(&client).await;
        assert!(!repo.ensure_index().await.expect("ensure_index failed"));
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let client = create_client();
        let repo = reset(&client).await;

        let mut book = Book::new("dune", "scifi", 1965);
        let id = repo.insert(&mut book).await.expect("Insert failed");
        assert_eq!(book.id, id);

        let fetched = repo
            .get_by_id(&id)
            .await
            .expect("Get failed")
            .expect("Book missing");
        assert_eq!(fetched, book);
        assert!(repo.exists(&id).await.expect("Exists failed"));
        assert!(repo.get_by_id("missing").await.expect("Get failed").is_none());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let client = create_client();
        let repo = reset(&client).await;

        let mut book = Book::new("dune", "scifi", 1965);
        let id = repo.insert(&mut book).await.expect("Insert failed");

        book.year = 1966;
        repo.update(&mut book).await.expect("Update failed");
        let fetched = repo.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(fetched.year, 1966);

        repo.delete_by_id(&id).await.expect("Delete failed");
        assert!(!repo.exists(&id).await.unwrap());

        let err = repo.delete_by_id(&id).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_queries() {
        let client = create_client();
        let repo = reset(&client).await;
        seed(&client, &repo).await;

        let scifi = QueryWrapper::new().eq("genre", "scifi");
        assert_eq!(repo.count(&scifi).await.unwrap(), 3);

        let eighties = QueryWrapper::new().between("year", 1984, 1989);
        assert_eq!(repo.count(&eighties).await.unwrap(), 2);

        let like = QueryWrapper::new().like("title", "ero");
        let found = repo.list(&like).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "hyperion");

        let either = QueryWrapper::new().or([
            QueryWrapper::new().eq("genre", "classic"),
            QueryWrapper::new().gt("year", 1985),
        ]);
        assert_eq!(repo.count(&either).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_page_and_search() {
        let client = create_client();
        let repo = reset(&client).await;
        seed(&client, &repo).await;

        let wrapper = QueryWrapper::new().order_by("year", true);
        let page = repo.page(&wrapper, 2, 2).await.expect("Page failed");
        assert_eq!(page.total, 5);
        assert_eq!(page.pages, 3);
        assert_eq!(page.records[0].title, "dune");

        let result = repo
            .search(&QueryWrapper::new().group_by(["genre.keyword"]))
            .await
            .expect("Search failed");
        let buckets = result.buckets("group_by_genre.keyword_0");
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].doc_count, 3);
    }

    #[tokio::test]
    async fn test_delete_batch_partial_failure() {
        let client = create_client();
        let repo = reset(&client).await;
        let ids = seed(&client, &repo).await;

        let request = vec![ids[0].clone(), "missing".to_string()];
        let err = repo.delete_batch(&request).await.unwrap_err();
        assert!(matches!(err, AppError::PartialBatch { .. }));
        assert_eq!(err.failed_ids(), vec!["missing"]);
        assert!(!repo.exists(&ids[0]).await.unwrap());
    }
}
