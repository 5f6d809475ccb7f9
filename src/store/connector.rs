//! Lazily initialised, cached search engine client handle.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::store::request::ClusterInfo;
use crate::store::traits::{Connect, SharedClient};

/// Client handle plus the identity its liveness probe reported.
type Connected = (SharedClient, ClusterInfo);

type InitFuture = Shared<BoxFuture<'static, Result<Connected, String>>>;

enum State {
    Idle,
    Connecting(InitFuture),
    Ready(Connected),
}

/// Owns the single client handle for the composition root.
///
/// The first call to [`initialize`](Connector::initialize) builds the client
/// and probes the cluster once. Callers arriving while that is in flight wait
/// for the same attempt and observe the same outcome. A failed attempt leaves
/// nothing cached, so a later call starts a fresh attempt.
pub struct Connector<F: Connect> {
    factory: Arc<F>,
    state: Mutex<State>,
}

impl<F: Connect> Connector<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory: Arc::new(factory),
            state: Mutex::new(State::Idle),
        }
    }

    /// Initialises the client if needed and returns the cached handle.
    pub async fn initialize(&self) -> Result<SharedClient, AppError> {
        self.connected().await.map(|(client, _)| client)
    }

    /// Cluster identity recorded by the initialisation probe. Initialises
    /// the client if needed; never issues a second probe.
    pub async fn cluster_info(&self) -> Result<ClusterInfo, AppError> {
        self.connected().await.map(|(_, info)| info)
    }

    async fn connected(&self) -> Result<Connected, AppError> {
        let pending = {
            let mut state = self.state.lock().await;
            match &*state {
                State::Ready(connected) => return Ok(connected.clone()),
                State::Connecting(attempt) => attempt.clone(),
                State::Idle => {
                    let attempt = Self::attempt(self.factory.clone());
                    *state = State::Connecting(attempt.clone());
                    attempt
                }
            }
        };

        let outcome = pending.clone().await;

        let mut state = self.state.lock().await;
        if let State::Connecting(current) = &*state {
            // Only the attempt we waited on may settle the state
            if current.ptr_eq(&pending) {
                *state = match &outcome {
                    Ok(connected) => State::Ready(connected.clone()),
                    Err(_) => State::Idle,
                };
            }
        }

        outcome.map_err(AppError::Connection)
    }

    /// Returns the client, initialising it on first use.
    pub async fn client(&self) -> Result<SharedClient, AppError> {
        self.initialize().await
    }

    pub async fn is_initialized(&self) -> bool {
        matches!(&*self.state.lock().await, State::Ready(_))
    }

    fn attempt(factory: Arc<F>) -> InitFuture {
        async move {
            let client = factory.connect().await.map_err(|e| {
                tracing::error!("Failed to create search engine client: {}", e);
                e.to_string()
            })?;

            match client.info().await {
                Ok(info) => {
                    tracing::info!(
                        cluster = %info.cluster_name,
                        version = %info.version,
                        "Search engine client initialized"
                    );
                    Ok((client, info))
                }
                Err(e) => {
                    tracing::error!("Failed to connect to search engine: {}", e);
                    Err(e.to_string())
                }
            }
        }
        .boxed()
        .shared()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::query::Query;
    use crate::store::backends::memory::MemoryClient;
    use crate::store::request::{
        BulkItemResult, BulkOperation, IndexSettings, RawDocument, SearchRequest, SearchResponse,
    };
    use crate::store::traits::SearchClient;

    /// Counts `info` calls, delegates everything else.
    #[derive(Default)]
    struct InfoCounting {
        inner: MemoryClient,
        info_calls: AtomicUsize,
    }

    #[async_trait]
    impl SearchClient for InfoCounting {
        async fn info(&self) -> Result<ClusterInfo, AppError> {
            self.info_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.info().await
        }

        async fn index(
            &self,
            index: &str,
            id: Option<&str>,
            document: Value,
        ) -> Result<String, AppError> {
            self.inner.index(index, id, document).await
        }

        async fn get(&self, index: &str, id: &str) -> Result<Option<RawDocument>, AppError> {
            self.inner.get(index, id).await
        }

        async fn update(&self, index: &str, id: &str, partial: Value) -> Result<(), AppError> {
            self.inner.update(index, id, partial).await
        }

        async fn delete(&self, index: &str, id: &str) -> Result<(), AppError> {
            self.inner.delete(index, id).await
        }

        async fn bulk(
            &self,
            index: &str,
            operations: Vec<BulkOperation>,
        ) -> Result<Vec<BulkItemResult>, AppError> {
            self.inner.bulk(index, operations).await
        }

        async fn search(
            &self,
            index: &str,
            request: &SearchRequest,
        ) -> Result<SearchResponse, AppError> {
            self.inner.search(index, request).await
        }

        async fn count(&self, index: &str, query: &Query) -> Result<u64, AppError> {
            self.inner.count(index, query).await
        }

        async fn exists(&self, index: &str, id: &str) -> Result<bool, AppError> {
            self.inner.exists(index, id).await
        }

        async fn create_index(
            &self,
            index: &str,
            settings: IndexSettings,
        ) -> Result<bool, AppError> {
            self.inner.create_index(index, settings).await
        }
    }

    #[async_trait]
    impl Connect for Arc<InfoCounting> {
        async fn connect(&self) -> Result<SharedClient, AppError> {
            Ok(self.clone())
        }
    }

    struct CountingFactory {
        calls: AtomicUsize,
        reachable: AtomicBool,
    }

    impl CountingFactory {
        fn new(reachable: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                reachable: AtomicBool::new(reachable),
            }
        }
    }

    #[async_trait]
    impl Connect for Arc<CountingFactory> {
        async fn connect(&self) -> Result<SharedClient, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            let client = if self.reachable.load(Ordering::SeqCst) {
                MemoryClient::new()
            } else {
                MemoryClient::unreachable()
            };
            Ok(Arc::new(client))
        }
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let factory = Arc::new(CountingFactory::new(true));
        let connector = Connector::new(factory.clone());

        let first = connector.initialize().await.unwrap();
        let second = connector.client().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.calls.load(Ordering::SeqCst), 1);
        assert!(connector.is_initialized().await);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_attempt() {
        let factory = Arc::new(CountingFactory::new(true));
        let connector = Connector::new(factory.clone());

        let (a, b, c) = tokio::join!(
            connector.initialize(),
            connector.initialize(),
            connector.initialize()
        );

        let a = a.unwrap();
        assert!(Arc::ptr_eq(&a, &b.unwrap()));
        assert!(Arc::ptr_eq(&a, &c.unwrap()));
        assert_eq!(factory.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_failure() {
        let factory = Arc::new(CountingFactory::new(false));
        let connector = Connector::new(factory.clone());

        let (a, b) = tokio::join!(connector.initialize(), connector.initialize());

        assert!(matches!(a, Err(AppError::Connection(_))));
        assert!(matches!(b, Err(AppError::Connection(_))));
        assert_eq!(factory.calls.load(Ordering::SeqCst), 1);
        assert!(!connector.is_initialized().await);
    }

    #[tokio::test]
    async fn test_failed_probe_allows_retry() {
        let factory = Arc::new(CountingFactory::new(false));
        let connector = Connector::new(factory.clone());

        assert!(connector.initialize().await.is_err());

        factory.reachable.store(true, Ordering::SeqCst);
        assert!(connector.initialize().await.is_ok());
        assert_eq!(factory.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cluster_info_is_cached_from_initialization() {
        let client = Arc::new(InfoCounting::default());
        let connector = Connector::new(client.clone());

        connector.initialize().await.unwrap();
        let info = connector.cluster_info().await.unwrap();
        let again = connector.cluster_info().await.unwrap();

        assert_eq!(info.cluster_name, "memory");
        assert_eq!(info, again);
        assert_eq!(client.info_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cluster_info_initializes_on_first_use() {
        let client = Arc::new(InfoCounting::default());
        let connector = Connector::new(client.clone());

        let info = connector.cluster_info().await.unwrap();
        assert_eq!(info.cluster_name, "memory");
        assert!(connector.is_initialized().await);
        assert_eq!(client.info_calls.load(Ordering::SeqCst), 1);
    }
}
