//! Application context providing dependency injection root.

use std::sync::Arc;

use crate::config::Config;
use crate::di::Context as ContextDerive;
use crate::error::AppError;
use crate::store::{Connector, SharedClient};

/// Root application context for dependency injection.
///
/// Holds the shared dependencies and uses `#[derive(Context)]` to generate
/// `FromRef` implementations for each field.
#[derive(ContextDerive, Clone)]
pub struct Context {
    /// Initialised search engine client.
    pub client: SharedClient,
    /// Application configuration.
    pub config: Arc<Config>,
}

impl Context {
    pub fn new(client: SharedClient, config: Config) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }

    /// Initialises the Elasticsearch client described by `config` (one
    /// liveness probe) and builds the context around it.
    pub async fn connect(config: Config) -> Result<Self, AppError> {
        let connector = Connector::new(config.elasticsearch.clone());
        let client = connector.initialize().await?;
        Ok(Self::new(client, config))
    }
}
