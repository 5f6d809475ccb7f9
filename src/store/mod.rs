//! Search engine access layer.
//!
//! Everything above this module talks to the search engine through the
//! [`SearchClient`] trait, so repositories work unchanged against the
//! Elasticsearch backend or the in-memory one.
//!
//! # Architecture
//!
//! - [`SearchClient`] - Document, bulk, search and count operations
//! - [`Connect`] - Builds a client from configuration
//! - [`Connector`] - One-time initialisation with a liveness probe; the
//!   composition root owns it and hands out the resulting [`SharedClient`]
//!
//! # Usage
//!
//! ```ignore
//! use docstore::config::Config;
//! use docstore::store::Connector;
//!
//! let config = Config::load()?;
//! let connector = Connector::new(config.elasticsearch.clone());
//! let client = connector.initialize().await?;
//!
//! // Identity recorded by the initialisation probe, no second round trip
//! let info = connector.cluster_info().await?;
//! println!("{} {}", info.cluster_name, info.version);
//! ```

mod connector;
mod request;
mod traits;

pub mod backends;

pub use connector::Connector;
pub use request::{
    Bucket, BulkItemResult, BulkOperation, ClusterInfo, Hit, IndexSettings, RawDocument,
    SearchRequest, SearchResponse,
};
pub use traits::{Connect, SearchClient, SharedClient};
