//! Backend implementations of [`SearchClient`](crate::store::SearchClient).
//!
//! # Available Backends
//!
//! | Backend | Module | Use |
//! |---------|--------|-----|
//! | Elasticsearch | [`elastic`] | Production |
//! | In-memory | [`memory`] | Tests, local development |
//!
//! # Implementing a Backend
//!
//! 1. Create a client struct (e.g., `ElasticClient`)
//! 2. Implement `SearchClient` for it, mapping store rejections to
//!    [`AppError::Rejected`](crate::error::AppError::Rejected)
//! 3. Implement `Connect` for its configuration type so a
//!    [`Connector`](crate::store::Connector) can build it

pub mod elastic;
pub mod memory;
