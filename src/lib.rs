//! docstore - generic document repository over Elasticsearch
//!
//! Typed CRUD, bulk, list, page, count and search over any entity type,
//! with a fluent predicate builder and declarative filter structs.
//!
//! ```ignore
//! use docstore::{Document, QueryFilter};
//! use docstore::query::QueryWrapper;
//! use docstore::repositories::DocumentRepository;
//!
//! #[derive(Serialize, Deserialize, Document)]
//! #[document(index = "users")]
//! struct User {
//!     #[serde(default)]
//!     id: String,
//!     name: String,
//!     age: u32,
//! }
//!
//! #[derive(QueryFilter)]
//! struct UserFilter {
//!     #[query(kind = "LIKE")]
//!     name: String,
//! }
//!
//! let users = DocumentRepository::<User>::new(client);
//! let id = users.insert(&mut user).await?;
//! let adults = users.list(&QueryWrapper::new().gte("age", 18)).await?;
//! let anns = users.list_by_filter(&UserFilter { name: "ann".into() }).await?;
//! ```

// Lets derive output written against `::docstore` resolve inside this crate
extern crate self as docstore;

pub mod cli;
pub mod config;
pub mod context;
pub mod di;
pub mod error;
pub mod models;
pub mod query;
pub mod repositories;
pub mod store;

// Re-export FromRef at crate root for docstore-macros generated code
pub use di::FromRef;

pub use docstore_macros::{Document, QueryFilter};
pub use error::AppError;
pub use models::{BaseModel, Document, PageRequest, PageResult, SearchResult};
pub use query::{QueryFilter, QueryKind, QueryWrapper};
pub use repositories::DocumentRepository;

// Used by `#[derive(Document)]` output
pub use chrono;
