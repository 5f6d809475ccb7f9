//! Data access layer.
//!
//! Repositories wrap the shared search client and use the `FromContext`
//! derive macro for dependency injection:
//!
//! ```ignore
//! let users = DocumentRepository::<User>::from_ref(&ctx);
//! let page = users.page(&QueryWrapper::new().eq("status", "active"), 1, 20).await?;
//! ```

mod document;

pub use document::DocumentRepository;
