//! Dependency injection infrastructure.
//!
//! Compile-time dependency injection using the `FromRef` trait and derive
//! macros from `docstore-macros`.
//!
//! # Overview
//!
//! - `FromRef<T>`: Trait for extracting a value from a reference to `T`
//! - `#[derive(Context)]`: Makes each field of a struct extractable via `FromRef`
//! - `#[derive(FromContext)]`: Generates `FromRef` impl by resolving each field
//!
//! # Example
//!
//! ```ignore
//! use docstore::context::Context;
//! use docstore::di::FromRef;
//! use docstore::repositories::DocumentRepository;
//!
//! let ctx = Context::connect(Config::load()?).await?;
//! let users = DocumentRepository::<User>::from_ref(&ctx);
//! ```

/// Trait for extracting a value from a reference to another type.
///
/// Types that implement `FromRef<T>` can be extracted from `&T`.
pub trait FromRef<T> {
    fn from_ref(input: &T) -> Self;
}

/// Any Clone type can be extracted from itself.
impl<T: Clone> FromRef<T> for T {
    fn from_ref(input: &T) -> Self {
        input.clone()
    }
}

pub use docstore_macros::{Context, FromContext};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::context::Context;
    use crate::models::BaseModel;
    use crate::repositories::DocumentRepository;
    use crate::store::backends::memory::MemoryClient;
    use crate::store::SharedClient;

    #[test]
    fn test_repository_resolves_from_context() {
        let client: SharedClient = Arc::new(MemoryClient::new());
        let ctx = Context::new(client.clone(), Default::default());

        let resolved = SharedClient::from_ref(&ctx);
        assert!(Arc::ptr_eq(&resolved, &client));

        let repo = DocumentRepository::<BaseModel>::from_ref(&ctx);
        assert_eq!(repo.index_name(), "basemodel");
    }
}
