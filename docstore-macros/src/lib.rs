//! Derive macros for docstore.
//!
//! - `#[derive(Context)]` to make a struct's fields extractable
//! - `#[derive(FromContext)]` to auto-resolve fields from a context
//! - `#[derive(Document)]` to describe a type's index, identity and timestamps
//! - `#[derive(QueryFilter)]` to turn an annotated struct into query conditions
//!
//! The DI derives reference `crate::FromRef`, so they are meant for use
//! inside the docstore crate. `Document` and `QueryFilter` reference
//! `::docstore::...` and work from any crate depending on docstore.

use proc_macro::TokenStream;

mod context;
mod document;
mod from_context;
mod query_filter;
mod util;

/// Derive macro for creating a DI context.
///
/// Generates a `FromRef` implementation for each field type, cloning the
/// field out of the context.
///
/// # Example
///
/// ```ignore
/// #[derive(Context, Clone)]
/// pub struct Context {
///     pub client: SharedClient,
///     pub config: Arc<Config>,
/// }
///
/// // Generated implementations:
/// // impl FromRef<Context> for SharedClient { ... }
/// // impl FromRef<Context> for Arc<Config> { ... }
/// ```
#[proc_macro_derive(Context)]
pub fn derive_context(input: TokenStream) -> TokenStream {
    context::derive_context_impl(input)
}

/// Derive macro for types that can be constructed from a context.
///
/// Generates a `FromRef<Context>` implementation resolving each field with
/// `FromRef::from_ref`. Fields marked `#[from_context(default)]` are filled
/// with `Default::default()` instead.
///
/// # Example
///
/// ```ignore
/// #[derive(FromContext)]
/// pub struct DocumentRepository<T: Document> {
///     client: SharedClient,      // resolved via SharedClient::from_ref(ctx)
///     config: Arc<Config>,       // resolved via Arc<Config>::from_ref(ctx)
///     #[from_context(default)]
///     _entity: PhantomData<fn() -> T>,
/// }
/// ```
///
/// # Custom Context Type
///
/// ```ignore
/// #[derive(FromContext)]
/// #[from_context(Context = "MyAppContext")]
/// pub struct MyRepository {
///     client: SharedClient,
/// }
/// ```
#[proc_macro_derive(FromContext, attributes(from_context))]
pub fn derive_from_context(input: TokenStream) -> TokenStream {
    from_context::derive_from_context_impl(input)
}

/// Derive macro implementing `docstore::models::Document`.
///
/// Struct attribute:
/// - `#[document(index = "users")]` overrides the index name (default: the
///   lower-cased type name)
///
/// Field attributes:
/// - `#[document(id)]` identity field (`String`, integer, or `Option` of either)
/// - `#[document(created_at)]`, `#[document(updated_at)]` timestamps
///   (`DateTime<Utc>` or `Option<DateTime<Utc>>`)
/// - `#[document(score)]` receives the hit relevance (`f64` or `Option<f64>`)
/// - `#[document(base)]` an embedded `Document` (usually a flattened
///   `BaseModel`) that handles every role not assigned above
///
/// Fields named `id`, `created_at` and `updated_at` take their role without
/// an attribute.
///
/// # Example
///
/// ```ignore
/// #[derive(Serialize, Deserialize, Document)]
/// #[document(index = "articles")]
/// pub struct Article {
///     #[serde(flatten)]
///     #[document(base)]
///     pub base: BaseModel,
///     pub title: String,
/// }
/// ```
#[proc_macro_derive(Document, attributes(document))]
pub fn derive_document(input: TokenStream) -> TokenStream {
    document::derive_document_impl(input)
}

/// Derive macro implementing `docstore::query::QueryFilter`.
///
/// Each field annotated with `#[query(kind = "...")]` becomes one condition;
/// `field = "..."` sets the target document field (default: the struct
/// field's name). Unknown kinds are rejected at compile time. Fields without
/// `#[query]` are ignored.
///
/// # Example
///
/// ```ignore
/// #[derive(QueryFilter)]
/// pub struct ArticleFilter {
///     #[query(kind = "LIKE")]
///     pub title: String,
///     #[query(kind = "IN", field = "tag")]
///     pub tags: Vec<String>,
///     #[query(kind = "BETWEEN", field = "created_at")]
///     pub created: Vec<String>,
///     pub unrelated: bool,
/// }
/// ```
#[proc_macro_derive(QueryFilter, attributes(query))]
pub fn derive_query_filter(input: TokenStream) -> TokenStream {
    query_filter::derive_query_filter_impl(input)
}
