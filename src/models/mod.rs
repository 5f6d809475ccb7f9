//! Document models and pagination types.

mod document;
mod page;

pub use document::{
    default_index_name, stamp_create, stamp_update, BaseModel, Document, DocumentId, Timestamp,
};
pub use page::{PageRequest, PageResult, SearchResult, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
