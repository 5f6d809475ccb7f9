//! Query construction.
//!
//! - [`ast`] - The predicate tree and its query DSL encoding
//! - [`QueryWrapper`] - Fluent builder producing predicate trees and search requests
//! - [`QueryFilter`] - Declarative filters lowered onto a [`QueryWrapper`]

pub mod ast;
mod filter;
mod wrapper;

pub use ast::{BoolQuery, Query, RangeBounds, SortField, SortOrder, TermsAggregation};
pub use filter::{FilterCondition, FilterValue, QueryFilter, QueryKind};
pub use wrapper::QueryWrapper;
