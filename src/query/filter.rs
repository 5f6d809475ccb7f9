//! Declarative filters: structs whose fields describe predicates.
//!
//! A filter type lists its fields as [`FilterCondition`]s, each tagged with
//! a [`QueryKind`] and the target field name. [`QueryWrapper::from_filter`]
//! skips every condition whose value is zero (empty string, `0`, `false`,
//! `None`, empty list) and lowers the rest onto the builder.
//!
//! Usually derived:
//!
//! ```ignore
//! #[derive(QueryFilter)]
//! struct UserFilter {
//!     #[query(kind = "LIKE")]
//!     name: String,
//!     #[query(kind = "BETWEEN", field = "age")]
//!     age_range: Vec<u32>,
//!     #[query(kind = "IN", field = "dept")]
//!     departments: Vec<String>,
//! }
//!
//! let filter = UserFilter { name: "ann".into(), age_range: vec![18, 65], departments: vec![] };
//! let wrapper = QueryWrapper::<User>::from_filter(&filter);
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::query::wrapper::QueryWrapper;

/// Predicate kinds a filter field can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    /// Suffix match, `*value`.
    LikeLeft,
    /// Prefix match, `value*`.
    LikeRight,
    NotLike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    Between,
}

impl QueryKind {
    pub const ALL: [QueryKind; 15] = [
        QueryKind::Eq,
        QueryKind::Neq,
        QueryKind::Gt,
        QueryKind::Gte,
        QueryKind::Lt,
        QueryKind::Lte,
        QueryKind::Like,
        QueryKind::LikeLeft,
        QueryKind::LikeRight,
        QueryKind::NotLike,
        QueryKind::In,
        QueryKind::NotIn,
        QueryKind::IsNull,
        QueryKind::IsNotNull,
        QueryKind::Between,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Eq => "EQ",
            QueryKind::Neq => "NEQ",
            QueryKind::Gt => "GT",
            QueryKind::Gte => "GTE",
            QueryKind::Lt => "LT",
            QueryKind::Lte => "LTE",
            QueryKind::Like => "LIKE",
            QueryKind::LikeLeft => "LIKE_LEFT",
            QueryKind::LikeRight => "LIKE_RIGHT",
            QueryKind::NotLike => "NOT_LIKE",
            QueryKind::In => "IN",
            QueryKind::NotIn => "NOT_IN",
            QueryKind::IsNull => "IS_NULL",
            QueryKind::IsNotNull => "IS_NOT_NULL",
            QueryKind::Between => "BETWEEN",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueryKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::Validation(format!("Unknown query kind: {}", s)))
    }
}

/// A value usable in a declarative filter.
pub trait FilterValue {
    /// Zero values are skipped by the mapper.
    fn is_zero(&self) -> bool;

    fn to_value(&self) -> Value;
}

impl FilterValue for String {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl FilterValue for &str {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn to_value(&self) -> Value {
        Value::String((*self).to_string())
    }
}

impl FilterValue for bool {
    fn is_zero(&self) -> bool {
        !*self
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

macro_rules! impl_filter_value_for_ints {
    ($($ty:ty),*) => {
        $(
            impl FilterValue for $ty {
                fn is_zero(&self) -> bool {
                    *self == 0
                }

                fn to_value(&self) -> Value {
                    json!(*self)
                }
            }
        )*
    };
}

impl_filter_value_for_ints!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl FilterValue for f32 {
    fn is_zero(&self) -> bool {
        *self == 0.0
    }

    fn to_value(&self) -> Value {
        json!(*self)
    }
}

impl FilterValue for f64 {
    fn is_zero(&self) -> bool {
        *self == 0.0
    }

    fn to_value(&self) -> Value {
        json!(*self)
    }
}

impl FilterValue for DateTime<Utc> {
    fn is_zero(&self) -> bool {
        false
    }

    fn to_value(&self) -> Value {
        Value::String(self.to_rfc3339())
    }
}

impl<T: FilterValue> FilterValue for Option<T> {
    /// Only `None` is zero; `Some(0)` is an explicit filter.
    fn is_zero(&self) -> bool {
        self.is_none()
    }

    fn to_value(&self) -> Value {
        self.as_ref().map(FilterValue::to_value).unwrap_or(Value::Null)
    }
}

impl<T: FilterValue> FilterValue for Vec<T> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(FilterValue::to_value).collect())
    }
}

impl FilterValue for Value {
    fn is_zero(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Number(n) => n.as_f64() == Some(0.0),
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
        }
    }

    fn to_value(&self) -> Value {
        self.clone()
    }
}

/// One field of a declarative filter.
#[derive(Clone, Copy)]
pub struct FilterCondition<'a> {
    pub kind: QueryKind,
    /// Target field in the stored document.
    pub field: &'static str,
    pub value: &'a dyn FilterValue,
}

impl<'a> FilterCondition<'a> {
    pub fn new(kind: QueryKind, field: &'static str, value: &'a dyn FilterValue) -> Self {
        Self { kind, field, value }
    }
}

impl fmt::Debug for FilterCondition<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterCondition")
            .field("kind", &self.kind)
            .field("field", &self.field)
            .field("value", &self.value.to_value())
            .finish()
    }
}

/// A struct usable as a query. See [`QueryWrapper::from_filter`].
pub trait QueryFilter {
    /// Conditions in field declaration order, zero values included.
    fn conditions(&self) -> Vec<FilterCondition<'_>>;
}

impl<T> QueryWrapper<T> {
    /// Builds a wrapper from a declarative filter.
    pub fn from_filter<F: QueryFilter + ?Sized>(filter: &F) -> Self {
        Self::new().apply_filter(filter)
    }

    /// Lowers every non-zero condition of `filter` onto this builder.
    pub fn apply_filter<F: QueryFilter + ?Sized>(self, filter: &F) -> Self {
        filter
            .conditions()
            .into_iter()
            .fold(self, |wrapper, condition| wrapper.apply_condition(condition))
    }

    fn apply_condition(self, condition: FilterCondition<'_>) -> Self {
        if condition.value.is_zero() {
            return self;
        }

        let field = condition.field;
        let value = condition.value.to_value();
        match condition.kind {
            QueryKind::Eq => self.eq(field, value),
            QueryKind::Neq => self.neq(field, value),
            QueryKind::Gt => self.gt(field, value),
            QueryKind::Gte => self.gte(field, value),
            QueryKind::Lt => self.lt(field, value),
            QueryKind::Lte => self.lte(field, value),
            QueryKind::Like => self.like(field, wildcard_text(&value)),
            QueryKind::LikeLeft => self.like_left(field, wildcard_text(&value)),
            QueryKind::LikeRight => self.like_right(field, wildcard_text(&value)),
            QueryKind::NotLike => self.not_like(field, wildcard_text(&value)),
            QueryKind::In | QueryKind::NotIn => match value {
                Value::Array(items) if condition.kind == QueryKind::In => self.is_in(field, items),
                Value::Array(items) => self.not_in(field, items),
                _ => {
                    tracing::warn!(field, kind = %condition.kind, "Filter value is not a list; skipped");
                    self
                }
            },
            QueryKind::IsNull => self.is_null(field),
            QueryKind::IsNotNull => self.is_not_null(field),
            QueryKind::Between => match value {
                Value::Array(mut items) if items.len() >= 2 => {
                    let max = items.swap_remove(1);
                    let min = items.swap_remove(0);
                    self.between(field, min, max)
                }
                _ => {
                    tracing::debug!(field, "BETWEEN needs at least two values; skipped");
                    self
                }
            },
        }
    }
}

/// Strings are used verbatim; anything else by its JSON rendering.
fn wildcard_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
