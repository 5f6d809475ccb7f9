//! Per-type document metadata: index name, identity and timestamps.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// An entity stored as a document in a search index.
///
/// Usually derived with `#[derive(Document)]`:
///
/// ```ignore
/// #[derive(Debug, Clone, Serialize, Deserialize, Document)]
/// #[document(index = "users")]
/// struct User {
///     #[serde(default)]
///     id: String,
///     name: String,
///     #[serde(default)]
///     created_at: DateTime<Utc>,
///     #[serde(default)]
///     updated_at: DateTime<Utc>,
/// }
/// ```
///
/// Identity fields are removed from a fetched body before decoding and set
/// from the response envelope afterwards, so they must deserialize when
/// absent (`#[serde(default)]`).
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Index holding documents of this type. Defaults to the lower-cased
    /// type name.
    fn index_name() -> Cow<'static, str> {
        Cow::Owned(default_index_name::<Self>())
    }

    /// The document id, or `None` when unset.
    fn document_id(&self) -> Option<String>;

    /// Writes `id` back into the identity field, coercing it to the field's
    /// type. Returns `false` when the id cannot be represented.
    fn set_document_id(&mut self, id: &str) -> bool;

    /// Sets the creation timestamp if it is still unset.
    fn stamp_created(&mut self, _now: DateTime<Utc>) {}

    fn stamp_updated(&mut self, _now: DateTime<Utc>) {}

    /// Receives the relevance score of a search hit.
    fn set_score(&mut self, _score: f64) {}

    /// Field name of the update timestamp in the stored body.
    fn updated_at_field() -> &'static str {
        "updated_at"
    }

    /// Body keys holding the identity.
    fn id_fields() -> &'static [&'static str] {
        &["id"]
    }
}

/// Lower-cased last path segment of the type name, generics dropped.
pub fn default_index_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_lowercase()
}

/// Stamps both timestamps for a new document.
pub fn stamp_create<D: Document>(document: &mut D) {
    let now = Utc::now();
    document.stamp_created(now);
    document.stamp_updated(now);
}

pub fn stamp_update<D: Document>(document: &mut D) {
    document.stamp_updated(Utc::now());
}

/// A field type usable as a document identity.
pub trait DocumentId {
    fn to_document_id(&self) -> Option<String>;

    fn assign_document_id(&mut self, id: &str) -> bool;
}

impl DocumentId for String {
    fn to_document_id(&self) -> Option<String> {
        (!self.is_empty()).then(|| self.clone())
    }

    fn assign_document_id(&mut self, id: &str) -> bool {
        id.clone_into(self);
        true
    }
}

macro_rules! impl_document_id_for_ints {
    ($($ty:ty),*) => {
        $(
            /// Zero means unset.
            impl DocumentId for $ty {
                fn to_document_id(&self) -> Option<String> {
                    (*self != 0).then(|| self.to_string())
                }

                fn assign_document_id(&mut self, id: &str) -> bool {
                    match id.parse::<$ty>() {
                        Ok(parsed) => {
                            *self = parsed;
                            true
                        }
                        Err(_) => false,
                    }
                }
            }
        )*
    };
}

impl_document_id_for_ints!(i32, i64, u32, u64, usize);

impl<T: DocumentId + Default> DocumentId for Option<T> {
    fn to_document_id(&self) -> Option<String> {
        self.as_ref().and_then(DocumentId::to_document_id)
    }

    fn assign_document_id(&mut self, id: &str) -> bool {
        let mut value = T::default();
        if value.assign_document_id(id) {
            *self = Some(value);
            true
        } else {
            false
        }
    }
}

/// A field type usable as a created/updated timestamp.
pub trait Timestamp {
    fn is_unset(&self) -> bool;

    fn set(&mut self, now: DateTime<Utc>);
}

/// The Unix epoch (the `Default`) is unset.
impl Timestamp for DateTime<Utc> {
    fn is_unset(&self) -> bool {
        *self == DateTime::<Utc>::default()
    }

    fn set(&mut self, now: DateTime<Utc>) {
        *self = now;
    }
}

impl Timestamp for Option<DateTime<Utc>> {
    fn is_unset(&self) -> bool {
        self.is_none()
    }

    fn set(&mut self, now: DateTime<Utc>) {
        *self = Some(now);
    }
}

/// Common document fields, embedded with `#[serde(flatten)]` and
/// `#[document(base)]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseModel {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Relevance of the last search hit; never stored.
    #[serde(skip)]
    pub score: Option<f64>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Document for BaseModel {
    fn document_id(&self) -> Option<String> {
        self.id.to_document_id()
    }

    fn set_document_id(&mut self, id: &str) -> bool {
        self.id.assign_document_id(id)
    }

    fn stamp_created(&mut self, now: DateTime<Utc>) {
        if self.created_at.is_unset() {
            self.created_at.set(now);
        }
    }

    fn stamp_updated(&mut self, now: DateTime<Utc>) {
        self.updated_at.set(now);
    }

    fn set_score(&mut self, score: f64) {
        self.score = Some(score);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod nested {
        pub struct AuditLog;
        pub struct Wrapper<T>(pub T);
    }

    #[test]
    fn test_default_index_name_uses_last_segment() {
        assert_eq!(default_index_name::<nested::AuditLog>(), "auditlog");
        assert_eq!(
            default_index_name::<nested::Wrapper<nested::AuditLog>>(),
            "wrapper"
        );
        assert_eq!(BaseModel::index_name(), "basemodel");
    }

    #[test]
    fn test_string_id() {
        let mut id = String::new();
        assert_eq!(id.to_document_id(), None);
        assert!(id.assign_document_id("abc"));
        assert_eq!(id.to_document_id().as_deref(), Some("abc"));
    }

    #[test]
    fn test_integer_id_coercion() {
        let mut id: u64 = 0;
        assert_eq!(id.to_document_id(), None);
        assert!(id.assign_document_id("42"));
        assert_eq!(id, 42);
        assert!(!id.assign_document_id("01HXYZ"));
        assert_eq!(id, 42);

        let mut signed: i64 = 0;
        assert!(signed.assign_document_id("-7"));
        assert_eq!(signed.to_document_id().as_deref(), Some("-7"));
    }

    #[test]
    fn test_optional_id() {
        let mut id: Option<u32> = None;
        assert_eq!(id.to_document_id(), None);
        assert!(id.assign_document_id("9"));
        assert_eq!(id, Some(9));
        assert!(!id.assign_document_id("nine"));
        assert_eq!(id, Some(9));
    }

    #[test]
    fn test_stamp_create_keeps_existing_created_at() {
        let mut model = BaseModel::default();
        stamp_create(&mut model);
        let created = model.created_at;
        assert!(!created.is_unset());
        assert_eq!(model.created_at, model.updated_at);

        stamp_create(&mut model);
        assert_eq!(model.created_at, created);
        assert!(model.updated_at >= created);
    }

    #[test]
    fn test_base_model_body_omits_score_and_empty_id() {
        let model = BaseModel {
            score: Some(2.0),
            ..Default::default()
        };
        let body = serde_json::to_value(&model).unwrap();
        assert!(body.get("id").is_none());
        assert!(body.get("score").is_none());
        assert!(body.get("deleted_at").is_none());
        assert!(body.get("created_at").is_some());
    }
}
