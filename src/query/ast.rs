//! Boolean predicate tree and its Elasticsearch query DSL encoding.

use serde_json::{json, Map, Value};

/// A node of the predicate tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Boolean combination of sub-queries.
    Bool(BoolQuery),
    /// Exact term equality.
    Term { field: String, value: Value },
    /// Membership in a fixed list of terms.
    Terms { field: String, values: Vec<Value> },
    /// Wildcard pattern (`*` any run, `?` any single character).
    Wildcard { field: String, pattern: String },
    /// Range with any subset of gt/gte/lt/lte bounds.
    Range { field: String, bounds: RangeBounds },
    /// Field existence (non-null value present).
    Exists { field: String },
}

impl Query {
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Query::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn terms(field: impl Into<String>, values: Vec<Value>) -> Self {
        Query::Terms {
            field: field.into(),
            values,
        }
    }

    pub fn wildcard(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Query::Wildcard {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    pub fn range(field: impl Into<String>, bounds: RangeBounds) -> Self {
        Query::Range {
            field: field.into(),
            bounds,
        }
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Query::Exists {
            field: field.into(),
        }
    }

    /// Wraps `query` as the single `must_not` clause of a new bool node.
    pub fn not(query: Query) -> Self {
        Query::Bool(BoolQuery {
            must_not: vec![query],
            ..Default::default()
        })
    }

    /// Encodes the node as Elasticsearch query DSL.
    pub fn to_dsl(&self) -> Value {
        match self {
            Query::Bool(bool_query) => json!({ "bool": bool_query.to_dsl() }),
            Query::Term { field, value } => json!({ "term": { field: { "value": value } } }),
            Query::Terms { field, values } => json!({ "terms": { field: values } }),
            Query::Wildcard { field, pattern } => {
                json!({ "wildcard": { field: { "value": pattern } } })
            }
            Query::Range { field, bounds } => json!({ "range": { field: bounds.to_dsl() } }),
            Query::Exists { field } => json!({ "exists": { "field": field } }),
        }
    }
}

/// Boolean node: `must` and `filter` are conjunctive, `must_not` excludes,
/// `should` branches are disjunctive once `minimum_should_match` is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolQuery {
    pub must: Vec<Query>,
    pub filter: Vec<Query>,
    pub should: Vec<Query>,
    pub must_not: Vec<Query>,
    pub minimum_should_match: Option<u32>,
}

impl BoolQuery {
    /// True when the node places no constraint (matches everything).
    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
            && self.filter.is_empty()
            && self.should.is_empty()
            && self.must_not.is_empty()
    }

    /// Number of top-level conjunctive predicates (`must` plus `filter`).
    pub fn predicate_count(&self) -> usize {
        self.must.len() + self.filter.len()
    }

    pub fn to_dsl(&self) -> Value {
        let mut body = Map::new();
        for (key, clauses) in [
            ("must", &self.must),
            ("filter", &self.filter),
            ("should", &self.should),
            ("must_not", &self.must_not),
        ] {
            if !clauses.is_empty() {
                body.insert(
                    key.to_string(),
                    Value::Array(clauses.iter().map(Query::to_dsl).collect()),
                );
            }
        }
        if let Some(msm) = self.minimum_should_match {
            body.insert("minimum_should_match".to_string(), json!(msm));
        }
        Value::Object(body)
    }
}

/// Bounds of a range predicate. Unset bounds are open.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeBounds {
    pub gt: Option<Value>,
    pub gte: Option<Value>,
    pub lt: Option<Value>,
    pub lte: Option<Value>,
}

impl RangeBounds {
    pub fn gt(value: impl Into<Value>) -> Self {
        Self {
            gt: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn gte(value: impl Into<Value>) -> Self {
        Self {
            gte: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn lt(value: impl Into<Value>) -> Self {
        Self {
            lt: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn lte(value: impl Into<Value>) -> Self {
        Self {
            lte: Some(value.into()),
            ..Default::default()
        }
    }

    /// Inclusive `[min, max]`.
    pub fn between(min: impl Into<Value>, max: impl Into<Value>) -> Self {
        Self {
            gte: Some(min.into()),
            lte: Some(max.into()),
            ..Default::default()
        }
    }

    /// Overlays the bounds set in `other`; a bound set on both sides takes
    /// the value from `other`.
    pub fn merge(&mut self, other: RangeBounds) {
        if other.gt.is_some() {
            self.gt = other.gt;
        }
        if other.gte.is_some() {
            self.gte = other.gte;
        }
        if other.lt.is_some() {
            self.lt = other.lt;
        }
        if other.lte.is_some() {
            self.lte = other.lte;
        }
    }

    pub fn to_dsl(&self) -> Value {
        let mut body = Map::new();
        for (key, bound) in [
            ("gt", &self.gt),
            ("gte", &self.gte),
            ("lt", &self.lt),
            ("lte", &self.lte),
        ] {
            if let Some(value) = bound {
                body.insert(key.to_string(), value.clone());
            }
        }
        Value::Object(body)
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// One entry of the sort keys.
#[derive(Debug, Clone, PartialEq)]
pub struct SortField {
    pub field: String,
    pub order: SortOrder,
}

impl SortField {
    pub fn to_dsl(&self) -> Value {
        json!({ &self.field: { "order": self.order.as_str() } })
    }
}

/// A terms aggregation bucketing matches by a field's distinct values.
#[derive(Debug, Clone, PartialEq)]
pub struct TermsAggregation {
    pub name: String,
    pub field: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_dsl() {
        assert_eq!(
            Query::term("status", "active").to_dsl(),
            json!({ "term": { "status": { "value": "active" } } })
        );
        assert_eq!(
            Query::terms("age", vec![json!(1), json!(2)]).to_dsl(),
            json!({ "terms": { "age": [1, 2] } })
        );
        assert_eq!(
            Query::wildcard("name", "*ann*").to_dsl(),
            json!({ "wildcard": { "name": { "value": "*ann*" } } })
        );
        assert_eq!(
            Query::exists("email").to_dsl(),
            json!({ "exists": { "field": "email" } })
        );
    }

    #[test]
    fn test_negation_wraps_must_not() {
        let dsl = Query::not(Query::exists("email")).to_dsl();
        assert_eq!(
            dsl,
            json!({ "bool": { "must_not": [{ "exists": { "field": "email" } }] } })
        );
    }

    #[test]
    fn test_empty_bool_encodes_as_match_all() {
        let query = Query::Bool(BoolQuery::default());
        assert_eq!(query.to_dsl(), json!({ "bool": {} }));
    }

    #[test]
    fn test_range_merge_keeps_both_sides() {
        let mut bounds = RangeBounds::gt(18);
        bounds.merge(RangeBounds::lte(65));
        assert_eq!(bounds.to_dsl(), json!({ "gt": 18, "lte": 65 }));

        bounds.merge(RangeBounds::gt(21));
        assert_eq!(bounds.gt, Some(json!(21)));
    }

    #[test]
    fn test_bool_with_should_emits_minimum_should_match() {
        let query = BoolQuery {
            should: vec![Query::term("a", 1), Query::term("b", 2)],
            minimum_should_match: Some(1),
            ..Default::default()
        };
        let dsl = query.to_dsl();
        assert_eq!(dsl["minimum_should_match"], json!(1));
        assert_eq!(dsl["should"].as_array().map(Vec::len), Some(2));
        assert!(dsl.get("must").is_none());
    }

    #[test]
    fn test_sort_field_dsl() {
        let sort = SortField {
            field: "created_at".to_string(),
            order: SortOrder::Desc,
        };
        assert_eq!(sort.to_dsl(), json!({ "created_at": { "order": "desc" } }));
    }
}
