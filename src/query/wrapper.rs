//! Fluent predicate builder.

use std::fmt;
use std::marker::PhantomData;

use serde_json::Value;

use crate::query::ast::{BoolQuery, Query, RangeBounds, SortField, SortOrder, TermsAggregation};
use crate::store::SearchRequest;

/// Accumulates a boolean predicate tree, a sort keys, a page window and
/// group-by fields for entity type `T`, then lowers them into a
/// [`SearchRequest`] or a bare [`Query`].
///
/// Every method consumes the builder and returns it, so one instance
/// describes exactly one query. Leaf predicates land in the root `must`
/// list; negations are nested `must_not` nodes inside that list.
///
/// # Example
///
/// ```ignore
/// let adults = QueryWrapper::<User>::new()
///     .eq("status", "active")
///     .between("age", 18, 65)
///     .like("name", "ann")
///     .order_by("created_at", false)
///     .limit(20);
///
/// let users = repo.list(&adults).await?;
/// ```
pub struct QueryWrapper<T> {
    root: BoolQuery,
    sort: Vec<SortField>,
    limit: usize,
    offset: usize,
    group_by: Vec<String>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> QueryWrapper<T> {
    pub fn new() -> Self {
        Self {
            root: BoolQuery::default(),
            sort: Vec::new(),
            limit: 0,
            offset: 0,
            group_by: Vec::new(),
            _entity: PhantomData,
        }
    }

    /// Exact term match.
    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.must(Query::term(field, value))
    }

    /// Negated exact term match.
    pub fn neq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.must(Query::not(Query::term(field, value)))
    }

    pub fn gt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.range(field, RangeBounds::gt(value))
    }

    pub fn gte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.range(field, RangeBounds::gte(value))
    }

    pub fn lt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.range(field, RangeBounds::lt(value))
    }

    pub fn lte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.range(field, RangeBounds::lte(value))
    }

    /// Inclusive range `[min, max]`.
    pub fn between(
        self,
        field: impl Into<String>,
        min: impl Into<Value>,
        max: impl Into<Value>,
    ) -> Self {
        self.range(field, RangeBounds::between(min, max))
    }

    /// Excludes the inclusive range `[min, max]`.
    pub fn not_between(
        self,
        field: impl Into<String>,
        min: impl Into<Value>,
        max: impl Into<Value>,
    ) -> Self {
        self.must(Query::not(Query::range(field, RangeBounds::between(min, max))))
    }

    /// Substring match: `*value*`.
    ///
    /// Wildcard metacharacters already present in `value` are passed through
    /// unescaped, so `like("code", "a*")` behaves as a pattern.
    pub fn like(self, field: impl Into<String>, value: impl fmt::Display) -> Self {
        self.must(Query::wildcard(field, format!("*{}*", value)))
    }

    /// Suffix match: `*value` (the wildcard sits on the left).
    pub fn like_left(self, field: impl Into<String>, value: impl fmt::Display) -> Self {
        self.must(Query::wildcard(field, format!("*{}", value)))
    }

    /// Prefix match: `value*` (the wildcard sits on the right).
    pub fn like_right(self, field: impl Into<String>, value: impl fmt::Display) -> Self {
        self.must(Query::wildcard(field, format!("{}*", value)))
    }

    pub fn not_like(self, field: impl Into<String>, value: impl fmt::Display) -> Self {
        self.must(Query::not(Query::wildcard(field, format!("*{}*", value))))
    }

    /// Membership in `values`.
    pub fn is_in<V: Into<Value>>(
        self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.must(Query::terms(field, values))
    }

    pub fn not_in<V: Into<Value>>(
        self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.must(Query::not(Query::terms(field, values)))
    }

    /// Field is missing or null.
    pub fn is_null(self, field: impl Into<String>) -> Self {
        self.must(Query::not(Query::exists(field)))
    }

    pub fn is_not_null(self, field: impl Into<String>) -> Self {
        self.must(Query::exists(field))
    }

    /// Appends a sort key; earlier keys take precedence.
    pub fn order_by(mut self, field: impl Into<String>, ascending: bool) -> Self {
        self.sort.push(SortField {
            field: field.into(),
            order: if ascending {
                SortOrder::Asc
            } else {
                SortOrder::Desc
            },
        });
        self
    }

    /// Requests a terms aggregation per field. Buckets are named
    /// `group_by_<field>_<n>` where `n` is the field's position among all
    /// group-by fields of this builder.
    pub fn group_by<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.group_by.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Page size; 0 leaves it unspecified.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Appends the top-level `must` and `filter` predicates of each builder
    /// to this one's own lists.
    ///
    /// This flattens rather than nests: `should` branches (from
    /// [`or`](Self::or)), sort keys, windows and group-by fields of the
    /// arguments are discarded.
    pub fn and(mut self, others: impl IntoIterator<Item = QueryWrapper<T>>) -> Self {
        for other in others {
            self.root.must.extend(other.root.must);
            self.root.filter.extend(other.root.filter);
        }
        self
    }

    /// Nests each builder's whole predicate tree as one `should` branch and
    /// requires at least one branch to match.
    pub fn or(mut self, others: impl IntoIterator<Item = QueryWrapper<T>>) -> Self {
        self.root
            .should
            .extend(others.into_iter().map(|other| Query::Bool(other.root)));
        if !self.root.should.is_empty() {
            self.root.minimum_should_match = Some(1);
        }
        self
    }

    /// The accumulated predicate tree, without sort, window or aggregations.
    pub fn build_query(&self) -> Query {
        Query::Bool(self.root.clone())
    }

    pub fn build_search_request(&self) -> SearchRequest {
        SearchRequest {
            query: self.build_query(),
            sort: self.sort.clone(),
            size: (self.limit > 0).then_some(self.limit),
            from: (self.offset > 0).then_some(self.offset),
            aggregations: self.aggregations(),
        }
    }

    /// Terms aggregations requested through [`group_by`](Self::group_by).
    pub fn aggregations(&self) -> Vec<TermsAggregation> {
        self.group_by
            .iter()
            .enumerate()
            .map(|(i, field)| TermsAggregation {
                name: format!("group_by_{}_{}", field, i),
                field: field.clone(),
            })
            .collect()
    }

    /// Number of top-level conjunctive predicates.
    pub fn predicate_count(&self) -> usize {
        self.root.predicate_count()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    fn must(mut self, query: Query) -> Self {
        self.root.must.push(query);
        self
    }

    /// Merges into an existing range node on the same field, if any.
    fn range(mut self, field: impl Into<String>, bounds: RangeBounds) -> Self {
        let field = field.into();
        let existing = self.root.must.iter_mut().find_map(|query| match query {
            Query::Range {
                field: existing,
                bounds: current,
            } if *existing == field => Some(current),
            _ => None,
        });
        match existing {
            Some(current) => current.merge(bounds),
            None => self.root.must.push(Query::range(field, bounds)),
        }
        self
    }
}

impl<T> Default for QueryWrapper<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for QueryWrapper<T> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            sort: self.sort.clone(),
            limit: self.limit,
            offset: self.offset,
            group_by: self.group_by.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> fmt::Debug for QueryWrapper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryWrapper")
            .field("root", &self.root)
            .field("sort", &self.sort)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("group_by", &self.group_by)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct User;

    fn wrapper() -> QueryWrapper<User> {
        QueryWrapper::new()
    }

    #[test]
    fn test_new_builds_empty_bool() {
        let w = wrapper();
        assert!(w.is_empty());
        assert_eq!(w.build_query().to_dsl(), json!({ "bool": {} }));
    }

    #[test]
    fn test_eq_and_neq() {
        let dsl = wrapper().eq("status", "active").neq("role", "admin").build_query().to_dsl();
        assert_eq!(
            dsl,
            json!({ "bool": { "must": [
                { "term": { "status": { "value": "active" } } },
                { "bool": { "must_not": [ { "term": { "role": { "value": "admin" } } } ] } }
            ] } })
        );
    }

    #[test]
    fn test_range_calls_on_same_field_merge() {
        let w = wrapper().gt("age", 18).lte("age", 65).lt("score", 3);
        assert_eq!(w.predicate_count(), 2);
        assert_eq!(
            w.build_query().to_dsl()["bool"]["must"][0],
            json!({ "range": { "age": { "gt": 18, "lte": 65 } } })
        );
    }

    #[test]
    fn test_between_is_inclusive() {
        let dsl = wrapper().between("age", 18, 65).build_query().to_dsl();
        assert_eq!(
            dsl["bool"]["must"][0],
            json!({ "range": { "age": { "gte": 18, "lte": 65 } } })
        );
    }

    #[test]
    fn test_not_between_negates_range() {
        let dsl = wrapper().not_between("age", 18, 65).build_query().to_dsl();
        assert_eq!(
            dsl["bool"]["must"][0],
            json!({ "bool": { "must_not": [
                { "range": { "age": { "gte": 18, "lte": 65 } } }
            ] } })
        );
    }

    #[test]
    fn test_like_variants_place_wildcards() {
        let dsl = wrapper()
            .like("name", "ann")
            .like_left("name", "son")
            .like_right("name", "jo")
            .build_query()
            .to_dsl();
        let must = &dsl["bool"]["must"];
        assert_eq!(must[0]["wildcard"]["name"]["value"], json!("*ann*"));
        assert_eq!(must[1]["wildcard"]["name"]["value"], json!("*son"));
        assert_eq!(must[2]["wildcard"]["name"]["value"], json!("jo*"));
    }

    #[test]
    fn test_like_does_not_escape_metacharacters() {
        let dsl = wrapper().like("code", "a*b?").build_query().to_dsl();
        assert_eq!(dsl["bool"]["must"][0]["wildcard"]["code"]["value"], json!("*a*b?*"));
    }

    #[test]
    fn test_in_and_not_in() {
        let dsl = wrapper()
            .is_in("dept", ["eng", "ops"])
            .not_in("id", [1, 2])
            .build_query()
            .to_dsl();
        assert_eq!(dsl["bool"]["must"][0], json!({ "terms": { "dept": ["eng", "ops"] } }));
        assert_eq!(
            dsl["bool"]["must"][1],
            json!({ "bool": { "must_not": [ { "terms": { "id": [1, 2] } } ] } })
        );
    }

    #[test]
    fn test_null_checks() {
        let dsl = wrapper().is_null("deleted_at").is_not_null("email").build_query().to_dsl();
        assert_eq!(
            dsl["bool"]["must"][0],
            json!({ "bool": { "must_not": [ { "exists": { "field": "deleted_at" } } ] } })
        );
        assert_eq!(dsl["bool"]["must"][1], json!({ "exists": { "field": "email" } }));
    }

    #[test]
    fn test_and_flattens_predicates() {
        let a = wrapper().eq("a", 1).eq("b", 2);
        let b = wrapper().eq("c", 3);
        let combined = wrapper().eq("z", 0).and([a, b]);
        assert_eq!(combined.predicate_count(), 4);
        assert!(combined.build_query().to_dsl()["bool"].get("should").is_none());
    }

    #[test]
    fn test_and_discards_should_branches_of_arguments() {
        let with_or = wrapper().eq("a", 1).or([wrapper().eq("b", 2)]);
        let combined = wrapper().and([with_or]);
        assert_eq!(combined.predicate_count(), 1);
        assert!(combined.build_query().to_dsl()["bool"].get("should").is_none());
    }

    #[test]
    fn test_or_nests_subtrees() {
        let w = wrapper().or([wrapper().eq("a", 1).eq("b", 2), wrapper().eq("c", 3)]);
        let dsl = w.build_query().to_dsl();
        assert_eq!(dsl["bool"]["minimum_should_match"], json!(1));
        assert_eq!(dsl["bool"]["should"].as_array().map(Vec::len), Some(2));
        assert_eq!(
            dsl["bool"]["should"][0]["bool"]["must"].as_array().map(Vec::len),
            Some(2)
        );
        assert_eq!(w.predicate_count(), 0);
    }

    #[test]
    fn test_or_without_branches_sets_nothing() {
        let dsl = wrapper().or(Vec::new()).build_query().to_dsl();
        assert_eq!(dsl, json!({ "bool": {} }));
    }

    #[test]
    fn test_search_request_window_and_sort() {
        let request = wrapper()
            .eq("a", 1)
            .order_by("created_at", false)
            .order_by("name", true)
            .limit(20)
            .offset(40)
            .build_search_request();
        assert_eq!(request.size, Some(20));
        assert_eq!(request.from, Some(40));
        assert_eq!(request.sort.len(), 2);
        assert_eq!(request.sort[0].order, SortOrder::Desc);
        assert_eq!(request.sort[1].field, "name");
    }

    #[test]
    fn test_unset_window_is_not_sent() {
        let request = wrapper().limit(0).build_search_request();
        assert_eq!(request.size, None);
        assert_eq!(request.from, None);
    }

    #[test]
    fn test_group_by_names_are_positional() {
        let request = wrapper()
            .group_by(["dept"])
            .group_by(["role", "dept"])
            .build_search_request();
        let names: Vec<_> = request.aggregations.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["group_by_dept_0", "group_by_role_1", "group_by_dept_2"]);
    }
}
