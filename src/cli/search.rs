//! Count and search command handlers.

use clap::Args;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde_json::{json, Value};

use super::App;
use crate::query::QueryWrapper;

/// Filters shared by `count` and `search`.
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Exact match as FIELD=VALUE (repeatable)
    #[arg(long = "eq", value_name = "FIELD=VALUE")]
    pub eq: Vec<String>,

    /// Substring match as FIELD=VALUE (repeatable)
    #[arg(long = "like", value_name = "FIELD=VALUE")]
    pub like: Vec<String>,

    /// Require FIELD to be present (repeatable)
    #[arg(long = "exists", value_name = "FIELD")]
    pub exists: Vec<String>,
}

impl FilterArgs {
    /// Builds an untyped wrapper from the filter flags.
    pub fn to_wrapper(&self) -> Result<QueryWrapper<Value>> {
        let mut wrapper = QueryWrapper::new();
        for pair in &self.eq {
            let (field, value) = split_pair(pair)?;
            wrapper = wrapper.eq(field, parse_value(value));
        }
        for pair in &self.like {
            let (field, value) = split_pair(pair)?;
            wrapper = wrapper.like(field, value);
        }
        for field in &self.exists {
            wrapper = wrapper.is_not_null(field.as_str());
        }
        Ok(wrapper)
    }
}

fn split_pair(pair: &str) -> Result<(&str, &str)> {
    pair.split_once('=')
        .filter(|(field, _)| !field.is_empty())
        .ok_or_else(|| eyre!("Expected FIELD=VALUE, got '{}'", pair))
}

/// JSON scalars (`42`, `true`) keep their type; anything else is a string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

impl App {
    pub async fn run_count(&self, index: &str, filters: &FilterArgs) -> Result<()> {
        let query = filters.to_wrapper()?.build_query();
        let client = self.connect().await?;
        println!("{}", client.count(index, &query).await?);
        Ok(())
    }

    pub async fn run_search(
        &self,
        index: &str,
        filters: &FilterArgs,
        sort: &[String],
        size: usize,
    ) -> Result<()> {
        let mut wrapper = filters.to_wrapper()?.limit(size);
        for key in sort {
            wrapper = match key.split_once(':') {
                Some((field, "desc")) => wrapper.order_by(field, false),
                Some((field, "asc")) => wrapper.order_by(field, true),
                Some((_, order)) => return Err(eyre!("Unknown sort order '{}'", order)),
                None => wrapper.order_by(key.as_str(), true),
            };
        }

        let client = self.connect().await?;
        let response = client.search(index, &wrapper.build_search_request()).await?;
        let hits: Vec<Value> = response
            .hits
            .into_iter()
            .map(|hit| json!({ "_id": hit.id, "_score": hit.score, "_source": hit.source }))
            .collect();
        let output = json!({ "total": response.total, "hits": hits });
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_args_build_wrapper() {
        let args = FilterArgs {
            eq: vec!["age=42".into(), "status=active".into()],
            like: vec!["name=ann".into()],
            exists: vec!["email".into()],
        };
        let dsl = args.to_wrapper().unwrap().build_query().to_dsl();
        let must = &dsl["bool"]["must"];
        assert_eq!(must[0], json!({ "term": { "age": { "value": 42 } } }));
        assert_eq!(must[1], json!({ "term": { "status": { "value": "active" } } }));
        assert_eq!(must[2]["wildcard"]["name"]["value"], json!("*ann*"));
        assert_eq!(must[3], json!({ "exists": { "field": "email" } }));
    }

    #[test]
    fn test_filter_args_reject_missing_separator() {
        let args = FilterArgs {
            eq: vec!["status".into()],
            ..Default::default()
        };
        assert!(args.to_wrapper().is_err());
    }
}
