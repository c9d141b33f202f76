//! Category graph backed by a SPARQL endpoint exposing the
//! `mediawiki:categoryTree` service.

use super::{CategoryGraph, ServiceError, classify};
use crate::utils::SiteConfig;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub struct SparqlCategoryGraph {
    client: Client,
    timeout: Duration,
}

#[derive(Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Deserialize)]
struct SparqlResults {
    bindings: Vec<Binding>,
}

#[derive(Deserialize)]
struct Binding {
    out: BindingValue,
}

#[derive(Deserialize)]
struct BindingValue {
    value: String,
}

impl SparqlCategoryGraph {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

/// Graph node URI of a category
fn category_uri(prefix: &str, category: &str) -> Result<String, ServiceError> {
    let raw = format!("{prefix}Category:{}", category.replace(' ', "_"));
    reqwest::Url::parse(&raw)
        .map(|url| url.to_string())
        .map_err(|e| ServiceError::Decode(format!("bad category uri {raw}: {e}")))
}

fn build_query(start_uri: &str, max_depth: u32, limit: usize) -> String {
    format!(
        r#"SELECT ?out WHERE {{
  SERVICE mediawiki:categoryTree {{
    bd:serviceParam mediawiki:start <{start_uri}> .
    bd:serviceParam mediawiki:direction "Reverse" .
    bd:serviceParam mediawiki:depth {max_depth} .
  }}
}} ORDER BY ASC(?depth) LIMIT {fetch}"#,
        fetch = limit + 1
    )
}

/// Category name from a node URI: prefix and namespace stripped, decoded.
/// Invalid UTF-8 in the escapes is replaced.
fn category_name(uri: &str, prefix: &str) -> Option<String> {
    let local = uri.strip_prefix(prefix)?;
    let bytes = urlencoding::decode_binary(local.as_bytes());
    let decoded = String::from_utf8_lossy(&bytes);
    let name = decoded.strip_prefix("Category:").unwrap_or(&decoded);
    Some(name.replace('_', " "))
}

impl CategoryGraph for SparqlCategoryGraph {
    fn subcategories(
        &self,
        site: &SiteConfig,
        root: &str,
        max_depth: u32,
        limit: usize,
    ) -> Result<Vec<String>, ServiceError> {
        let (Some(endpoint), Some(prefix)) = (&site.sparql_endpoint, &site.category_uri_prefix) else {
            return Err(ServiceError::NotConfigured(site.name.clone()));
        };

        let query = build_query(&category_uri(prefix, root)?, max_depth, limit);
        debug!(site = %site.name, root, max_depth, limit, "category tree request");

        let response = self
            .client
            .get(endpoint)
            .query(&[("query", query.as_str()), ("format", "json")])
            .header("Accept", "application/sparql-results+json")
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| classify(e, self.timeout))?;

        let body: SparqlResponse = response.json().map_err(|e| classify(e, self.timeout))?;
        Ok(body
            .results
            .bindings
            .into_iter()
            .filter_map(|b| category_name(&b.out.value, prefix))
            .collect())
    }
}
