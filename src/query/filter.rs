//! Backend-agnostic filter tree plus highlight and rescore registrations.
//!
//! [`FilterNode::to_query`] renders the tree as Elasticsearch-style query DSL.

use serde::Serialize;
use serde_json::{Map, Value, json};

/// Priority given to highlight fields generated by expensive expert syntax
pub const COSTLY_EXPERT_SYNTAX_PRIORITY: u32 = 100;
/// Priority given to highlight fields generated by regular keyword syntax
pub const EXPERT_SYNTAX_PRIORITY: u32 = 50;

/// Scalar value of an exact-match clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Str(String),
    Int(i64),
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Str(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Str(s)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Int(n)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOperator {
    And,
}

/// Filter tree node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterNode {
    /// Boolean composition
    Bool {
        must: Vec<FilterNode>,
        should: Vec<FilterNode>,
        must_not: Vec<FilterNode>,
    },
    /// Exact match
    Term { field: String, value: Scalar },
    /// Analyzed free-text match
    Match {
        field: String,
        query: String,
        operator: MatchOperator,
    },
    /// Analyzed phrase match
    MatchPhrase { field: String, query: String },
    /// Numeric range, both bounds inclusive
    Range {
        field: String,
        gte: Option<i64>,
        lte: Option<i64>,
    },
    /// Native trigram-accelerated regex query
    SourceRegex {
        field: String,
        ngram_field: String,
        pattern: String,
        case_sensitive: bool,
        locale: String,
        max_determinized_states: u32,
        max_ngrams_extracted: Option<u32>,
        max_ngram_clauses: Option<u32>,
    },
    /// Interpreted script, evaluated per document
    Script {
        lang: String,
        source: String,
        params: Map<String, Value>,
    },
    MatchAll,
    MatchNone,
}

impl FilterNode {
    /// OR of the given clauses, always wrapped in a bool node
    pub fn any_of(clauses: Vec<FilterNode>) -> Self {
        FilterNode::Bool {
            must: Vec::new(),
            should: clauses,
            must_not: Vec::new(),
        }
    }

    /// AND of the given clauses; a single clause is returned as-is
    pub fn all_of(mut clauses: Vec<FilterNode>) -> Self {
        if clauses.len() == 1 {
            return clauses.remove(0);
        }
        FilterNode::Bool {
            must: clauses,
            should: Vec::new(),
            must_not: Vec::new(),
        }
    }

    pub fn term(field: &str, value: impl Into<Scalar>) -> Self {
        FilterNode::Term {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn match_all_words(field: &str, query: &str) -> Self {
        FilterNode::Match {
            field: field.to_string(),
            query: query.to_string(),
            operator: MatchOperator::And,
        }
    }

    pub fn match_phrase(field: &str, query: &str) -> Self {
        FilterNode::MatchPhrase {
            field: field.to_string(),
            query: query.to_string(),
        }
    }

    pub fn range(field: &str, gte: Option<i64>, lte: Option<i64>) -> Self {
        FilterNode::Range {
            field: field.to_string(),
            gte,
            lte,
        }
    }

    /// Number of leaf clauses in the tree
    pub fn leaf_count(&self) -> usize {
        match self {
            FilterNode::Bool {
                must,
                should,
                must_not,
            } => must
                .iter()
                .chain(should)
                .chain(must_not)
                .map(FilterNode::leaf_count)
                .sum(),
            _ => 1,
        }
    }

    /// Render as backend query DSL
    pub fn to_query(&self) -> Value {
        match self {
            FilterNode::Bool {
                must,
                should,
                must_not,
            } => {
                let mut body = Map::new();
                if !must.is_empty() {
                    body.insert("must".into(), render_all(must));
                }
                if !should.is_empty() {
                    body.insert("should".into(), render_all(should));
                    body.insert("minimum_should_match".into(), json!(1));
                }
                if !must_not.is_empty() {
                    body.insert("must_not".into(), render_all(must_not));
                }
                json!({ "bool": body })
            }
            FilterNode::Term { field, value } => json!({ "term": { field.as_str(): value } }),
            FilterNode::Match {
                field,
                query,
                operator,
            } => json!({ "match": { field.as_str(): { "query": query, "operator": operator } } }),
            FilterNode::MatchPhrase { field, query } => {
                json!({ "match_phrase": { field.as_str(): query } })
            }
            FilterNode::Range { field, gte, lte } => {
                let mut bounds = Map::new();
                if let Some(gte) = gte {
                    bounds.insert("gte".into(), json!(gte));
                }
                if let Some(lte) = lte {
                    bounds.insert("lte".into(), json!(lte));
                }
                json!({ "range": { field.as_str(): bounds } })
            }
            FilterNode::SourceRegex {
                field,
                ngram_field,
                pattern,
                case_sensitive,
                locale,
                max_determinized_states,
                max_ngrams_extracted,
                max_ngram_clauses,
            } => {
                let mut body = Map::new();
                body.insert("regex".into(), json!(pattern));
                body.insert("field".into(), json!(field));
                body.insert("ngram_field".into(), json!(ngram_field));
                body.insert("case_sensitive".into(), json!(case_sensitive));
                body.insert("locale".into(), json!(locale));
                body.insert("max_determinized_states".into(), json!(max_determinized_states));
                if let Some(n) = max_ngrams_extracted {
                    body.insert("max_ngrams_extracted".into(), json!(n));
                }
                if let Some(n) = max_ngram_clauses {
                    body.insert("max_ngram_clauses".into(), json!(n));
                }
                json!({ "source_regex": body })
            }
            FilterNode::Script {
                lang,
                source,
                params,
            } => json!({ "script": { "script": { "lang": lang, "source": source, "params": params } } }),
            FilterNode::MatchAll => json!({ "match_all": {} }),
            FilterNode::MatchNone => json!({ "match_none": {} }),
        }
    }
}

fn render_all(nodes: &[FilterNode]) -> Value {
    Value::Array(nodes.iter().map(FilterNode::to_query).collect())
}

/// What a highlight field should highlight
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HighlightKind {
    Regex { pattern: String, insensitive: bool },
    Query { query: String },
}

/// Highlight instruction registered by a keyword
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightField {
    pub field: String,
    pub target: String,
    pub kind: HighlightKind,
    pub priority: u32,
}

/// Rescoring component registered by a keyword
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RescoreComponent {
    /// Boost documents carrying any of the terms, scaled by term frequency
    TermBoost {
        field: String,
        terms: Vec<String>,
        weight: f32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_of_single_clause_stays_wrapped() {
        let node = FilterNode::any_of(vec![FilterNode::term("category", "Music")]);
        assert!(matches!(node, FilterNode::Bool { ref should, .. } if should.len() == 1));
    }

    #[test]
    fn test_all_of_single_clause_unwraps() {
        let node = FilterNode::all_of(vec![FilterNode::term("namespace", 0)]);
        assert_eq!(node, FilterNode::term("namespace", 0));
    }

    #[test]
    fn test_leaf_count() {
        let node = FilterNode::all_of(vec![
            FilterNode::any_of(vec![
                FilterNode::term("a", "1"),
                FilterNode::term("a", "2"),
            ]),
            FilterNode::range("size", Some(1), None),
        ]);
        assert_eq!(node.leaf_count(), 3);
    }

    #[test]
    fn test_range_renders_only_present_bounds() {
        let q = FilterNode::range("file_size", Some(307200), None).to_query();
        assert_eq!(q, json!({ "range": { "file_size": { "gte": 307200 } } }));
    }

    #[test]
    fn test_bool_renders_should_with_minimum() {
        let q = FilterNode::any_of(vec![FilterNode::match_all_words("title", "gold rush")]).to_query();
        assert_eq!(
            q,
            json!({ "bool": {
                "should": [ { "match": { "title": { "query": "gold rush", "operator": "and" } } } ],
                "minimum_should_match": 1
            } })
        );
    }

    #[test]
    fn test_term_renders_integer_scalar() {
        let q = FilterNode::term("namespace", 14).to_query();
        assert_eq!(q, json!({ "term": { "namespace": 14 } }));
    }
}
