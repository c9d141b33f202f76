//! Shared support for keywords accepting `/regex/` values.
//!
//! A slash-delimited value (optionally followed by `i` for case-insensitive)
//! is a regex. It compiles to the backend's native trigram-accelerated regex
//! query when available, otherwise to a per-document script. When neither is
//! available the match is dropped with a `feature-not-available` diagnostic.

use crate::query::diagnostics::{Diagnostic, MessageKey};
use crate::query::filter::{
    COSTLY_EXPERT_SYNTAX_PRIORITY, FilterNode, HighlightField, HighlightKind,
};
use crate::query::grammar::{DEFAULT_DELIMITER, Delimiter};
use crate::query::tokenizer::RawMatch;
use crate::utils::RegexConfig;
use serde_json::{Map, Value, json};

pub const REGEX_DELIMITER: char = '/';
pub const INSENSITIVE_SUFFIX: char = 'i';
pub const REGEX_SYNTAX: &str = "regex";

const SCRIPT_LANG: &str = "painless";
/// `params.regex` arrives already lowercased for insensitive queries
const SCRIPT_SOURCE: &str = "def text = params._source[params.field]; \
if (text == null) { return false; } \
if (params.insensitive) { text = text.toLowerCase(); } \
return Pattern.compile(params.regex).matcher(text).find();";

/// A parsed regex value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegexQuery {
    pub pattern: String,
    pub insensitive: bool,
}

/// Value of a regex-capable keyword
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldQuery {
    Text { text: String, phrase: bool },
    Regex(RegexQuery),
}

/// Delimiters accepted by regex-capable keywords
pub fn delimiters() -> Vec<Delimiter> {
    vec![
        Delimiter::new(DEFAULT_DELIMITER),
        Delimiter::with_suffixes(REGEX_DELIMITER, &[INSENSITIVE_SUFFIX]),
    ]
}

pub fn is_regex(delimiter: Option<char>) -> bool {
    delimiter == Some(REGEX_DELIMITER)
}

/// Regex capability of a keyword over a fixed set of fields
#[derive(Debug, Clone)]
pub struct RegexSupport {
    config: RegexConfig,
    /// (indexed field, highlight target)
    fields: Vec<(String, String)>,
}

impl RegexSupport {
    pub fn new(config: RegexConfig, fields: &[(&str, &str)]) -> Self {
        Self {
            config,
            fields: fields
                .iter()
                .map(|(f, t)| (f.to_string(), t.to_string()))
                .collect(),
        }
    }

    pub fn available(&self) -> bool {
        self.config.enabled && (self.config.native_plugin || self.config.script_fallback)
    }

    /// Parse a slash-delimited value, dropping it when regexes are unavailable
    pub fn parse(&self, raw: &RawMatch) -> Result<RegexQuery, Diagnostic> {
        if !self.available() {
            return Err(Diagnostic::new(MessageKey::FeatureNotAvailable)
                .with_param(format!("{} regex", raw.key)));
        }
        Ok(RegexQuery {
            pattern: raw.value.clone(),
            insensitive: raw.suffix.starts_with(INSENSITIVE_SUFFIX),
        })
    }

    pub fn build_filter(&self, query: &RegexQuery) -> FilterNode {
        let clauses = self
            .fields
            .iter()
            .map(|(field, _)| {
                if self.config.native_plugin {
                    self.native_clause(field, query)
                } else {
                    self.script_clause(field, query)
                }
            })
            .collect();
        FilterNode::any_of(clauses)
    }

    fn native_clause(&self, field: &str, query: &RegexQuery) -> FilterNode {
        FilterNode::SourceRegex {
            field: field.to_string(),
            ngram_field: format!("{field}.trigram"),
            pattern: query.pattern.clone(),
            case_sensitive: !query.insensitive,
            locale: self.config.language.clone(),
            max_determinized_states: self.config.max_determinized_states,
            max_ngrams_extracted: self.config.max_ngrams_extracted,
            max_ngram_clauses: self.config.max_ngram_clauses,
        }
    }

    fn script_clause(&self, field: &str, query: &RegexQuery) -> FilterNode {
        let mut params = Map::new();
        params.insert("field".into(), json!(field));
        let pattern = if query.insensitive {
            query.pattern.to_lowercase()
        } else {
            query.pattern.clone()
        };
        params.insert("regex".into(), Value::String(format!(".*({pattern}).*")));
        params.insert("insensitive".into(), json!(query.insensitive));
        params.insert("language".into(), json!(self.config.language));
        FilterNode::Script {
            lang: SCRIPT_LANG.to_string(),
            source: SCRIPT_SOURCE.to_string(),
            params,
        }
    }

    /// Regex highlighting on the `.plain` subfield of every field
    pub fn highlight_fields(&self, query: &RegexQuery) -> Vec<HighlightField> {
        if !self.config.highlighter_supports_regex {
            return Vec::new();
        }
        self.fields
            .iter()
            .map(|(field, target)| HighlightField {
                field: format!("{field}.plain"),
                target: target.clone(),
                kind: HighlightKind::Regex {
                    pattern: query.pattern.clone(),
                    insensitive: query.insensitive,
                },
                priority: COSTLY_EXPERT_SYNTAX_PRIORITY,
            })
            .collect()
    }
}
