//! `insource:` searches the raw page source.

use super::regex::{self, FieldQuery, REGEX_SYNTAX, RegexSupport};
use crate::query::filter::EXPERT_SYNTAX_PRIORITY;
use crate::query::{
    CrossSearchStrategy, Diagnostic, FilterNode, HighlightField, HighlightKind, KeywordFeature,
    KeywordGrammar, KeywordNode, ParseOutcome, RawMatch,
};
use crate::utils::RegexConfig;

const FIELD: &str = "source_text";

pub struct InSourceFeature {
    regex: RegexSupport,
}

impl InSourceFeature {
    pub fn new(config: RegexConfig) -> Self {
        Self {
            regex: RegexSupport::new(config, &[(FIELD, FIELD)]),
        }
    }
}

impl KeywordFeature for InSourceFeature {
    type Parsed = FieldQuery;
    type Expanded = ();

    fn name(&self) -> &'static str {
        "insource"
    }

    fn grammar(&self) -> KeywordGrammar {
        KeywordGrammar::new(&["insource"]).with_delimiters(regex::delimiters())
    }

    fn syntax_name(&self, key: &str, delimiter: Option<char>) -> String {
        if regex::is_regex(delimiter) {
            REGEX_SYNTAX.to_string()
        } else {
            key.to_string()
        }
    }

    fn parse_value(&self, raw: &RawMatch, _: &mut Vec<Diagnostic>) -> ParseOutcome<FieldQuery> {
        if regex::is_regex(raw.delimiter) {
            return match self.regex.parse(raw) {
                Ok(query) => ParseOutcome::Parsed(FieldQuery::Regex(query)),
                Err(diagnostic) => ParseOutcome::Dropped(diagnostic),
            };
        }
        ParseOutcome::Parsed(FieldQuery::Text {
            text: raw.value.clone(),
            phrase: raw.delimiter.is_some(),
        })
    }

    fn cross_search_strategy(&self, _: &KeywordNode, parsed: &FieldQuery) -> CrossSearchStrategy {
        match parsed {
            FieldQuery::Regex(_) => CrossSearchStrategy::HostOnly,
            FieldQuery::Text { .. } => CrossSearchStrategy::AllSites,
        }
    }

    fn build_filter(&self, parsed: &FieldQuery, _: Option<&()>) -> Option<FilterNode> {
        Some(match parsed {
            FieldQuery::Regex(query) => self.regex.build_filter(query),
            FieldQuery::Text { text, phrase: true } => FilterNode::match_phrase(FIELD, text),
            FieldQuery::Text { text, phrase: false } => FilterNode::match_all_words(FIELD, text),
        })
    }

    fn highlight_fields(&self, parsed: &FieldQuery, _: Option<&()>) -> Vec<HighlightField> {
        match parsed {
            FieldQuery::Regex(query) => self.regex.highlight_fields(query),
            FieldQuery::Text { text, .. } => vec![HighlightField {
                field: format!("{FIELD}.plain"),
                target: FIELD.to_string(),
                kind: HighlightKind::Query { query: text.clone() },
                priority: EXPERT_SYNTAX_PRIORITY,
            }],
        }
    }
}
